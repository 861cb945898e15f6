// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览会话引擎
///
/// - `browser_session`：基于 chromiumoxide 的真实会话
/// - `fake_portal`：测试夹具，模拟门户并统计会话开关（`test-support` 特性）
pub mod browser_session;
#[cfg(any(test, feature = "test-support"))]
pub mod fake_portal;
pub mod traits;
