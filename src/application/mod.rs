// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含管理接口的数据传输对象，将 HTTP 输入与领域服务隔离
pub mod dto;
