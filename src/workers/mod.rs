// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供单次抓取运行的执行、计时与重试
pub mod run_executor;

pub use run_executor::RunExecutor;
