// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供抓取调度：按固定节奏选出到期调度并派发执行
pub mod scheduler;

pub use scheduler::ScraperScheduler;
