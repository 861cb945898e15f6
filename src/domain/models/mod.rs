// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 定义抓取配置、调度、运行结果以及用量记录等核心实体
pub mod scraper_config;
pub mod scraper_result;
pub mod scraper_schedule;
pub mod usage;
