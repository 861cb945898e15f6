// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 使用SeaORM框架映射抓取配置、调度与运行结果三张表
pub mod scraper_config;
pub mod scraper_result;
pub mod scraper_schedule;
