// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义配置、调度与运行结果的数据访问接口
pub mod scraper_config_repository;
pub mod scraper_result_repository;
pub mod scraper_schedule_repository;
