// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 重复规则（recurrence）：把频率配置换算为下一次运行时间
/// - 配置管理（scraper_admin_service）：配置与调度的增删改
/// - 用量解析（usage_parser）：从门户 HTML 中读取月度与日用量表
/// - 抽取驱动（usage_extractor）：登录、查找账户、抽取的会话状态机
pub mod recurrence;
pub mod scraper_admin_service;
pub mod usage_extractor;
pub mod usage_parser;
