// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 管理接口的请求对象与校验
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置、环境变量与门户凭据
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 门户浏览会话：chromiumoxide 实现与测试用的模拟门户
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库与指标导出
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由与处理器
pub mod presentation;

/// 队列模块
///
/// 抓取调度循环
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 单次抓取运行的执行与重试
pub mod workers;
