// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：配置、调度、运行结果与用量记录
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：抽取驱动、解析、重复规则与配置管理
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
