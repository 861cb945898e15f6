// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::DbErr;
use thiserror::Error;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    Database(#[from] DbErr),

    #[error("未找到数据")]
    NotFound,

    #[error("数据冲突: {0}")]
    Conflict(String),

    #[error("数据无效: {0}")]
    InvalidData(String),
}

/// 调度器错误类型
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("仓库错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("调度配置错误: {0}")]
    Configuration(String),
}
