// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// 运行结果（只追加，不与配置建立外键，配置删除后审计记录仍保留）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scraper_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scraper_config_id: Uuid,
    pub execution_time: ChronoDateTimeWithTimeZone,
    pub duration_ms: i64,
    pub success: bool,
    pub result_data: Option<Json>,
    pub error_message: Option<String>,
    pub error_kind: Option<String>,
    pub attempts: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
