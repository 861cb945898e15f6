// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scraper_schedules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scraper_config_id: Uuid,
    pub frequency: String,
    pub interval: i32,
    pub custom_cron: Option<String>,
    pub last_run: Option<ChronoDateTimeWithTimeZone>,
    pub next_run: Option<ChronoDateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scraper_config::Entity",
        from = "Column::ScraperConfigId",
        to = "super::scraper_config::Column::Id"
    )]
    ScraperConfig,
}

impl Related<super::scraper_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScraperConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
