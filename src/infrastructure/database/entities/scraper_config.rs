// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scraper_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub selector: Option<String>,
    pub subject_identifier: String,
    pub credential_key: String,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scraper_schedule::Entity")]
    ScraperSchedule,
}

impl Related<super::scraper_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScraperSchedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
