// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_scraper_configs::ScraperConfigs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScraperSchedules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScraperSchedules::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::ScraperConfigId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::Frequency)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::Interval)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(ScraperSchedules::CustomCron).string().null())
                    .col(
                        ColumnDef::new(ScraperSchedules::LastRun)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::NextRun)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScraperSchedules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scraper_schedules_config")
                            .from(ScraperSchedules::Table, ScraperSchedules::ScraperConfigId)
                            .to(ScraperConfigs::Table, ScraperConfigs::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Due-schedule selection on every tick
        manager
            .create_index(
                Index::create()
                    .name("idx_scraper_schedules_active_next_run")
                    .table(ScraperSchedules::Table)
                    .col(ScraperSchedules::IsActive)
                    .col(ScraperSchedules::NextRun)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScraperSchedules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ScraperSchedules {
    Table,
    Id,
    ScraperConfigId,
    Frequency,
    Interval,
    CustomCron,
    LastRun,
    NextRun,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
