// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScraperResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScraperResults::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScraperResults::ScraperConfigId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperResults::ExecutionTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperResults::DurationMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScraperResults::Success).boolean().not_null())
                    .col(ColumnDef::new(ScraperResults::ResultData).json().null())
                    .col(ColumnDef::new(ScraperResults::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(ScraperResults::ErrorKind)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScraperResults::Attempts)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scraper_results_config_execution_time")
                    .table(ScraperResults::Table)
                    .col(ScraperResults::ScraperConfigId)
                    .col(ScraperResults::ExecutionTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScraperResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScraperResults {
    Table,
    Id,
    ScraperConfigId,
    ExecutionTime,
    DurationMs,
    Success,
    ResultData,
    ErrorMessage,
    ErrorKind,
    Attempts,
}
