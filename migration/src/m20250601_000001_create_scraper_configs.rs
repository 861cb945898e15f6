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
                    .table(ScraperConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScraperConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScraperConfigs::Name).string().not_null())
                    .col(ColumnDef::new(ScraperConfigs::Url).string().not_null())
                    .col(ColumnDef::new(ScraperConfigs::Selector).string().null())
                    .col(
                        ColumnDef::new(ScraperConfigs::SubjectIdentifier)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperConfigs::CredentialKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScraperConfigs::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ScraperConfigs::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(ScraperConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScraperConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScraperConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ScraperConfigs {
    Table,
    Id,
    Name,
    Url,
    Selector,
    SubjectIdentifier,
    CredentialKey,
    IsActive,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
