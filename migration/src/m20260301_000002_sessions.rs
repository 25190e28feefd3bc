//! 会话表迁移
//!
//! refresh_token 唯一；account_id + created_at 复合索引用于
//! 会话上限淘汰（按创建时间找最旧会话）。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::AccountId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Sessions::RefreshToken)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_refresh_token")
                    .table(Sessions::Table)
                    .col(Sessions::RefreshToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_account_created")
                    .table(Sessions::Table)
                    .col(Sessions::AccountId)
                    .col(Sessions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 过期清扫使用
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_expires_at")
                    .table(Sessions::Table)
                    .col(Sessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sessions_expires_at").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sessions_account_created").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sessions_refresh_token").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sessions {
    #[sea_orm(iden = "sessions")]
    Table,
    Id,
    AccountId,
    RefreshToken,
    ExpiresAt,
    CreatedAt,
}
