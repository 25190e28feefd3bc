//! 点击日志表迁移
//!
//! 创建 click_logs 表，每次重定向一行：
//! - 时间戳
//! - 来源 (referrer)
//! - 用户代理 (user_agent)
//! - IP 地址
//! - 国家代码（未解析时为哨兵值）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 click_logs 表
        manager
            .create_table(
                Table::create()
                    .table(ClickLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClickLogs::LinkCode).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ClickLogs::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickLogs::IpAddress).string_len(45).not_null())
                    .col(ColumnDef::new(ClickLogs::UserAgent).text().not_null())
                    .col(ColumnDef::new(ClickLogs::Referrer).text().not_null())
                    .col(
                        ColumnDef::new(ClickLogs::CountryCode)
                            .string_len(8)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建复合索引（用于单链接时间序列查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_logs_code_time")
                    .table(ClickLogs::Table)
                    .col(ClickLogs::LinkCode)
                    .col(ClickLogs::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_click_logs_code_time").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ClickLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickLogs {
    #[sea_orm(iden = "click_logs")]
    Table,
    Id,
    LinkCode,
    ClickedAt,
    IpAddress,
    UserAgent,
    Referrer,
    CountryCode,
}
