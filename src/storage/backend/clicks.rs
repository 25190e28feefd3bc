//! 点击日志写入与统计查询

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

use super::SeaOrmStorage;
use super::converters::click_to_active_model;
use super::retry;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{ClickEvent, ClickStore, DailyCount, KeyCount};

use migration::entities::click_log;

/// 分组查询结果行
#[derive(Debug, FromQueryResult)]
struct GroupRow {
    label: String,
    count: i64,
}

impl GroupRow {
    fn into_daily(self) -> DailyCount {
        DailyCount {
            date: self.label,
            count: self.count.max(0) as u64,
        }
    }

    fn into_key_count(self) -> KeyCount {
        KeyCount {
            key: self.label,
            count: self.count.max(0) as u64,
        }
    }
}

/// 按 UTC 日期（YYYY-MM-DD）分组的 SQL 片段
///
/// MySQL 的 DATETIME 按会话时区读出，需先换算到 UTC。
fn date_label_sql(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Sqlite => "strftime('%Y-%m-%d', clicked_at)",
        DbBackend::MySql => {
            "DATE_FORMAT(CONVERT_TZ(clicked_at, @@session.time_zone, '+00:00'), '%Y-%m-%d')"
        }
        _ => "TO_CHAR(clicked_at AT TIME ZONE 'UTC', 'YYYY-MM-DD')",
    }
}

impl SeaOrmStorage {
    fn date_label_expr(&self) -> Expr {
        Expr::cust(date_label_sql(self.db_backend()))
    }

    async fn top_by_column(
        &self,
        code: &str,
        column: click_log::Column,
        limit: u64,
    ) -> Result<Vec<KeyCount>> {
        let rows = click_log::Entity::find()
            .select_only()
            .column_as(column, "label")
            .column_as(click_log::Column::Id.count(), "count")
            .filter(click_log::Column::LinkCode.eq(code))
            .group_by(column)
            .order_by_desc(Expr::cust("count"))
            .order_by_asc(column)
            .limit(limit)
            .into_model::<GroupRow>()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(GroupRow::into_key_count).collect())
    }
}

#[async_trait]
impl ClickStore for SeaOrmStorage {
    async fn save(&self, event: &ClickEvent) -> Result<()> {
        let db = &self.db;
        let active_model = click_to_active_model(event);

        retry::with_retry("save_click", self.retry_config, || {
            let active_model = active_model.clone();
            async move { click_log::Entity::insert(active_model).exec(db).await }
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("写入点击日志失败: {}", e)))?;

        Ok(())
    }

    async fn count_by_link(&self, code: &str) -> Result<u64> {
        Ok(click_log::Entity::find()
            .filter(click_log::Column::LinkCode.eq(code))
            .count(&self.db)
            .await?)
    }

    async fn group_by_date(&self, code: &str, limit: u64) -> Result<Vec<DailyCount>> {
        let date_expr = self.date_label_expr();

        // 取最近的 limit 个日期，再翻转为升序
        let mut rows = click_log::Entity::find()
            .select_only()
            .column_as(date_expr.clone(), "label")
            .column_as(click_log::Column::Id.count(), "count")
            .filter(click_log::Column::LinkCode.eq(code))
            .group_by(date_expr)
            .order_by_desc(Expr::cust("label"))
            .limit(limit)
            .into_model::<GroupRow>()
            .all(&self.db)
            .await?;
        rows.reverse();

        Ok(rows.into_iter().map(GroupRow::into_daily).collect())
    }

    async fn group_by_country(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>> {
        self.top_by_column(code, click_log::Column::CountryCode, limit)
            .await
    }

    async fn group_by_referrer(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>> {
        self.top_by_column(code, click_log::Column::Referrer, limit)
            .await
    }
}
