use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use super::SeaOrmStorage;
use super::converters::{model_to_session, session_to_active_model};
use super::retry;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{Session, SessionStore};

use migration::entities::session;

#[async_trait]
impl SessionStore for SeaOrmStorage {
    async fn create(&self, session: &Session) -> Result<()> {
        let db = &self.db;
        let active_model = session_to_active_model(session);

        retry::with_retry("create_session", self.retry_config, || {
            let active_model = active_model.clone();
            async move { session::Entity::insert(active_model).exec(db).await }
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("创建会话失败: {}", e)))?;

        Ok(())
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<Session>> {
        let model = session::Entity::find()
            .filter(session::Column::RefreshToken.eq(token))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_session))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        let model = session::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_session))
    }

    async fn find_active_by_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let models = session::Entity::find()
            .filter(session::Column::AccountId.eq(account_id))
            .filter(session::Column::ExpiresAt.gt(now))
            .order_by_asc(session::Column::CreatedAt)
            .order_by_asc(session::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_session).collect())
    }

    async fn count_by_account(&self, account_id: &str, now: DateTime<Utc>) -> Result<u64> {
        Ok(session::Entity::find()
            .filter(session::Column::AccountId.eq(account_id))
            .filter(session::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await?)
    }

    async fn delete_by_account(&self, account_id: &str) -> Result<u64> {
        let db = &self.db;

        let result = retry::with_retry("delete_sessions_by_account", self.retry_config, || async {
            session::Entity::delete_many()
                .filter(session::Column::AccountId.eq(account_id))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("删除会话失败: {}", e)))?;

        Ok(result.rows_affected)
    }

    async fn delete_oldest_by_account(&self, account_id: &str) -> Result<bool> {
        let oldest = session::Entity::find()
            .filter(session::Column::AccountId.eq(account_id))
            .order_by_asc(session::Column::CreatedAt)
            .order_by_asc(session::Column::Id)
            .one(&self.db)
            .await?;

        let Some(oldest) = oldest else {
            return Ok(false);
        };

        let db = &self.db;
        let result = retry::with_retry("delete_oldest_session", self.retry_config, || {
            let id = oldest.id.clone();
            async move { session::Entity::delete_by_id(id).exec(db).await }
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("删除最早会话失败: {}", e)))?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_expired_by_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let db = &self.db;

        let result = retry::with_retry("delete_expired_sessions_by_account", self.retry_config, || async {
            session::Entity::delete_many()
                .filter(session::Column::AccountId.eq(account_id))
                .filter(session::Column::ExpiresAt.lte(now))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("清理过期会话失败: {}", e)))?;

        Ok(result.rows_affected)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;

        let result = retry::with_retry("delete_expired_sessions", self.retry_config, || async {
            session::Entity::delete_many()
                .filter(session::Column::ExpiresAt.lte(now))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("清理过期会话失败: {}", e)))?;

        Ok(result.rows_affected)
    }

    async fn has_active_session(&self, account_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let found = session::Entity::find()
            .filter(session::Column::AccountId.eq(account_id))
            .filter(session::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}
