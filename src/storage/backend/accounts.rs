use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, SqlErr};

use super::SeaOrmStorage;
use super::converters::{account_to_active_model, model_to_account};
use super::retry;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{Account, UserStore};

use migration::entities::account;

#[async_trait]
impl UserStore for SeaOrmStorage {
    async fn create(&self, account: &Account) -> Result<()> {
        let db = &self.db;
        let active_model = account_to_active_model(account);

        let result = retry::with_retry("create_account", self.retry_config, || {
            let active_model = active_model.clone();
            async move { account::Entity::insert(active_model).exec(db).await }
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(LinkpulseError::EmailExists)
            }
            Err(e) => Err(LinkpulseError::database_operation(format!(
                "创建账户失败: {}",
                e
            ))),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let model = account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_account))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let model = account::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_account))
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let db = &self.db;
        let active_model = account_to_active_model(account);

        retry::with_retry("update_account", self.retry_config, || {
            let active_model = active_model.clone();
            async move { account::Entity::update(active_model).exec(db).await }
        })
        .await
        .map_err(|e| LinkpulseError::database_operation(format!("更新账户失败: {}", e)))?;

        Ok(())
    }
}
