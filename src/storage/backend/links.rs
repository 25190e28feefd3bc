use async_trait::async_trait;
use sea_orm::{EntityTrait, SqlErr};

use super::SeaOrmStorage;
use super::converters::{model_to_shortlink, shortlink_to_active_model};
use super::retry;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{LinkStore, ShortLink};

use migration::entities::short_link;

#[async_trait]
impl LinkStore for SeaOrmStorage {
    async fn create(&self, link: &ShortLink) -> Result<()> {
        let db = &self.db;
        let active_model = shortlink_to_active_model(link);

        let result = retry::with_retry("create_link", self.retry_config, || {
            let active_model = active_model.clone();
            async move { short_link::Entity::insert(active_model).exec(db).await }
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Err(
                LinkpulseError::validation(format!("short code '{}' already exists", link.code)),
            ),
            Err(e) => Err(LinkpulseError::database_operation(format!(
                "创建短链接失败: {}",
                e
            ))),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let code_owned = code.to_string();

        let model = retry::with_retry("find_link", self.retry_config, || async {
            short_link::Entity::find_by_id(code_owned.clone()).one(db).await
        })
        .await?;

        Ok(model.map(model_to_shortlink))
    }
}
