//! Stored-notification queries.

use sea_orm::sea_query::Expr;
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Notification, ResultEngine, notifications};

use super::Engine;

impl Engine {
    /// Lists an owner's notifications, newest first.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u64,
    ) -> ResultEngine<Vec<Notification>> {
        let mut query = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt);
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }

        let models = query.limit(limit).all(&self.database).await?;
        models.into_iter().map(Notification::try_from).collect()
    }

    pub async fn unread_count(&self, user_id: &str) -> ResultEngine<u64> {
        let count = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .count(&self.database)
            .await?;
        Ok(count)
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Notification> {
        let model = notifications::Entity::find_by_id(notification_id.to_string())
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("notification not exists".to_string()))?;

        let mut note = Notification::try_from(model)?;
        if !note.read {
            note.read = true;
            notifications::ActiveModel::from(&note)
                .update(&self.database)
                .await?;
        }
        Ok(note)
    }

    /// Returns the number of rows flipped to read.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> ResultEngine<u64> {
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}
