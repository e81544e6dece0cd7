//! Stored notification rows.
//!
//! Notifications are created as a side effect of budget threshold crossings
//! and never mutate any other entity.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, NotificationDraft};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BudgetAlert,
    BudgetWarning,
    BudgetExceeded,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetAlert => "budget_alert",
            Self::BudgetWarning => "budget_warning",
            Self::BudgetExceeded => "budget_exceeded",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "budget_alert" => Ok(Self::BudgetAlert),
            "budget_warning" => Ok(Self::BudgetWarning),
            "budget_exceeded" => Ok(Self::BudgetExceeded),
            other => Err(EngineError::InvalidInput(format!(
                "invalid notification kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_draft(draft: NotificationDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            payload: draft.payload,
            read: false,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub payload: Option<String>,
    pub is_read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(note: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(note.id.to_string()),
            user_id: ActiveValue::Set(note.user_id.clone()),
            kind: ActiveValue::Set(note.kind.as_str().to_string()),
            title: ActiveValue::Set(note.title.clone()),
            message: ActiveValue::Set(note.message.clone()),
            payload: ActiveValue::Set(note.payload.as_ref().map(|p| p.to_string())),
            is_read: ActiveValue::Set(note.read),
            created_at: ActiveValue::Set(note.created_at),
        }
    }
}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("notification not exists".to_string()))?,
            user_id: model.user_id,
            kind: NotificationKind::try_from(model.kind.as_str())?,
            title: model.title,
            message: model.message,
            payload: model
                .payload
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            read: model.is_read,
            created_at: model.created_at,
        })
    }
}
