//! Delivery seam for budget alerts.
//!
//! The poster records an alert while the database transaction is open but
//! only hands it to the [`Notifier`] after commit; delivery failures are
//! logged by the caller and never abort the workflow that raised them. The
//! notifier is an injected dependency of the engine, not process-wide
//! state, so tests and alternative transports can swap it out.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection};

use crate::{Budget, Notification, NotificationKind, ResultEngine, notifications};

/// A notification ready for delivery, before it has an id or timestamp.
#[derive(Clone, Debug)]
pub struct NotificationDraft {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

impl NotificationDraft {
    /// The alert raised when a budget's running total crosses its cap.
    pub fn budget_exceeded(budget: &Budget) -> Self {
        Self {
            user_id: budget.user_id.clone(),
            kind: NotificationKind::BudgetExceeded,
            title: "Budget exceeded".to_string(),
            message: format!(
                "Budget for category {} exceeded by {}",
                budget.category_id,
                budget.overspent_minor()
            ),
            payload: Some(serde_json::json!({
                "budget_id": budget.id,
                "category_id": budget.category_id,
                "amount_minor": budget.amount_minor,
                "spent_minor": budget.spent_minor,
                "overspent_minor": budget.overspent_minor(),
            })),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, draft: NotificationDraft) -> ResultEngine<()>;
}

/// Default notifier: persists the draft as a notification row.
#[derive(Clone, Debug)]
pub struct StoredNotifier {
    database: DatabaseConnection,
}

impl StoredNotifier {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Notifier for StoredNotifier {
    async fn notify(&self, draft: NotificationDraft) -> ResultEngine<()> {
        let note = Notification::from_draft(draft, Utc::now());
        notifications::ActiveModel::from(&note)
            .insert(&self.database)
            .await?;
        Ok(())
    }
}
