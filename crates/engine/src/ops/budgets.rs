//! Budget operations.
//!
//! Creation and update reject windows that overlap another budget for the
//! same (owner, category), which is what lets the posting workflow assume a
//! single matching budget per transaction date.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Budget, EngineError, NewBudgetCmd, NotificationDraft, ResultEngine, UpdateBudgetCmd, budgets,
};

use super::{Engine, with_tx};

impl Engine {
    pub async fn new_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if cmd.start_date > cmd.end_date {
            return Err(EngineError::InvalidInput(
                "start_date must not be after end_date".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, cmd.category_id, &cmd.user_id)
                .await?;
            self.assert_window_free(
                &db_tx,
                &cmd.user_id,
                cmd.category_id,
                cmd.start_date,
                cmd.end_date,
                None,
            )
            .await?;

            let budget = Budget::new(
                cmd.user_id,
                cmd.category_id,
                cmd.amount_minor,
                cmd.period,
                cmd.start_date,
                cmd.end_date,
                cmd.notifications,
            );
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            Ok(budget)
        })
    }

    pub async fn list_budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::StartDate)
            .all(&self.database)
            .await?;

        models.into_iter().map(Budget::try_from).collect()
    }

    /// The budget whose inclusive window contains `on`, if any.
    ///
    /// Window overlap is rejected at write time, so at most one row can
    /// match.
    pub async fn find_active_budget(
        &self,
        user_id: &str,
        category_id: Uuid,
        on: DateTime<Utc>,
    ) -> ResultEngine<Option<Budget>> {
        self.find_active_budget_in(&self.database, user_id, category_id, on)
            .await
    }

    pub(super) async fn find_active_budget_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        category_id: Uuid,
        on: DateTime<Utc>,
    ) -> ResultEngine<Option<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
            .filter(budgets::Column::StartDate.lte(on))
            .filter(budgets::Column::EndDate.gte(on))
            .one(conn)
            .await?
            .map(Budget::try_from)
            .transpose()
    }

    pub async fn update_budget(&self, cmd: UpdateBudgetCmd) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let mut budget = self
                .require_budget(&db_tx, cmd.budget_id, &cmd.user_id)
                .await?;

            if let Some(amount_minor) = cmd.amount_minor {
                if amount_minor <= 0 {
                    return Err(EngineError::InvalidAmount(
                        "amount_minor must be > 0".to_string(),
                    ));
                }
                budget.amount_minor = amount_minor;
            }
            if let Some(start_date) = cmd.start_date {
                budget.start_date = start_date;
            }
            if let Some(end_date) = cmd.end_date {
                budget.end_date = end_date;
            }
            if budget.start_date > budget.end_date {
                return Err(EngineError::InvalidInput(
                    "start_date must not be after end_date".to_string(),
                ));
            }
            if let Some(notifications) = cmd.notifications {
                budget.notifications = notifications;
            }

            if cmd.start_date.is_some() || cmd.end_date.is_some() {
                self.assert_window_free(
                    &db_tx,
                    &cmd.user_id,
                    budget.category_id,
                    budget.start_date,
                    budget.end_date,
                    Some(budget.id),
                )
                .await?;
            }

            budgets::ActiveModel::from(&budget).update(&db_tx).await?;
            Ok(budget)
        })
    }

    pub async fn delete_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        self.require_budget(&self.database, budget_id, user_id)
            .await?;
        budgets::Entity::delete_by_id(budget_id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Emits an alert for every overspent budget with notifications enabled
    /// whose window has not yet ended. Returns the number delivered.
    pub async fn sweep_budgets(&self, user_id: &str, now: DateTime<Utc>) -> ResultEngine<u64> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Notifications.eq(true))
            .filter(budgets::Column::EndDate.gte(now))
            .all(&self.database)
            .await?;

        let mut delivered = 0;
        for model in models {
            let budget = Budget::try_from(model)?;
            if !budget.is_overspent() {
                continue;
            }
            match self
                .notifier
                .notify(NotificationDraft::budget_exceeded(&budget))
                .await
            {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!("budget alert delivery failed: {err}"),
            }
        }
        Ok(delivered)
    }

    async fn require_budget<C: ConnectionTrait>(
        &self,
        conn: &C,
        budget_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id.to_string())
            .filter(budgets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
        Budget::try_from(model)
    }

    /// Rejects a window that intersects any other budget for the same
    /// (owner, category). Endpoints count: touching windows overlap.
    async fn assert_window_free<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        category_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::CategoryId.eq(category_id.to_string()))
            .filter(budgets::Column::StartDate.lte(end_date))
            .filter(budgets::Column::EndDate.gte(start_date));
        if let Some(exclude_id) = exclude_id {
            query = query.filter(budgets::Column::Id.ne(exclude_id.to_string()));
        }

        if query.one(conn).await?.is_some() {
            return Err(EngineError::ExistingKey(format!(
                "budget window for category {category_id}"
            )));
        }
        Ok(())
    }
}
