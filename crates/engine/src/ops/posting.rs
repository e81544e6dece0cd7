//! The posting workflow.
//!
//! Posting durably records a transaction and applies its derived effects to
//! the account balance and any matching budget as one unit: the ledger
//! insert, the balance update and the budget charge either all commit or
//! none do. Budget alerts raised by a posting are delivered only after the
//! unit commits and are never allowed to fail the caller.

use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};

use crate::{
    Account, EngineError, NotificationDraft, PostTransactionCmd, ResultEngine, Transaction,
    TransactionKind, TransferCmd, accounts, budgets, transactions,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Posts a transaction.
    ///
    /// Inside one database transaction: the ledger row is inserted, the
    /// signed amount is applied to the account balance (debits that would
    /// drive a non-credit account negative are refused and roll the whole
    /// unit back) and, for expenses, the budget whose window contains the
    /// transaction date is charged.
    ///
    /// Posting is not replay-safe: calling this twice with identical
    /// arguments records two transactions and applies the delta twice.
    pub async fn post_transaction(&self, cmd: PostTransactionCmd) -> ResultEngine<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        let (tx, alert) = with_tx!(self, |db_tx| {
            self.post_transaction_in(&db_tx, cmd).await
        })?;

        // Delivery runs after commit: a notifier failure must not undo or
        // fail a posting that already happened.
        if let Some(draft) = alert {
            if let Err(err) = self.notifier.notify(draft).await {
                tracing::warn!("budget alert delivery failed: {err}");
            }
        }

        Ok(tx)
    }

    async fn post_transaction_in(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: PostTransactionCmd,
    ) -> ResultEngine<(Transaction, Option<NotificationDraft>)> {
        let mut account = self
            .require_active_account(db_tx, cmd.account_id, &cmd.user_id)
            .await?;
        self.require_category(db_tx, cmd.category_id, &cmd.user_id)
            .await?;
        if let Some(subcategory_id) = cmd.subcategory_id {
            self.require_category(db_tx, subcategory_id, &cmd.user_id)
                .await?;
        }

        let tx = Transaction::new(
            cmd.user_id.clone(),
            cmd.account_id,
            cmd.category_id,
            cmd.subcategory_id,
            cmd.kind,
            cmd.amount_minor,
            normalize_optional_text(cmd.description.as_deref()),
            cmd.occurred_at,
            cmd.tags,
        )?;
        transactions::ActiveModel::from(&tx).insert(db_tx).await?;

        account.apply_delta(tx.balance_delta())?;
        let account_model = accounts::ActiveModel {
            id: ActiveValue::Set(account.id.to_string()),
            balance_minor: ActiveValue::Set(account.balance_minor),
            ..Default::default()
        };
        account_model.update(db_tx).await?;

        let mut alert = None;
        if tx.kind == TransactionKind::Expense {
            if let Some(mut budget) = self
                .find_active_budget_in(db_tx, &cmd.user_id, cmd.category_id, tx.occurred_at)
                .await?
            {
                budget.spent_minor += tx.amount_minor;
                let budget_model = budgets::ActiveModel {
                    id: ActiveValue::Set(budget.id.to_string()),
                    spent_minor: ActiveValue::Set(budget.spent_minor),
                    ..Default::default()
                };
                budget_model.update(db_tx).await?;

                if budget.is_overspent() && budget.notifications {
                    alert = Some(NotificationDraft::budget_exceeded(&budget));
                }
            }
        }

        Ok((tx, alert))
    }

    /// Moves funds between two accounts of one owner as a single unit.
    ///
    /// The source is debited (funds-checked like any expense), the
    /// destination credited, and a paired expense/income transaction records
    /// each side. Transfers do not count against budgets.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<(Account, Account)> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidInput(
                "from_account_id and to_account_id must differ".to_string(),
            ));
        }

        with_tx!(self, |db_tx| { self.transfer_in(&db_tx, cmd).await })
    }

    async fn transfer_in(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: TransferCmd,
    ) -> ResultEngine<(Account, Account)> {
        let mut from = self
            .require_active_account(db_tx, cmd.from_account_id, &cmd.user_id)
            .await?;
        let mut to = self
            .require_active_account(db_tx, cmd.to_account_id, &cmd.user_id)
            .await?;

        if from.currency != to.currency {
            return Err(EngineError::CurrencyMismatch(format!(
                "{} vs {}",
                from.currency.code(),
                to.currency.code()
            )));
        }
        self.require_category(db_tx, cmd.category_id, &cmd.user_id)
            .await?;

        let description = normalize_optional_text(cmd.description.as_deref());
        let out_tx = Transaction::new(
            cmd.user_id.clone(),
            from.id,
            cmd.category_id,
            None,
            TransactionKind::Expense,
            cmd.amount_minor,
            Some(
                description
                    .clone()
                    .unwrap_or_else(|| format!("Transfer to {}", to.name)),
            ),
            cmd.occurred_at,
            Vec::new(),
        )?;
        let in_tx = Transaction::new(
            cmd.user_id.clone(),
            to.id,
            cmd.category_id,
            None,
            TransactionKind::Income,
            cmd.amount_minor,
            Some(description.unwrap_or_else(|| format!("Transfer from {}", from.name))),
            cmd.occurred_at,
            Vec::new(),
        )?;
        transactions::ActiveModel::from(&out_tx).insert(db_tx).await?;
        transactions::ActiveModel::from(&in_tx).insert(db_tx).await?;

        from.apply_delta(-cmd.amount_minor)?;
        to.apply_delta(cmd.amount_minor)?;
        for account in [&from, &to] {
            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account.id.to_string()),
                balance_minor: ActiveValue::Set(account.balance_minor),
                ..Default::default()
            };
            model.update(db_tx).await?;
        }

        Ok((from, to))
    }
}
