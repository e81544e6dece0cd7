//! Account operations: create, list, update, delete and balance reports.

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Account, AccountBalance, EngineError, NewAccountCmd, ResultEngine, TransactionKind,
    UpdateAccountCmd, accounts, transactions,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    pub async fn new_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;

        with_tx!(self, |db_tx| {
            let existing = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(cmd.user_id.clone()))
                .filter(accounts::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let account = Account::new(
                cmd.user_id,
                name,
                cmd.kind,
                cmd.opening_balance_minor,
                cmd.currency,
                cmd.description,
                Utc::now(),
            );
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account)
        })
    }

    /// Return an account (active or not).
    pub async fn account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        self.require_account(&self.database, account_id, user_id)
            .await
    }

    pub async fn list_accounts(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?;

        models.into_iter().map(Account::try_from).collect()
    }

    pub async fn update_account(&self, cmd: UpdateAccountCmd) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let mut account = self
                .require_account(&db_tx, cmd.account_id, &cmd.user_id)
                .await?;

            if let Some(name) = cmd.name.as_deref() {
                let name = normalize_required_name(name, "account")?;
                if name != account.name {
                    let existing = accounts::Entity::find()
                        .filter(accounts::Column::UserId.eq(cmd.user_id.clone()))
                        .filter(accounts::Column::Name.eq(name.clone()))
                        .one(&db_tx)
                        .await?;
                    if existing.is_some() {
                        return Err(EngineError::ExistingKey(name));
                    }
                }
                account.name = name;
            }
            if let Some(kind) = cmd.kind {
                account.kind = kind;
            }
            if let Some(currency) = cmd.currency {
                account.currency = currency;
            }
            if let Some(description) = cmd.description {
                account.description = Some(description);
            }
            if let Some(active) = cmd.active {
                account.active = active;
            }

            accounts::ActiveModel::from(&account).update(&db_tx).await?;
            Ok(account)
        })
    }

    /// Delete an account.
    ///
    /// An account still referenced by transactions is only marked inactive;
    /// otherwise the row is removed.
    pub async fn delete_account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut account = self.require_account(&db_tx, account_id, user_id).await?;

            let referenced = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::AccountId.eq(account_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();

            if referenced {
                account.active = false;
                accounts::ActiveModel::from(&account).update(&db_tx).await?;
            } else {
                accounts::Entity::delete_by_id(account_id.to_string())
                    .exec(&db_tx)
                    .await?;
            }
            Ok(())
        })
    }

    /// Returns the stored balance next to income/expense totals recomputed
    /// from the transaction log, for reconciliation views.
    pub async fn account_balance(
        &self,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<AccountBalance> {
        let account = self
            .require_account(&self.database, account_id, user_id)
            .await?;

        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT \
                 COALESCE(SUM(CASE WHEN kind = ? THEN amount_minor ELSE 0 END), 0) AS income, \
                 COALESCE(SUM(CASE WHEN kind = ? THEN amount_minor ELSE 0 END), 0) AS expenses \
             FROM transactions \
             WHERE account_id = ? AND user_id = ?",
            vec![
                TransactionKind::Income.as_str().into(),
                TransactionKind::Expense.as_str().into(),
                account_id.to_string().into(),
                user_id.into(),
            ],
        );
        let row = self.database.query_one(stmt).await?;
        let total_income_minor: i64 = row
            .as_ref()
            .and_then(|r| r.try_get("", "income").ok())
            .unwrap_or(0);
        let total_expenses_minor: i64 = row
            .as_ref()
            .and_then(|r| r.try_get("", "expenses").ok())
            .unwrap_or(0);

        Ok(AccountBalance {
            computed_minor: total_income_minor - total_expenses_minor,
            total_income_minor,
            total_expenses_minor,
            account,
        })
    }

    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    /// Like [`Self::require_account`] but treats inactive accounts as
    /// missing, for the write paths that must not touch them.
    pub(super) async fn require_active_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Account> {
        let account = self.require_account(conn, account_id, user_id).await?;
        if !account.active {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        Ok(account)
    }
}
