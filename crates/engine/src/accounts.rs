//! Account primitives.
//!
//! An account is a named store of money (bank account, mobile wallet, cash
//! box, credit card). Its balance is only ever mutated by the posting and
//! transfer workflows, so it always reflects the signed sum of the
//! transactions recorded against it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    MobileMoney,
    Cash,
    CreditCard,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::MobileMoney => "mobile_money",
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::Other => "other",
        }
    }

    /// Only credit accounts may carry a negative balance.
    pub fn allows_overdraft(self) -> bool {
        matches!(self, Self::CreditCard)
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "bank" => Ok(Self::Bank),
            "mobile_money" => Ok(Self::MobileMoney),
            "cash" => Ok(Self::Cash),
            "credit_card" => Ok(Self::CreditCard),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidInput(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, generated once and persisted so the account can be
    /// renamed without breaking references.
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub balance_minor: i64,
    pub currency: Currency,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        user_id: String,
        name: String,
        kind: AccountKind,
        balance_minor: i64,
        currency: Currency,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind,
            balance_minor,
            currency,
            description,
            active: true,
            created_at,
        }
    }

    /// Applies a signed balance change.
    ///
    /// Non-credit accounts are not allowed to go below zero; a debit that
    /// would do so fails with [`EngineError::InsufficientFunds`] and leaves
    /// the balance untouched.
    pub fn apply_delta(&mut self, delta_minor: i64) -> ResultEngine<()> {
        let next = self
            .balance_minor
            .checked_add(delta_minor)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
        if next < 0 && !self.kind.allows_overdraft() {
            return Err(EngineError::InsufficientFunds(self.name.clone()));
        }
        self.balance_minor = next;
        Ok(())
    }
}

/// Stored balance next to totals recomputed from the transaction log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccountBalance {
    pub account: Account,
    /// `total_income_minor - total_expenses_minor`.
    pub computed_minor: i64,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub balance_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            balance_minor: ActiveValue::Set(account.balance_minor),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            description: ActiveValue::Set(account.description.clone()),
            active: ActiveValue::Set(account.active),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("account not exists".to_string()))?,
            user_id: model.user_id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            balance_minor: model.balance_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            description: model.description,
            active: model.active,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn account(kind: AccountKind, balance_minor: i64) -> Account {
        Account::new(
            "alice".to_string(),
            "Checking".to_string(),
            kind,
            balance_minor,
            Currency::Usd,
            None,
            Utc.timestamp_opt(0, 0).unwrap(),
        )
    }

    #[test]
    fn apply_delta_moves_balance() {
        let mut account = account(AccountKind::Bank, 10_000);
        account.apply_delta(5_000).unwrap();
        assert_eq!(account.balance_minor, 15_000);
        account.apply_delta(-15_000).unwrap();
        assert_eq!(account.balance_minor, 0);
    }

    #[test]
    fn debit_below_zero_is_refused_for_non_credit() {
        let mut account = account(AccountKind::Cash, 100);
        let err = account.apply_delta(-101).unwrap_err();
        assert_eq!(err, EngineError::InsufficientFunds("Checking".to_string()));
        assert_eq!(account.balance_minor, 100);
    }

    #[test]
    fn credit_card_may_go_negative() {
        let mut account = account(AccountKind::CreditCard, 0);
        account.apply_delta(-2_500).unwrap();
        assert_eq!(account.balance_minor, -2_500);
    }
}
