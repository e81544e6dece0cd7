//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, BudgetPeriod, CategoryKind, Currency, TransactionKind};

/// Post a transaction against an account.
#[derive(Clone, Debug)]
pub struct PostTransactionCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl PostTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        category_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            category_id,
            subcategory_id: None,
            kind,
            amount_minor,
            description: None,
            occurred_at,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn subcategory_id(mut self, subcategory_id: Uuid) -> Self {
        self.subcategory_id = Some(subcategory_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Move funds between two accounts of one owner.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub user_id: String,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub category_id: Uuid,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        category_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            from_account_id,
            to_account_id,
            category_id,
            amount_minor,
            description: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create an account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance_minor: i64,
    pub currency: Currency,
    pub description: Option<String>,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            opening_balance_minor: 0,
            currency: Currency::default(),
            description: None,
        }
    }

    #[must_use]
    pub fn opening_balance_minor(mut self, balance_minor: i64) -> Self {
        self.opening_balance_minor = balance_minor;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Update an existing account. Absent fields stay unchanged.
#[derive(Clone, Debug)]
pub struct UpdateAccountCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    pub currency: Option<Currency>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl UpdateAccountCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, account_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            name: None,
            kind: None,
            currency: None,
            description: None,
            active: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: AccountKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// Create a category.
#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub user_id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub parent_id: Option<Uuid>,
}

impl NewCategoryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            parent_id: None,
        }
    }

    #[must_use]
    pub fn parent_id(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Update an existing category. Absent fields stay unchanged.
#[derive(Clone, Debug)]
pub struct UpdateCategoryCmd {
    pub user_id: String,
    pub category_id: Uuid,
    pub name: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl UpdateCategoryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, category_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            category_id,
            name: None,
            parent_id: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn parent_id(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Create a budget.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub user_id: String,
    pub category_id: Uuid,
    pub amount_minor: i64,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub notifications: bool,
}

impl NewBudgetCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category_id: Uuid,
        amount_minor: i64,
        period: BudgetPeriod,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category_id,
            amount_minor,
            period,
            start_date,
            end_date,
            notifications: true,
        }
    }

    #[must_use]
    pub fn notifications(mut self, notifications: bool) -> Self {
        self.notifications = notifications;
        self
    }
}

/// Update an existing budget. Absent fields stay unchanged; the running
/// spend total is never touched by an update.
#[derive(Clone, Debug)]
pub struct UpdateBudgetCmd {
    pub user_id: String,
    pub budget_id: Uuid,
    pub amount_minor: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub notifications: Option<bool>,
}

impl UpdateBudgetCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, budget_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            budget_id,
            amount_minor: None,
            start_date: None,
            end_date: None,
            notifications: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn notifications(mut self, notifications: bool) -> Self {
        self.notifications = Some(notifications);
        self
    }
}
