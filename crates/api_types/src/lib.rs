//! Request/response bodies shared by the server and its clients.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        Bank,
        MobileMoney,
        Cash,
        CreditCard,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: AccountKind,
        pub opening_balance_minor: Option<i64>,
        pub currency: Option<Currency>,
        pub description: Option<String>,
    }

    /// Absent fields stay unchanged.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub kind: Option<AccountKind>,
        pub currency: Option<Currency>,
        pub description: Option<String>,
        pub active: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub balance_minor: i64,
        pub currency: Currency,
        pub description: Option<String>,
        pub active: bool,
        /// RFC3339 timestamp.
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountBalanceView {
        pub account: AccountView,
        /// Income minus expenses recomputed from the transaction log.
        pub computed_minor: i64,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from_account_id: Uuid,
        pub to_account_id: Uuid,
        pub category_id: Uuid,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferResult {
        pub from_account: AccountView,
        pub to_account: AccountView,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Expense,
        Income,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
        pub parent_id: Option<Uuid>,
    }

    /// Absent fields stay unchanged; the parent can be moved but not
    /// cleared.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub parent_id: Option<Uuid>,
    }

    /// A category with its subcategories nested below it.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
        pub parent_id: Option<Uuid>,
        pub active: bool,
        pub children: Vec<CategoryView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub subcategory_id: Option<Uuid>,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Defaults to the time of the request.
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub subcategory_id: Option<Uuid>,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
        pub tags: Vec<String>,
    }

    /// Query parameters for `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListParams {
        pub account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    /// Query parameters for `GET /transactions/summary`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryParams {
        pub from: DateTime<FixedOffset>,
        pub to: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategorySummaryView {
        pub category_id: Uuid,
        pub kind: TransactionKind,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryResponse {
        pub totals: Vec<CategorySummaryView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub category_id: Uuid,
        pub amount_minor: i64,
        pub period: BudgetPeriod,
        pub start_date: DateTime<FixedOffset>,
        pub end_date: DateTime<FixedOffset>,
        /// Defaults to true.
        pub notifications: Option<bool>,
    }

    /// Absent fields stay unchanged; the spend total cannot be edited.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub amount_minor: Option<i64>,
        pub start_date: Option<DateTime<FixedOffset>>,
        pub end_date: Option<DateTime<FixedOffset>>,
        pub notifications: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category_id: Uuid,
        pub amount_minor: i64,
        pub spent_minor: i64,
        pub period: BudgetPeriod,
        pub start_date: DateTime<FixedOffset>,
        pub end_date: DateTime<FixedOffset>,
        pub notifications: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSweepResult {
        pub alerts_sent: u64,
    }
}

pub mod notification {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum NotificationKind {
        BudgetAlert,
        BudgetWarning,
        BudgetExceeded,
    }

    /// Query parameters for `GET /notifications`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct NotificationListParams {
        pub unread_only: Option<bool>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        pub id: Uuid,
        pub kind: NotificationKind,
        pub title: String,
        pub message: String,
        pub payload: Option<serde_json::Value>,
        pub read: bool,
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UnreadCount {
        pub count: u64,
    }
}
