//! Domain core of the finance tracker.
//!
//! The [`Engine`] owns a database connection and exposes every operation the
//! HTTP layer needs: posting transactions, account/category/budget upkeep
//! and the stored-notification queries. Multi-entity writes run inside a
//! single database transaction so balances, budgets and the transaction log
//! never drift apart.

pub use accounts::{Account, AccountBalance, AccountKind};
pub use budgets::{Budget, BudgetPeriod};
pub use categories::{Category, CategoryKind, CategoryNode};
pub use commands::{
    NewAccountCmd, NewBudgetCmd, NewCategoryCmd, PostTransactionCmd, TransferCmd,
    UpdateAccountCmd, UpdateBudgetCmd, UpdateCategoryCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use notifications::{Notification, NotificationKind};
pub use notify::{NotificationDraft, Notifier, StoredNotifier};
pub use ops::{Engine, EngineBuilder};
pub use transactions::{CategorySummary, Transaction, TransactionKind, TransactionListFilter};

mod accounts;
mod budgets;
mod categories;
mod commands;
mod currency;
mod error;
mod notifications;
mod notify;
mod ops;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
