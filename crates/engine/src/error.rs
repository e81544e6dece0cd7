//! The module contains the errors the engine can return.
//!
//! Lookup misses surface as [`KeyNotFound`], state conflicts (duplicate
//! names, overlapping budget windows, blocked deletes, refused debits) as
//! [`ExistingKey`], [`HasDependents`] or [`InsufficientFunds`], and malformed
//! input as [`InvalidAmount`] or [`InvalidInput`]. Database failures pass
//! through transparently.
//!
//! [`KeyNotFound`]: EngineError::KeyNotFound
//! [`ExistingKey`]: EngineError::ExistingKey
//! [`HasDependents`]: EngineError::HasDependents
//! [`InsufficientFunds`]: EngineError::InsufficientFunds
//! [`InvalidAmount`]: EngineError::InvalidAmount
//! [`InvalidInput`]: EngineError::InvalidInput
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found")]
    KeyNotFound(String),
    #[error("\"{0}\" already exists")]
    ExistingKey(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Category cycle: {0}")]
    CategoryCycle(String),
    #[error("Cannot delete: {0}")]
    HasDependents(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::CategoryCycle(a), Self::CategoryCycle(b)) => a == b,
            (Self::HasDependents(a), Self::HasDependents(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
