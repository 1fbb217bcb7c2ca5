//! Repository module for database persistence
//!
//! Provides the PostgreSQL-backed budget writer and repository.

pub mod budget;

pub use budget::{BudgetRepository, PgBudgetWriter};
