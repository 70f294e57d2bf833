//! # `finhome_core`
//!
//! Domain logic for the finhome personal-finance backend: identity
//! resolution, the ledger, category registry, budget engine, savings
//! engine, projection engine, and renewal scheduler. Nothing here knows
//! about HTTP; `finhome_api` is the only crate that talks axum.
//!
//! ## Architecture
//!
//! Each domain concept owns one module with a `*Repository` type wrapping a
//! `sqlx::SqlitePool`. Repositories that need to keep a side effect
//! transactionally consistent with their caller's mutation (the Budget
//! Engine's consumption delta, most notably) expose a `*_in_tx` variant
//! taking a caller-supplied `sqlx::Transaction`.
//!
//! ## Error handling
//!
//! Every operation returns [`error::AppError`], a seven-variant taxonomy
//! `finhome_api` maps onto HTTP status codes. Ownership mismatches always
//! return `Forbidden`, never `NotFound` — the two are never conflated.
//!
//! ## Known pitfalls
//!
//! ### Budget consumption drift
//!
//! **Issue**: Incrementally tracking a budget's `consumed_amount` on every
//! entry mutation is only correct if every mutation path that touches an
//! `EXPENSE` entry also adjusts the budget, inside the same transaction.
//!
//! **Prevention**: `Ledger::{create_entry, update_entry, delete_entry}` all
//! route their budget side effect through
//! `BudgetRepository::adjust_in_tx`, which takes the caller's open
//! transaction rather than opening its own — see `ledger.rs`. Run
//! `BudgetRepository::sync_all_consumption` to recompute from source if
//! drift is ever suspected.
//!
//! ### Scheduler auto-renew filter
//!
//! **Issue**: Filtering the pending-processing query by `auto_renew = true`
//! makes the "deactivate non-renewing expired budgets" branch unreachable.
//!
//! **Prevention**: `BudgetRepository::list_pending_processing_at` selects
//! every expired `ACTIVE`/`OVER` row regardless of `auto_renew`; the
//! scheduler branches on the flag once it has the row.

#![cfg_attr(not(feature = "enabled"), allow(unused))]
#![warn(missing_docs)]

#[cfg(feature = "enabled")]
pub mod error;

#[cfg(feature = "enabled")]
pub mod authz;

#[cfg(feature = "enabled")]
mod db;

#[cfg(feature = "enabled")]
pub mod migrations;

#[cfg(feature = "enabled")]
pub mod config;

#[cfg(feature = "enabled")]
pub mod seed;

#[cfg(feature = "enabled")]
pub mod users;

#[cfg(feature = "enabled")]
pub mod categories;

#[cfg(feature = "enabled")]
pub mod ledger;

#[cfg(feature = "enabled")]
pub mod budgets;

#[cfg(feature = "enabled")]
pub mod savings;

#[cfg(feature = "enabled")]
pub mod projections;

#[cfg(feature = "enabled")]
pub mod scheduler;
