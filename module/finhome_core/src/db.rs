//! Shared transaction helper.
//!
//! `SPEC_FULL.md` §5 requires read-modify-write isolation on a `Budget`'s
//! `consumed_amount` sufficient to prevent lost updates under concurrent
//! mutation, and `SPEC_FULL.md` §4.9 / `DESIGN.md`'s "Concurrency strategy"
//! commit to `BEGIN IMMEDIATE` (SQLite's pessimistic write-lock-up-front
//! mode) as the mechanism. A plain `pool.begin()` issues a deferred
//! `BEGIN`, which only takes a write lock at the first write statement —
//! two concurrent transactions can both pass that point having read the
//! same `consumed` value before either writes, losing one delta. Every
//! mutating use-case that can touch a budget's `consumed` column must open
//! its transaction through [`begin_immediate`] instead of `pool.begin()`.

use crate::error::{ AppError, Result };
use sqlx::{ Sqlite, SqlitePool, Transaction };

/// Open a transaction with `BEGIN IMMEDIATE` rather than a deferred
/// `BEGIN`, acquiring SQLite's write lock up front so a concurrent
/// transaction on the same row blocks (and, with the pool's configured
/// `busy_timeout`, waits) instead of racing a read before either writes.
pub( crate ) async fn begin_immediate( pool: &SqlitePool ) -> Result< Transaction< 'static, Sqlite > >
{
  pool.begin_with( "BEGIN IMMEDIATE" ).await.map_err( AppError::Internal )
}
