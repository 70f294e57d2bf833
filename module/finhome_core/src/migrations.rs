//! Database migration utilities
//!
//! Applies the schema using the same guarded-migration mechanism as the rest
//! of the corpus: a numbered `apply_migration_NNN` function per migration, a
//! `_migration_NNN_completed` marker table guarding any migration after the
//! first so re-running the process never re-executes a destructive step,
//! and `sqlx::raw_sql(include_str!(...))` to run the migration's own SQL
//! file. Migration 001 is unguarded because `CREATE TABLE IF NOT EXISTS` is
//! already idempotent.
//!
//! # Safety
//!
//! - Idempotent (safe to call multiple times)
//! - Foreign keys are always enabled before any migration runs

use crate::error::{ AppError, Result };
use sqlx::SqlitePool;

/// Applies all migrations to the database pool. Safe to call multiple
/// times.
pub async fn apply_all_migrations( pool: &SqlitePool ) -> Result< () >
{
  sqlx::query( "PRAGMA foreign_keys = ON" )
    .execute( pool )
    .await
    .map_err( AppError::Internal )?;

  apply_migration_001( pool ).await?;
  apply_migration_002( pool ).await?;

  Ok( () )
}

/// Migration 001: initial schema (users, categories, entries, budgets,
/// savings goals, installments, contributions, projections).
async fn apply_migration_001( pool: &SqlitePool ) -> Result< () >
{
  let migration = include_str!( "../migrations/001_initial_schema.sql" );
  sqlx::raw_sql( migration )
    .execute( pool )
    .await
    .map_err( AppError::Internal )?;
  Ok( () )
}

/// Migration 002: `users.password_hash`, backing the deprecated legacy
/// register/login routes. Guarded by a marker table since `ALTER TABLE ADD
/// COLUMN` fails if re-run against a column that already exists.
async fn apply_migration_002( pool: &SqlitePool ) -> Result< () >
{
  let already_applied: Option< ( i64, ) > = sqlx::query_as(
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_migration_002_completed'",
  )
  .fetch_optional( pool )
  .await
  .map_err( AppError::Internal )?;

  if already_applied.is_some()
  {
    return Ok( () );
  }

  let migration = include_str!( "../migrations/002_legacy_password.sql" );
  sqlx::raw_sql( migration )
    .execute( pool )
    .await
    .map_err( AppError::Internal )?;
  Ok( () )
}
