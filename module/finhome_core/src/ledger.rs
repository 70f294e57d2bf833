//! Ledger (C3)
//!
//! CRUD over income/expense `Entry` rows, plus the balance and summary
//! aggregates. `update_entry` and `delete_entry` are the two operations the
//! source got wrong (`SPEC_FULL.md` §9.1–9.2): both are fixed here by
//! reading the full prior row before any mutation, so the budget delta is
//! always computed against the value actually persisted, not a value
//! already overwritten in memory.

use crate::budgets::BudgetRepository;
use crate::categories::CategoryRepository;
use crate::error::{ AppError, Result };
use chrono::{ NaiveDate, Utc };
use finhome_types::{ CategoryId, EntryId, EntryType, Money, ProjectionId, UserId };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use serde::Serialize;

/// An `Entry` row (income or expense).
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Entry
{
  pub id: EntryId,
  pub owner_id: UserId,
  pub category_id: CategoryId,
  pub amount: Money,
  pub entry_type: EntryType,
  pub description: Option< String >,
  pub date: NaiveDate,
  pub source_projection_id: Option< ProjectionId >,
}

/// Fields accepted when creating or updating an `Entry`.
#[ derive( Debug, Clone ) ]
pub struct EntryInput
{
  pub category_id: CategoryId,
  pub amount: Money,
  pub entry_type: EntryType,
  pub description: Option< String >,
  pub date: NaiveDate,
}

/// Filters accepted by `ListEntries`.
#[ derive( Debug, Clone, Default ) ]
pub struct EntryFilter
{
  pub entry_type: Option< EntryType >,
  pub category_id: Option< CategoryId >,
  pub start_date: Option< NaiveDate >,
  pub end_date: Option< NaiveDate >,
}

/// `Summary` aggregate (`SPEC_FULL.md` §4.3).
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize ) ]
pub struct Summary
{
  pub total_income: Money,
  pub total_expense: Money,
  pub balance: Money,
  pub count: i64,
}

fn row_to_entry( row: &sqlx::sqlite::SqliteRow ) -> Result< Entry >
{
  let amount: String = row.try_get( "amount" ).map_err( AppError::Internal )?;
  let entry_type: String = row.try_get( "type" ).map_err( AppError::Internal )?;
  let date: String = row.try_get( "entry_date" ).map_err( AppError::Internal )?;
  let source_projection_id: Option< i64 > =
    row.try_get( "source_projection_id" ).map_err( AppError::Internal )?;

  Ok( Entry
  {
    id: EntryId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    owner_id: UserId::new( row.try_get( "owner_id" ).map_err( AppError::Internal )? ),
    category_id: CategoryId::new( row.try_get( "category_id" ).map_err( AppError::Internal )? ),
    amount: Money::from_str( &amount ).map_err( |e| AppError::validation( e.to_string() ) )?,
    entry_type: EntryType::from_str( &entry_type ).map_err( AppError::validation )?,
    description: row.try_get( "description" ).map_err( AppError::Internal )?,
    date: NaiveDate::parse_from_str( &date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    source_projection_id: source_projection_id.map( ProjectionId::new ),
  } )
}

/// Repository + Ledger operations (C3).
#[ derive( Debug, Clone ) ]
pub struct LedgerRepository
{
  pool: SqlitePool,
  categories: CategoryRepository,
  budgets: BudgetRepository,
}

impl LedgerRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    let categories = CategoryRepository::new( pool.clone() );
    let budgets = BudgetRepository::new( pool.clone() );
    Self { pool, categories, budgets }
  }

  fn validate_input( input: &EntryInput ) -> Result< () >
  {
    if input.amount.is_non_positive()
    {
      return Err( AppError::validation( "entry amount must be positive" ) );
    }
    Ok( () )
  }

  /// `CreateEntry` (`SPEC_FULL.md` §4.3). Validates the category is
  /// visible to `user` and type-compatible, persists the row, and — for
  /// `EXPENSE` entries — adjusts the category's active budget by
  /// `+amount`, all inside one transaction.
  pub async fn create_entry(
    &self,
    user: UserId,
    input: EntryInput,
    source_projection_id: Option< ProjectionId >,
  ) -> Result< Entry >
  {
    Self::validate_input( &input )?;
    let category = self.categories.require_visible( input.category_id, user ).await?;
    if !category.permits_entry_type( input.entry_type )
    {
      return Err( AppError::validation( "entry type is not compatible with category type" ) );
    }

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
      "INSERT INTO entries \
       ( owner_id, category_id, amount, type, description, entry_date, created_at, source_projection_id ) \
       VALUES ( ?, ?, ?, ?, ?, ?, ?, ? )"
    )
    .bind( user.get() )
    .bind( input.category_id.get() )
    .bind( input.amount.to_string() )
    .bind( input.entry_type.as_db_str() )
    .bind( input.description.clone() )
    .bind( input.date.format( "%Y-%m-%d" ).to_string() )
    .bind( now )
    .bind( source_projection_id.map( finhome_types::ProjectionId::get ) )
    .execute( &mut *tx )
    .await
    .map_err( AppError::Internal )?;

    let entry_id = result.last_insert_rowid();

    if input.entry_type == EntryType::Expense
    {
      BudgetRepository::adjust_in_tx( &mut tx, user, input.category_id, input.amount ).await?;
    }

    tx.commit().await.map_err( AppError::Internal )?;

    Ok( Entry
    {
      id: EntryId::new( entry_id ),
      owner_id: user,
      category_id: input.category_id,
      amount: input.amount,
      entry_type: input.entry_type,
      description: input.description,
      date: input.date,
      source_projection_id,
    } )
  }

  /// Find by id, asserting ownership.
  pub async fn require_owned( &self, id: EntryId, user: UserId ) -> Result< Entry >
  {
    let row = sqlx::query( "SELECT * FROM entries WHERE id = ?" )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let entry = row.as_ref().map( row_to_entry ).transpose()?.ok_or( AppError::NotFound )?;
    if entry.owner_id != user
    {
      return Err( AppError::Forbidden );
    }
    Ok( entry )
  }

  /// `UpdateEntry` (`SPEC_FULL.md` §4.3, fixing §9.1). The prior row is
  /// fully loaded before any field is overwritten, so the "old amount"
  /// used to compute the budget delta is always the value actually
  /// persisted — never the already-assigned new value the source bug
  /// read instead. Category or type changes are handled by applying two
  /// independent adjustments (`-old` against the old category if the old
  /// entry was an expense, `+new` against the new category if the new
  /// entry is an expense), rather than a single `new - old` delta that
  /// silently assumes the category never changes.
  pub async fn update_entry( &self, user: UserId, id: EntryId, input: EntryInput ) -> Result< Entry >
  {
    Self::validate_input( &input )?;
    let old = self.require_owned( id, user ).await?;

    let category = self.categories.require_visible( input.category_id, user ).await?;
    if !category.permits_entry_type( input.entry_type )
    {
      return Err( AppError::validation( "entry type is not compatible with category type" ) );
    }

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    sqlx::query(
      "UPDATE entries SET category_id = ?, amount = ?, type = ?, description = ?, entry_date = ? \
       WHERE id = ?"
    )
    .bind( input.category_id.get() )
    .bind( input.amount.to_string() )
    .bind( input.entry_type.as_db_str() )
    .bind( input.description.clone() )
    .bind( input.date.format( "%Y-%m-%d" ).to_string() )
    .bind( id.get() )
    .execute( &mut *tx )
    .await
    .map_err( AppError::Internal )?;

    if old.entry_type == EntryType::Expense
    {
      BudgetRepository::adjust_in_tx(
        &mut tx,
        user,
        old.category_id,
        Money::zero().saturating_sub( old.amount ),
      )
      .await?;
    }
    if input.entry_type == EntryType::Expense
    {
      BudgetRepository::adjust_in_tx( &mut tx, user, input.category_id, input.amount ).await?;
    }

    tx.commit().await.map_err( AppError::Internal )?;

    Ok( Entry
    {
      id,
      owner_id: user,
      category_id: input.category_id,
      amount: input.amount,
      entry_type: input.entry_type,
      description: input.description,
      date: input.date,
      source_projection_id: old.source_projection_id,
    } )
  }

  /// `DeleteEntry` (`SPEC_FULL.md` §4.3, fixing §9.2). Fixed order: read
  /// the entry, apply the budget delta, then delete the row — all inside
  /// one transaction, so a rollback never leaves the budget adjusted
  /// without the row actually gone (or vice versa).
  pub async fn delete_entry( &self, user: UserId, id: EntryId ) -> Result< () >
  {
    let entry = self.require_owned( id, user ).await?;

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    if entry.entry_type == EntryType::Expense
    {
      BudgetRepository::adjust_in_tx(
        &mut tx,
        user,
        entry.category_id,
        Money::zero().saturating_sub( entry.amount ),
      )
      .await?;
    }

    sqlx::query( "DELETE FROM entries WHERE id = ?" )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;

    tx.commit().await.map_err( AppError::Internal )?;
    Ok( () )
  }

  /// `ListEntries` with the filters named in `SPEC_FULL.md` §4.3.
  pub async fn list_entries( &self, user: UserId, filter: &EntryFilter ) -> Result< Vec< Entry > >
  {
    let mut query = String::from( "SELECT * FROM entries WHERE owner_id = ?" );
    if filter.entry_type.is_some()
    {
      query.push_str( " AND type = ?" );
    }
    if filter.category_id.is_some()
    {
      query.push_str( " AND category_id = ?" );
    }
    if filter.start_date.is_some()
    {
      query.push_str( " AND entry_date >= ?" );
    }
    if filter.end_date.is_some()
    {
      query.push_str( " AND entry_date <= ?" );
    }
    query.push_str( " ORDER BY entry_date DESC, id DESC" );

    let mut q = sqlx::query( &query ).bind( user.get() );
    if let Some( t ) = filter.entry_type
    {
      q = q.bind( t.as_db_str() );
    }
    if let Some( c ) = filter.category_id
    {
      q = q.bind( c.get() );
    }
    if let Some( d ) = filter.start_date
    {
      q = q.bind( d.format( "%Y-%m-%d" ).to_string() );
    }
    if let Some( d ) = filter.end_date
    {
      q = q.bind( d.format( "%Y-%m-%d" ).to_string() );
    }

    let rows = q.fetch_all( &self.pool ).await.map_err( AppError::Internal )?;
    rows.iter().map( row_to_entry ).collect()
  }

  /// `Balance`: `Σ(INCOME) − Σ(EXPENSE)`.
  pub async fn balance( &self, user: UserId ) -> Result< Money >
  {
    let summary = self.summary( user ).await?;
    Ok( summary.balance )
  }

  /// `Summary`: totals, balance, and entry count.
  pub async fn summary( &self, user: UserId ) -> Result< Summary >
  {
    let entries = self.list_entries( user, &EntryFilter::default() ).await?;

    let mut total_income = Money::zero();
    let mut total_expense = Money::zero();
    for entry in &entries
    {
      match entry.entry_type
      {
        EntryType::Income => total_income = total_income + entry.amount,
        EntryType::Expense => total_expense = total_expense + entry.amount,
      }
    }

    Ok( Summary
    {
      total_income,
      total_expense,
      balance: total_income - total_expense,
      count: i64::try_from( entries.len() ).unwrap_or( i64::MAX ),
    } )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn validate_input_rejects_zero_amount()
  {
    let input = EntryInput
    {
      category_id: CategoryId::new( 1 ),
      amount: Money::zero(),
      entry_type: EntryType::Expense,
      description: None,
      date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    };
    assert!( LedgerRepository::validate_input( &input ).is_err() );
  }

  #[ test ]
  fn summary_balance_matches_income_minus_expense()
  {
    let income = Money::from_str( "100" ).expect( "parse" );
    let expense = Money::from_str( "40" ).expect( "parse" );
    assert_eq!( ( income - expense ).to_string(), "60.00" );
  }
}
