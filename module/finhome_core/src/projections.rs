//! Projection Engine (C7)
//!
//! `ProjectionTemplate` CRUD plus `execute`, which materializes a template
//! into a real `Entry` for today by delegating straight to
//! [`crate::ledger::LedgerRepository::create_entry`] — the budget-consumption
//! side effect for expense templates is inherited for free rather than
//! re-implemented (`SPEC_FULL.md` §4.7).

use crate::error::{ AppError, Result };
use crate::ledger::{ Entry, EntryInput, LedgerRepository };
use chrono::{ NaiveDate, Utc };
use finhome_types::{ BudgetFrequency, CategoryId, EntryType, Money, ProjectionId, UserId };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use serde::Serialize;

/// A `ProjectionTemplate` row.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Projection
{
  pub id: ProjectionId,
  pub owner_id: UserId,
  pub name: String,
  pub category_id: CategoryId,
  pub amount: Money,
  pub entry_type: EntryType,
  pub frequency: BudgetFrequency,
  pub start_date: NaiveDate,
  pub description: Option< String >,
  pub last_executed: Option< NaiveDate >,
  pub active: bool,
}

/// Fields accepted when creating or updating a `ProjectionTemplate`.
#[ derive( Debug, Clone ) ]
pub struct ProjectionInput
{
  pub name: String,
  pub category_id: CategoryId,
  pub amount: Money,
  pub entry_type: EntryType,
  pub frequency: BudgetFrequency,
  pub start_date: NaiveDate,
  pub description: Option< String >,
  pub active: bool,
}

fn row_to_projection( row: &sqlx::sqlite::SqliteRow ) -> Result< Projection >
{
  let amount: String = row.try_get( "amount" ).map_err( AppError::Internal )?;
  let entry_type: String = row.try_get( "type" ).map_err( AppError::Internal )?;
  let frequency: String = row.try_get( "frequency" ).map_err( AppError::Internal )?;
  let start_date: String = row.try_get( "start_date" ).map_err( AppError::Internal )?;
  let last_executed: Option< String > = row.try_get( "last_executed" ).map_err( AppError::Internal )?;

  Ok( Projection
  {
    id: ProjectionId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    owner_id: UserId::new( row.try_get( "owner_id" ).map_err( AppError::Internal )? ),
    name: row.try_get( "name" ).map_err( AppError::Internal )?,
    category_id: CategoryId::new( row.try_get( "category_id" ).map_err( AppError::Internal )? ),
    amount: Money::from_str( &amount ).map_err( |e| AppError::validation( e.to_string() ) )?,
    entry_type: EntryType::from_str( &entry_type ).map_err( AppError::validation )?,
    frequency: BudgetFrequency::from_str( &frequency ).map_err( AppError::validation )?,
    start_date: NaiveDate::parse_from_str( &start_date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    description: row.try_get( "description" ).map_err( AppError::Internal )?,
    last_executed: last_executed
      .map( |d| NaiveDate::parse_from_str( &d, "%Y-%m-%d" ) )
      .transpose()
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    active: row.try_get::< i64, _ >( "active" ).map_err( AppError::Internal )? != 0,
  } )
}

/// Repository + Projection Engine operations (C7).
#[ derive( Debug, Clone ) ]
pub struct ProjectionRepository
{
  pool: SqlitePool,
  ledger: LedgerRepository,
}

impl ProjectionRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    let ledger = LedgerRepository::new( pool.clone() );
    Self { pool, ledger }
  }

  /// Create a `ProjectionTemplate`. Validates category visibility and
  /// type-compatibility up front, the same rule `Ledger::CreateEntry`
  /// enforces at execution time, so a broken template is rejected before it
  /// can ever be saved.
  pub async fn create( &self, user: UserId, input: ProjectionInput ) -> Result< Projection >
  {
    if input.amount.is_non_positive()
    {
      return Err( AppError::validation( "projection amount must be positive" ) );
    }

    let category = sqlx::query( "SELECT * FROM categories WHERE id = ?" )
      .bind( input.category_id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;
    let category_type: String = category
      .as_ref()
      .ok_or( AppError::NotFound )?
      .try_get( "type" )
      .map_err( AppError::Internal )?;
    let category_type = finhome_types::CategoryType::from_str( &category_type )
      .map_err( AppError::validation )?;
    if !category_type.permits_entry_type( input.entry_type )
    {
      return Err( AppError::validation( "entry type is not compatible with category type" ) );
    }

    let result = sqlx::query(
      "INSERT INTO projections \
       ( owner_id, name, category_id, amount, type, frequency, start_date, description, last_executed, active ) \
       VALUES ( ?, ?, ?, ?, ?, ?, ?, ?, NULL, ? )"
    )
    .bind( user.get() )
    .bind( &input.name )
    .bind( input.category_id.get() )
    .bind( input.amount.to_string() )
    .bind( input.entry_type.as_db_str() )
    .bind( input.frequency.as_db_str() )
    .bind( input.start_date.format( "%Y-%m-%d" ).to_string() )
    .bind( input.description.clone() )
    .bind( i64::from( input.active ) )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    Ok( Projection
    {
      id: ProjectionId::new( result.last_insert_rowid() ),
      owner_id: user,
      name: input.name,
      category_id: input.category_id,
      amount: input.amount,
      entry_type: input.entry_type,
      frequency: input.frequency,
      start_date: input.start_date,
      description: input.description,
      last_executed: None,
      active: input.active,
    } )
  }

  /// Find by id, asserting ownership.
  pub async fn require_owned( &self, id: ProjectionId, user: UserId ) -> Result< Projection >
  {
    let row = sqlx::query( "SELECT * FROM projections WHERE id = ?" )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let projection = row.as_ref().map( row_to_projection ).transpose()?.ok_or( AppError::NotFound )?;
    if projection.owner_id != user
    {
      return Err( AppError::Forbidden );
    }
    Ok( projection )
  }

  /// `Update` the template's mutable fields.
  pub async fn update( &self, user: UserId, id: ProjectionId, input: ProjectionInput ) -> Result< Projection >
  {
    if input.amount.is_non_positive()
    {
      return Err( AppError::validation( "projection amount must be positive" ) );
    }
    let existing = self.require_owned( id, user ).await?;

    sqlx::query(
      "UPDATE projections SET name = ?, category_id = ?, amount = ?, type = ?, frequency = ?, \
       start_date = ?, description = ?, active = ? WHERE id = ?"
    )
    .bind( &input.name )
    .bind( input.category_id.get() )
    .bind( input.amount.to_string() )
    .bind( input.entry_type.as_db_str() )
    .bind( input.frequency.as_db_str() )
    .bind( input.start_date.format( "%Y-%m-%d" ).to_string() )
    .bind( input.description.clone() )
    .bind( i64::from( input.active ) )
    .bind( id.get() )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    Ok( Projection
    {
      id,
      owner_id: user,
      name: input.name,
      category_id: input.category_id,
      amount: input.amount,
      entry_type: input.entry_type,
      frequency: input.frequency,
      start_date: input.start_date,
      description: input.description,
      last_executed: existing.last_executed,
      active: input.active,
    } )
  }

  /// Delete a template. Does not touch any `Entry` rows previously created
  /// from it (`source_projection_id` is left pointing at a now-missing
  /// template — those entries remain valid ledger history).
  pub async fn delete( &self, user: UserId, id: ProjectionId ) -> Result< () >
  {
    self.require_owned( id, user ).await?;
    sqlx::query( "DELETE FROM projections WHERE id = ?" )
      .bind( id.get() )
      .execute( &self.pool )
      .await
      .map_err( AppError::Internal )?;
    Ok( () )
  }

  /// `List` all templates owned by `user`.
  pub async fn list( &self, user: UserId ) -> Result< Vec< Projection > >
  {
    let rows = sqlx::query( "SELECT * FROM projections WHERE owner_id = ? ORDER BY id" )
      .bind( user.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_projection ).collect()
  }

  /// `execute` (`SPEC_FULL.md` §4.7): requires the projection be active and
  /// owned by `user`, then materializes it into an `Entry` dated today via
  /// `Ledger::CreateEntry` — reusing its budget side effect rather than
  /// duplicating it — and stamps `last_executed = today`.
  pub async fn execute( &self, user: UserId, id: ProjectionId, today: NaiveDate ) -> Result< Entry >
  {
    let projection = self.require_owned( id, user ).await?;
    if !projection.active
    {
      return Err( AppError::state_conflict( "projection is not active" ) );
    }

    let entry = self.ledger.create_entry(
      user,
      EntryInput
      {
        category_id: projection.category_id,
        amount: projection.amount,
        entry_type: projection.entry_type,
        description: projection.description.clone(),
        date: today,
      },
      Some( id ),
    )
    .await?;

    sqlx::query( "UPDATE projections SET last_executed = ? WHERE id = ?" )
      .bind( today.format( "%Y-%m-%d" ).to_string() )
      .bind( id.get() )
      .execute( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    Ok( entry )
  }
}

/// Stamps the timestamp attribute independent of the pool, used by test
/// fixtures that want to assert on `execute`'s return value without a
/// round trip through `Utc::now()` timing.
#[ must_use ]
pub fn today() -> NaiveDate
{
  Utc::now().date_naive()
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn projection_input_rejects_zero_amount()
  {
    let input = ProjectionInput
    {
      name: "Rent".to_string(),
      category_id: CategoryId::new( 1 ),
      amount: Money::zero(),
      entry_type: EntryType::Expense,
      frequency: BudgetFrequency::Monthly,
      start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
      description: None,
      active: true,
    };
    assert!( input.amount.is_non_positive() );
  }
}
