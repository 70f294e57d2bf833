//! Renewal Scheduler (C8)
//!
//! A periodic tokio task that rolls expired budget windows forward
//! (`auto_renew = true`) or retires them (`auto_renew = false`). Runs
//! outside any HTTP request; each row is processed in its own transaction
//! so one failure never blocks the rest of the tick (`SPEC_FULL.md` §4.8).

use crate::error::Result;
use chrono::NaiveDate;
use finhome_types::{ BudgetId, BudgetState, CategoryId, Money, UserId };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::budgets::BudgetRepository;

/// Outcome of processing one expired budget row.
#[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
pub enum RenewalOutcome
{
  /// A successor budget window was created and the prior row deactivated.
  Renewed,
  /// `auto_renew` was false; the prior row was simply deactivated.
  Retired,
}

/// The Renewal Scheduler (C8).
#[ derive( Debug, Clone ) ]
pub struct RenewalScheduler
{
  pool: SqlitePool,
  budgets: BudgetRepository,
}

impl RenewalScheduler
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    let budgets = BudgetRepository::new( pool.clone() );
    Self { pool, budgets }
  }

  /// Spawns the periodic tick as a tokio task. Returns the `JoinHandle` so
  /// the caller can hold or abort it; the task runs until the process
  /// exits or the handle is dropped and aborted.
  pub fn spawn( self, tick_interval: Duration ) -> tokio::task::JoinHandle< () >
  {
    tokio::spawn( async move
    {
      let mut interval = tokio::time::interval( tick_interval );
      loop
      {
        interval.tick().await;
        let today = chrono::Utc::now().date_naive();
        if let Err( error ) = self.run_once( today ).await
        {
          tracing::error!( error = %error, "renewal scheduler tick failed" );
        }
      }
    } )
  }

  /// Processes every budget whose window has expired as of `as_of`. Each
  /// row's renewal-or-retirement runs in its own transaction; a failure on
  /// one row is logged and skipped rather than aborting the tick.
  pub async fn run_once( &self, as_of: NaiveDate ) -> Result< Vec< RenewalOutcome > >
  {
    let pending = self.budgets.list_pending_processing_at( as_of ).await?;
    let mut outcomes = Vec::with_capacity( pending.len() );

    for budget in pending
    {
      match self.process_one( budget.id, budget.auto_renew ).await
      {
        Ok( outcome ) =>
        {
          finhome_telemetry::log_renewal_outcome( budget.id.get(), outcome == RenewalOutcome::Renewed, None );
          outcomes.push( outcome );
        }
        Err( error ) =>
        {
          finhome_telemetry::log_renewal_outcome( budget.id.get(), false, Some( &error.to_string() ) );
        }
      }
    }

    Ok( outcomes )
  }

  /// Renews or retires a single row inside one transaction: deactivate the
  /// prior window, and if `auto_renew`, insert the successor window
  /// starting the day after the prior `end_date` and stepped forward by
  /// the budget's frequency, with `consumed = 0` and a fresh public uuid.
  async fn process_one( &self, budget_id: BudgetId, auto_renew: bool ) -> Result< RenewalOutcome >
  {
    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    let row = sqlx::query( "SELECT * FROM budgets WHERE id = ?" )
      .bind( budget_id.get() )
      .fetch_optional( &mut *tx )
      .await
      .map_err( crate::error::AppError::Internal )?
      .ok_or( crate::error::AppError::NotFound )?;

    let owner_id = UserId::new( row.try_get( "owner_id" ).map_err( crate::error::AppError::Internal )? );
    let category_id = CategoryId::new( row.try_get( "category_id" ).map_err( crate::error::AppError::Internal )? );
    let cap_amount: String = row.try_get( "cap_amount" ).map_err( crate::error::AppError::Internal )?;
    let cap_amount = Money::from_str( &cap_amount )
      .map_err( |e| crate::error::AppError::validation( e.to_string() ) )?;
    let end_date: String = row.try_get( "end_date" ).map_err( crate::error::AppError::Internal )?;
    let end_date = NaiveDate::parse_from_str( &end_date, "%Y-%m-%d" )
      .map_err( |e| crate::error::AppError::validation( e.to_string() ) )?;
    let frequency: String = row.try_get( "frequency" ).map_err( crate::error::AppError::Internal )?;
    let frequency = finhome_types::BudgetFrequency::from_str( &frequency )
      .map_err( crate::error::AppError::validation )?;

    sqlx::query( "UPDATE budgets SET state = ? WHERE id = ?" )
      .bind( BudgetState::Inactive.as_db_str() )
      .bind( budget_id.get() )
      .execute( &mut *tx )
      .await
      .map_err( crate::error::AppError::Internal )?;

    let outcome = if auto_renew
    {
      let new_start = end_date.succ_opt().unwrap_or( end_date );
      let new_end = frequency
        .step( new_start )
        .pred_opt()
        .unwrap_or( new_start );
      let public_uuid = Uuid::new_v4();
      let now = chrono::Utc::now().to_rfc3339();

      sqlx::query(
        "INSERT INTO budgets \
         ( public_uuid, owner_id, category_id, cap_amount, consumed_amount, start_date, end_date, \
           frequency, state, auto_renew, created_at ) \
         VALUES ( ?, ?, ?, ?, '0', ?, ?, ?, 'active', 1, ? )"
      )
      .bind( public_uuid.to_string() )
      .bind( owner_id.get() )
      .bind( category_id.get() )
      .bind( cap_amount.to_string() )
      .bind( new_start.format( "%Y-%m-%d" ).to_string() )
      .bind( new_end.format( "%Y-%m-%d" ).to_string() )
      .bind( frequency.as_db_str() )
      .bind( now )
      .execute( &mut *tx )
      .await
      .map_err( crate::error::AppError::Internal )?;

      RenewalOutcome::Renewed
    }
    else
    {
      RenewalOutcome::Retired
    };

    tx.commit().await.map_err( crate::error::AppError::Internal )?;
    Ok( outcome )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use finhome_test_support::TestDatabaseBuilder;

  async fn setup() -> ( SqlitePool, RenewalScheduler )
  {
    let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
    crate::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
    let pool = db.pool().clone();
    ( pool.clone(), RenewalScheduler::new( pool ) )
  }

  async fn seed_user_and_category( pool: &SqlitePool ) -> ( UserId, CategoryId )
  {
    let user_result = sqlx::query(
      "INSERT INTO users ( public_uuid, email, active, role, created_at ) VALUES ( ?, ?, 1, 'user', ? )"
    )
    .bind( Uuid::new_v4().to_string() )
    .bind( "scheduler@example.com" )
    .bind( chrono::Utc::now().to_rfc3339() )
    .execute( pool )
    .await
    .expect( "seed user" );
    let user_id = UserId::new( user_result.last_insert_rowid() );

    let category_result = sqlx::query(
      "INSERT INTO categories ( name, type, predefined, owner_id ) VALUES ( ?, 'expense', 0, ? )"
    )
    .bind( "Groceries" )
    .bind( user_id.get() )
    .execute( pool )
    .await
    .expect( "seed category" );
    let category_id = CategoryId::new( category_result.last_insert_rowid() );

    ( user_id, category_id )
  }

  #[ tokio::test ]
  async fn expired_auto_renew_budget_creates_successor_and_deactivates_prior()
  {
    let ( pool, scheduler ) = setup().await;
    let ( owner_id, category_id ) = seed_user_and_category( &pool ).await;
    let budgets = BudgetRepository::new( pool.clone() );

    let created = budgets.create( crate::budgets::NewBudget
    {
      owner_id,
      category_id,
      cap_amount: Money::from_str( "500000" ).expect( "parse" ),
      start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
      end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
      frequency: finhome_types::BudgetFrequency::Monthly,
      auto_renew: true,
    } )
    .await
    .expect( "create budget" );

    let outcomes = scheduler
      .run_once( NaiveDate::from_ymd_opt( 2026, 2, 1 ).expect( "valid date" ) )
      .await
      .expect( "run once" );
    assert_eq!( outcomes, vec![ RenewalOutcome::Renewed ] );

    let prior = sqlx::query( "SELECT state FROM budgets WHERE id = ?" )
      .bind( created.id.get() )
      .fetch_one( &pool )
      .await
      .expect( "fetch prior" );
    let prior_state: String = prior.try_get( "state" ).expect( "state" );
    assert_eq!( prior_state, "inactive" );

    let successor_count: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM budgets WHERE owner_id = ? AND category_id = ? AND state = 'active'"
    )
    .bind( owner_id.get() )
    .bind( category_id.get() )
    .fetch_one( &pool )
    .await
    .expect( "count" );
    assert_eq!( successor_count, 1 );
  }

  #[ tokio::test ]
  async fn expired_non_renewing_budget_is_retired_not_renewed()
  {
    let ( pool, scheduler ) = setup().await;
    let ( owner_id, category_id ) = seed_user_and_category( &pool ).await;
    let budgets = BudgetRepository::new( pool.clone() );

    budgets.create( crate::budgets::NewBudget
    {
      owner_id,
      category_id,
      cap_amount: Money::from_str( "500000" ).expect( "parse" ),
      start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
      end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
      frequency: finhome_types::BudgetFrequency::Monthly,
      auto_renew: false,
    } )
    .await
    .expect( "create budget" );

    let outcomes = scheduler
      .run_once( NaiveDate::from_ymd_opt( 2026, 2, 1 ).expect( "valid date" ) )
      .await
      .expect( "run once" );
    assert_eq!( outcomes, vec![ RenewalOutcome::Retired ] );

    let active_count: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM budgets WHERE owner_id = ? AND category_id = ? AND state = 'active'"
    )
    .bind( owner_id.get() )
    .bind( category_id.get() )
    .fetch_one( &pool )
    .await
    .expect( "count" );
    assert_eq!( active_count, 0 );
  }
}
