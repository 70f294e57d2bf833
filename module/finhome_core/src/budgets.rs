//! Budget Engine (C5)
//!
//! Maintains per-`(owner, category)` budget windows and their incrementally
//! tracked `consumed` amount. `adjust` is the *only* non-request-driven
//! mutation path besides the renewal scheduler (`scheduler.rs`); every
//! caller runs it inside the same database transaction as the entry
//! mutation that triggered it (`SPEC_FULL.md` §4.5, §5).

use crate::error::{ AppError, Result };
use chrono::{ NaiveDate, Utc };
use finhome_types::{ BudgetFrequency, BudgetId, BudgetPublicId, BudgetState, CategoryId, Money, UserId };
use sqlx::{ Row, Sqlite, SqlitePool, Transaction };
use std::str::FromStr;
use serde::Serialize;
use uuid::Uuid;

/// A `Budget` row.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Budget
{
  pub id: BudgetId,
  pub public_uuid: BudgetPublicId,
  pub owner_id: UserId,
  pub category_id: CategoryId,
  pub cap_amount: Money,
  pub consumed_amount: Money,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub frequency: BudgetFrequency,
  pub state: BudgetState,
  pub auto_renew: bool,
}

impl Budget
{
  /// Recompute `state` from `consumed_amount` per the state-machine rule:
  /// `OVER` iff `consumed >= cap`, otherwise `ACTIVE` if it was `OVER`
  /// (never overwrites a deliberately `INACTIVE` row).
  fn recompute_state( &mut self )
  {
    if self.consumed_amount >= self.cap_amount.as_decimal()
    {
      self.state = BudgetState::Over;
    }
    else if self.state == BudgetState::Over
    {
      self.state = BudgetState::Active;
    }
  }

  /// `consumed / cap >= threshold`. Used by the near-limit query.
  #[ must_use ]
  pub fn consumption_ratio( &self ) -> rust_decimal::Decimal
  {
    if self.cap_amount.as_decimal().is_zero()
    {
      return rust_decimal::Decimal::ZERO;
    }
    self.consumed_amount.as_decimal() / self.cap_amount.as_decimal()
  }
}

/// Fields accepted when creating a `Budget`.
#[ derive( Debug, Clone ) ]
pub struct NewBudget
{
  pub owner_id: UserId,
  pub category_id: CategoryId,
  pub cap_amount: Money,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub frequency: BudgetFrequency,
  pub auto_renew: bool,
}

/// Mutable fields on `Budget::Update` (`SPEC_FULL.md` §4.5).
#[ derive( Debug, Clone ) ]
pub struct BudgetUpdate
{
  pub cap_amount: Money,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub frequency: BudgetFrequency,
  pub auto_renew: bool,
}

fn row_to_budget( row: &sqlx::sqlite::SqliteRow ) -> Result< Budget >
{
  let public_uuid: String = row.try_get( "public_uuid" ).map_err( AppError::Internal )?;
  let cap_amount: String = row.try_get( "cap_amount" ).map_err( AppError::Internal )?;
  let consumed_amount: String = row.try_get( "consumed_amount" ).map_err( AppError::Internal )?;
  let start_date: String = row.try_get( "start_date" ).map_err( AppError::Internal )?;
  let end_date: String = row.try_get( "end_date" ).map_err( AppError::Internal )?;
  let frequency: String = row.try_get( "frequency" ).map_err( AppError::Internal )?;
  let state: String = row.try_get( "state" ).map_err( AppError::Internal )?;

  Ok( Budget
  {
    id: BudgetId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    public_uuid: BudgetPublicId::new(
      Uuid::parse_str( &public_uuid ).map_err( |e| AppError::validation( e.to_string() ) )?
    ),
    owner_id: UserId::new( row.try_get( "owner_id" ).map_err( AppError::Internal )? ),
    category_id: CategoryId::new( row.try_get( "category_id" ).map_err( AppError::Internal )? ),
    cap_amount: Money::from_str( &cap_amount ).map_err( |e| AppError::validation( e.to_string() ) )?,
    consumed_amount: Money::from_str( &consumed_amount )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    start_date: NaiveDate::parse_from_str( &start_date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    end_date: NaiveDate::parse_from_str( &end_date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    frequency: BudgetFrequency::from_str( &frequency ).map_err( AppError::validation )?,
    state: BudgetState::from_str( &state ).map_err( AppError::validation )?,
    auto_renew: row.try_get::< i64, _ >( "auto_renew" ).map_err( AppError::Internal )? != 0,
  } )
}

/// Repository + Budget Engine operations (C5).
#[ derive( Debug, Clone ) ]
pub struct BudgetRepository
{
  pool: SqlitePool,
}

impl BudgetRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  #[ must_use ]
  pub fn pool( &self ) -> &SqlitePool
  {
    &self.pool
  }

  /// Find the single `ACTIVE` budget for `(owner, category)`, if any. The
  /// partial unique index on the store guarantees there is at most one.
  pub async fn find_active(
    &self,
    owner: UserId,
    category: CategoryId,
  ) -> Result< Option< Budget > >
  {
    let row = sqlx::query(
      "SELECT * FROM budgets WHERE owner_id = ? AND category_id = ? AND state = 'active'"
    )
    .bind( owner.get() )
    .bind( category.get() )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    row.as_ref().map( row_to_budget ).transpose()
  }

  /// Find by public uuid, asserting ownership (`FORBIDDEN` if owned by
  /// someone else, `NOT_FOUND` if no such row exists at all).
  pub async fn require_owned(
    &self,
    public_id: BudgetPublicId,
    owner: UserId,
  ) -> Result< Budget >
  {
    let row = sqlx::query( "SELECT * FROM budgets WHERE public_uuid = ?" )
      .bind( public_id.get().to_string() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let budget = row.as_ref().map( row_to_budget ).transpose()?.ok_or( AppError::NotFound )?;
    if budget.owner_id != owner
    {
      return Err( AppError::Forbidden );
    }
    Ok( budget )
  }

  /// Sum of `EXPENSE` entries for `(owner, category)` whose date falls in
  /// `[start, end]` inclusive — the initial `consumed` computation for a
  /// newly created budget.
  async fn sum_expenses_in_window(
    &self,
    owner: UserId,
    category: CategoryId,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result< Money >
  {
    // Amounts are stored as exact-decimal strings; fold them through
    // `Money` rather than `SUM( CAST( amount AS REAL ) )`, which would
    // route currency through binary floating point (`SPEC_FULL.md` §3).
    let amounts: Vec< String > = sqlx::query_scalar(
      "SELECT amount FROM entries \
       WHERE owner_id = ? AND category_id = ? AND type = 'expense' \
       AND entry_date >= ? AND entry_date <= ?"
    )
    .bind( owner.get() )
    .bind( category.get() )
    .bind( start.format( "%Y-%m-%d" ).to_string() )
    .bind( end.format( "%Y-%m-%d" ).to_string() )
    .fetch_all( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    let mut total = Money::zero();
    for amount in amounts
    {
      let amount = Money::from_str( &amount ).map_err( |e| AppError::validation( e.to_string() ) )?;
      total = total + amount;
    }
    Ok( total )
  }

  /// Create a budget. Rejects with `STATE_CONFLICT` if an `ACTIVE` budget
  /// already exists for `(owner, category)` (scenario 4, `SPEC_FULL.md`
  /// §8). Computes the initial `consumed` from existing entries and starts
  /// in `OVER` if that already meets or exceeds `cap`.
  pub async fn create( &self, new: NewBudget ) -> Result< Budget >
  {
    if new.end_date <= new.start_date
    {
      return Err( AppError::validation( "budget end_date must be after start_date" ) );
    }
    if new.cap_amount.is_non_positive()
    {
      return Err( AppError::validation( "budget cap_amount must be positive" ) );
    }
    if self.find_active( new.owner_id, new.category_id ).await?.is_some()
    {
      return Err( AppError::state_conflict(
        "an active budget already exists for this category"
      ) );
    }

    let consumed = self
      .sum_expenses_in_window( new.owner_id, new.category_id, new.start_date, new.end_date )
      .await?;
    let state = if consumed >= new.cap_amount.as_decimal() { BudgetState::Over } else { BudgetState::Active };
    let public_uuid = BudgetPublicId::generate();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
      "INSERT INTO budgets \
       ( public_uuid, owner_id, category_id, cap_amount, consumed_amount, start_date, end_date, \
         frequency, state, auto_renew, created_at ) \
       VALUES ( ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ? )"
    )
    .bind( public_uuid.get().to_string() )
    .bind( new.owner_id.get() )
    .bind( new.category_id.get() )
    .bind( new.cap_amount.to_string() )
    .bind( consumed.to_string() )
    .bind( new.start_date.format( "%Y-%m-%d" ).to_string() )
    .bind( new.end_date.format( "%Y-%m-%d" ).to_string() )
    .bind( new.frequency.as_db_str() )
    .bind( state.as_db_str() )
    .bind( i64::from( new.auto_renew ) )
    .bind( now )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    Ok( Budget
    {
      id: BudgetId::new( result.last_insert_rowid() ),
      public_uuid,
      owner_id: new.owner_id,
      category_id: new.category_id,
      cap_amount: new.cap_amount,
      consumed_amount: consumed,
      start_date: new.start_date,
      end_date: new.end_date,
      frequency: new.frequency,
      state,
      auto_renew: new.auto_renew,
    } )
  }

  /// Update the mutable fields (cap, window, frequency, auto-renew), then
  /// recompute `state` from the current `consumed` amount.
  pub async fn update( &self, budget_id: BudgetId, update: BudgetUpdate ) -> Result< Budget >
  {
    if update.end_date <= update.start_date
    {
      return Err( AppError::validation( "budget end_date must be after start_date" ) );
    }
    if update.cap_amount.is_non_positive()
    {
      return Err( AppError::validation( "budget cap_amount must be positive" ) );
    }

    let row = sqlx::query( "SELECT * FROM budgets WHERE id = ?" )
      .bind( budget_id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;
    let mut budget = row.as_ref().map( row_to_budget ).transpose()?.ok_or( AppError::NotFound )?;

    budget.cap_amount = update.cap_amount;
    budget.start_date = update.start_date;
    budget.end_date = update.end_date;
    budget.frequency = update.frequency;
    budget.auto_renew = update.auto_renew;
    budget.recompute_state();

    self.persist( &budget ).await?;
    Ok( budget )
  }

  /// Force a budget `INACTIVE` (`PUT /budgets/{publicId}/deactivate`).
  /// `INACTIVE` is terminal for the row.
  pub async fn deactivate( &self, budget_id: BudgetId ) -> Result< Budget >
  {
    let row = sqlx::query( "SELECT * FROM budgets WHERE id = ?" )
      .bind( budget_id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;
    let mut budget = row.as_ref().map( row_to_budget ).transpose()?.ok_or( AppError::NotFound )?;

    budget.state = BudgetState::Inactive;
    self.persist( &budget ).await?;
    Ok( budget )
  }

  /// The consumption delta operation (`adjust`, `SPEC_FULL.md` §4.5). A
  /// no-op if no `ACTIVE` budget exists for `(owner, category)`. Positive
  /// deltas increment `consumed`; negative deltas decrement it, clamped at
  /// zero. Must run inside the caller's transaction — see
  /// [`Self::adjust_in_tx`].
  pub async fn adjust( &self, owner: UserId, category: CategoryId, delta: Money ) -> Result< () >
  {
    let mut tx = crate::db::begin_immediate( &self.pool ).await?;
    Self::adjust_in_tx( &mut tx, owner, category, delta ).await?;
    tx.commit().await.map_err( AppError::Internal )?;
    Ok( () )
  }

  /// Same as [`Self::adjust`] but participates in a caller-supplied
  /// transaction, so it commits or rolls back atomically with the entry
  /// mutation that triggered it (`SPEC_FULL.md` §4.3, §5).
  pub async fn adjust_in_tx(
    tx: &mut Transaction< '_, Sqlite >,
    owner: UserId,
    category: CategoryId,
    delta: Money,
  ) -> Result< () >
  {
    let row = sqlx::query(
      "SELECT * FROM budgets WHERE owner_id = ? AND category_id = ? AND state = 'active'"
    )
    .bind( owner.get() )
    .bind( category.get() )
    .fetch_optional( &mut **tx )
    .await
    .map_err( AppError::Internal )?;

    let Some( row ) = row else { return Ok( () ) };
    let mut budget = row_to_budget( &row )?;

    budget.consumed_amount = if delta.is_non_positive()
    {
      // delta <= 0: subtract the magnitude, clamped at zero.
      budget.consumed_amount.saturating_sub( Money::zero().saturating_sub( delta ) )
    }
    else
    {
      budget.consumed_amount + delta
    };
    budget.recompute_state();

    sqlx::query(
      "UPDATE budgets SET consumed_amount = ?, state = ? WHERE id = ?"
    )
    .bind( budget.consumed_amount.to_string() )
    .bind( budget.state.as_db_str() )
    .bind( budget.id.get() )
    .execute( &mut **tx )
    .await
    .map_err( AppError::Internal )?;

    Ok( () )
  }

  /// Recompute `consumed` for every budget row from its entries (`POST
  /// /budgets/sync-consumption`). Idempotent: running it twice with no
  /// entry changes leaves every row's `consumed`/`state` unchanged
  /// (`SPEC_FULL.md` §8).
  pub async fn sync_all_consumption( &self, owner: UserId ) -> Result< usize >
  {
    let rows = sqlx::query( "SELECT * FROM budgets WHERE owner_id = ?" )
      .bind( owner.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let mut updated = 0usize;
    for row in &rows
    {
      let mut budget = row_to_budget( row )?;
      let consumed = self
        .sum_expenses_in_window( budget.owner_id, budget.category_id, budget.start_date, budget.end_date )
        .await?;
      budget.consumed_amount = consumed;
      budget.recompute_state();
      self.persist( &budget ).await?;
      updated += 1;
    }
    Ok( updated )
  }

  /// `GET /budgets` — every budget owned by `user`, any state. Distinct
  /// from [`Self::list_current`] (`GET /budgets/active`), which narrows to
  /// `ACTIVE` rows whose window contains today.
  pub async fn list_all( &self, owner: UserId ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query( "SELECT * FROM budgets WHERE owner_id = ? ORDER BY id" )
      .bind( owner.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_budget ).collect()
  }

  /// Budgets that are `ACTIVE` and whose window contains `today`.
  pub async fn list_current( &self, owner: UserId, today: NaiveDate ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query(
      "SELECT * FROM budgets WHERE owner_id = ? AND state = 'active' \
       AND start_date <= ? AND end_date >= ? ORDER BY id"
    )
    .bind( owner.get() )
    .bind( today.format( "%Y-%m-%d" ).to_string() )
    .bind( today.format( "%Y-%m-%d" ).to_string() )
    .fetch_all( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    rows.iter().map( row_to_budget ).collect()
  }

  /// Budgets where `consumed / cap >= threshold` (default 0.8).
  pub async fn list_near_limit( &self, owner: UserId, threshold: rust_decimal::Decimal ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query( "SELECT * FROM budgets WHERE owner_id = ?" )
      .bind( owner.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let budgets = rows.iter().map( row_to_budget ).collect::< Result< Vec< _ > > >()?;
    Ok( budgets.into_iter().filter( |b| b.consumption_ratio() >= threshold ).collect() )
  }

  /// Budgets in state `OVER`.
  pub async fn list_over( &self, owner: UserId ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query( "SELECT * FROM budgets WHERE owner_id = ? AND state = 'over'" )
      .bind( owner.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_budget ).collect()
  }

  /// Rows the renewal scheduler should act on: `end_date < as_of` and
  /// `state IN (ACTIVE, OVER)`, regardless of `auto_renew`. The source
  /// filtered this query by `auto_renew = true`, which meant its own
  /// "deactivate non-renewing expired budgets" branch could never run
  /// (`SPEC_FULL.md` §9.4) — fixed here by dropping that filter; the
  /// scheduler itself branches on `auto_renew` once it has the row.
  pub async fn list_pending_processing_at( &self, as_of: NaiveDate ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query(
      "SELECT * FROM budgets WHERE end_date < ? AND state IN ( 'active', 'over' ) ORDER BY id"
    )
    .bind( as_of.format( "%Y-%m-%d" ).to_string() )
    .fetch_all( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    rows.iter().map( row_to_budget ).collect()
  }

  async fn persist( &self, budget: &Budget ) -> Result< () >
  {
    sqlx::query(
      "UPDATE budgets SET cap_amount = ?, consumed_amount = ?, start_date = ?, end_date = ?, \
       frequency = ?, state = ?, auto_renew = ? WHERE id = ?"
    )
    .bind( budget.cap_amount.to_string() )
    .bind( budget.consumed_amount.to_string() )
    .bind( budget.start_date.format( "%Y-%m-%d" ).to_string() )
    .bind( budget.end_date.format( "%Y-%m-%d" ).to_string() )
    .bind( budget.frequency.as_db_str() )
    .bind( budget.state.as_db_str() )
    .bind( i64::from( budget.auto_renew ) )
    .bind( budget.id.get() )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;
    Ok( () )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use std::str::FromStr;

  fn sample_budget() -> Budget
  {
    Budget
    {
      id: BudgetId::new( 1 ),
      public_uuid: BudgetPublicId::generate(),
      owner_id: UserId::new( 1 ),
      category_id: CategoryId::new( 1 ),
      cap_amount: Money::from_str( "500000" ).expect( "parse" ),
      consumed_amount: Money::from_str( "200000" ).expect( "parse" ),
      start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
      end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
      frequency: BudgetFrequency::Monthly,
      state: BudgetState::Active,
      auto_renew: true,
    }
  }

  #[ test ]
  fn recompute_state_flips_to_over_at_cap()
  {
    let mut b = sample_budget();
    b.consumed_amount = b.cap_amount;
    b.recompute_state();
    assert_eq!( b.state, BudgetState::Over );
  }

  #[ test ]
  fn recompute_state_flips_back_from_over_when_under_cap()
  {
    let mut b = sample_budget();
    b.state = BudgetState::Over;
    b.consumed_amount = Money::from_str( "100" ).expect( "parse" );
    b.recompute_state();
    assert_eq!( b.state, BudgetState::Active );
  }

  #[ test ]
  fn recompute_state_never_revives_inactive()
  {
    let mut b = sample_budget();
    b.state = BudgetState::Inactive;
    b.consumed_amount = Money::zero();
    b.recompute_state();
    assert_eq!( b.state, BudgetState::Inactive );
  }

  #[ test ]
  fn consumption_ratio_matches_near_limit_threshold()
  {
    let mut b = sample_budget();
    b.consumed_amount = Money::from_str( "400000" ).expect( "parse" );
    assert!( b.consumption_ratio() >= rust_decimal::Decimal::from_str( "0.8" ).expect( "parse" ) );
  }
}
