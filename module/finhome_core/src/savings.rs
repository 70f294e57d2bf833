//! Savings Engine (C6)
//!
//! Manages `SavingsGoal`s, their installment plans, and `Contribution`s.
//! Every contribution event recomputes goal progress and rebalances the
//! remaining `PENDING` installments, so `Σ(expected_amount over PENDING) >=
//! max(0, target - accrued)` holds immediately after the event
//! (`SPEC_FULL.md` §8).

use crate::error::{ AppError, Result };
use chrono::{ NaiveDate, Utc };
use finhome_types::
{
  BudgetFrequency, ContributionId, GoalId, GoalState, InstallmentId, InstallmentState, Money, UserId,
};
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use serde::Serialize;

/// A `SavingsGoal` row.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Goal
{
  pub id: GoalId,
  pub owner_id: UserId,
  pub name: String,
  pub target_amount: Money,
  pub accrued_amount: Money,
  pub start_date: NaiveDate,
  pub deadline: Option< NaiveDate >,
  pub frequency: Option< BudgetFrequency >,
  pub icon: Option< String >,
  pub color: Option< String >,
  pub state: GoalState,
}

/// One step of a goal's installment plan.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Installment
{
  pub id: InstallmentId,
  pub goal_id: GoalId,
  pub sequence_number: i64,
  pub scheduled_date: NaiveDate,
  pub expected_amount: Money,
  pub state: InstallmentState,
  pub contribution_id: Option< ContributionId >,
}

/// A `Contribution` row.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Contribution
{
  pub id: ContributionId,
  pub goal_id: GoalId,
  pub owner_id: UserId,
  pub amount: Money,
  pub description: Option< String >,
  pub installment_id: Option< InstallmentId >,
}

/// Fields accepted when creating a `SavingsGoal`.
#[ derive( Debug, Clone ) ]
pub struct NewGoal
{
  pub owner_id: UserId,
  pub name: String,
  pub target_amount: Money,
  pub start_date: NaiveDate,
  pub deadline: Option< NaiveDate >,
  pub frequency: Option< BudgetFrequency >,
  pub icon: Option< String >,
  pub color: Option< String >,
}

/// Mutable fields on `PUT /savings/goals/{id}`. Mirrors the shape of
/// `BudgetUpdate`: the caller submits the full set of mutable fields and the
/// repository recomputes derived state (`GoalState::Completed`) afterward
/// rather than trusting a client-submitted completion flag.
#[ derive( Debug, Clone ) ]
pub struct GoalUpdate
{
  pub name: String,
  pub target_amount: Money,
  pub deadline: Option< NaiveDate >,
  pub frequency: Option< BudgetFrequency >,
  pub icon: Option< String >,
  pub color: Option< String >,
  pub state: GoalState,
}

/// Fields accepted when submitting a `Contribution`.
#[ derive( Debug, Clone ) ]
pub struct NewContribution
{
  pub goal_id: GoalId,
  pub amount: Money,
  pub description: Option< String >,
  pub installment_id: Option< InstallmentId >,
}

fn row_to_goal( row: &sqlx::sqlite::SqliteRow ) -> Result< Goal >
{
  let target_amount: String = row.try_get( "target_amount" ).map_err( AppError::Internal )?;
  let accrued_amount: String = row.try_get( "accrued_amount" ).map_err( AppError::Internal )?;
  let start_date: String = row.try_get( "start_date" ).map_err( AppError::Internal )?;
  let deadline: Option< String > = row.try_get( "deadline" ).map_err( AppError::Internal )?;
  let frequency: Option< String > = row.try_get( "frequency" ).map_err( AppError::Internal )?;
  let state: String = row.try_get( "state" ).map_err( AppError::Internal )?;

  Ok( Goal
  {
    id: GoalId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    owner_id: UserId::new( row.try_get( "owner_id" ).map_err( AppError::Internal )? ),
    name: row.try_get( "name" ).map_err( AppError::Internal )?,
    target_amount: Money::from_str( &target_amount )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    accrued_amount: Money::from_str( &accrued_amount )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    start_date: NaiveDate::parse_from_str( &start_date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    deadline: deadline
      .map( |d| NaiveDate::parse_from_str( &d, "%Y-%m-%d" ) )
      .transpose()
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    frequency: frequency
      .map( |f| BudgetFrequency::from_str( &f ) )
      .transpose()
      .map_err( AppError::validation )?,
    icon: row.try_get( "icon" ).map_err( AppError::Internal )?,
    color: row.try_get( "color" ).map_err( AppError::Internal )?,
    state: GoalState::from_str( &state ).map_err( AppError::validation )?,
  } )
}

fn row_to_installment( row: &sqlx::sqlite::SqliteRow ) -> Result< Installment >
{
  let scheduled_date: String = row.try_get( "scheduled_date" ).map_err( AppError::Internal )?;
  let expected_amount: String = row.try_get( "expected_amount" ).map_err( AppError::Internal )?;
  let state: String = row.try_get( "state" ).map_err( AppError::Internal )?;
  let contribution_id: Option< i64 > = row.try_get( "contribution_id" ).map_err( AppError::Internal )?;

  Ok( Installment
  {
    id: InstallmentId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    goal_id: GoalId::new( row.try_get( "goal_id" ).map_err( AppError::Internal )? ),
    sequence_number: row.try_get( "sequence_number" ).map_err( AppError::Internal )?,
    scheduled_date: NaiveDate::parse_from_str( &scheduled_date, "%Y-%m-%d" )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    expected_amount: Money::from_str( &expected_amount )
      .map_err( |e| AppError::validation( e.to_string() ) )?,
    state: InstallmentState::from_str( &state ).map_err( AppError::validation )?,
    contribution_id: contribution_id.map( ContributionId::new ),
  } )
}

fn row_to_contribution( row: &sqlx::sqlite::SqliteRow ) -> Result< Contribution >
{
  let amount: String = row.try_get( "amount" ).map_err( AppError::Internal )?;
  let installment_id: Option< i64 > = row.try_get( "installment_id" ).map_err( AppError::Internal )?;

  Ok( Contribution
  {
    id: ContributionId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    goal_id: GoalId::new( row.try_get( "goal_id" ).map_err( AppError::Internal )? ),
    owner_id: UserId::new( row.try_get( "owner_id" ).map_err( AppError::Internal )? ),
    amount: Money::from_str( &amount ).map_err( |e| AppError::validation( e.to_string() ) )?,
    description: row.try_get( "description" ).map_err( AppError::Internal )?,
    installment_id: installment_id.map( InstallmentId::new ),
  } )
}

/// Repository + Savings Engine operations (C6).
#[ derive( Debug, Clone ) ]
pub struct SavingsRepository
{
  pool: SqlitePool,
}

impl SavingsRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// `Goal creation` (`SPEC_FULL.md` §4.6). Rejects a duplicate name per
  /// owner with `STATE_CONFLICT`. If both `frequency` and `deadline` are
  /// present, atomically generates the installment plan: steps from
  /// `start` by the frequency until strictly past `deadline`, then divides
  /// `target` across that many installments with ceiling rounding so they
  /// collectively cover the target (`Money::div_ceil`, scenario 3).
  pub async fn create_goal( &self, new: NewGoal ) -> Result< Goal >
  {
    if new.target_amount.is_non_positive()
    {
      return Err( AppError::validation( "goal target_amount must be positive" ) );
    }
    if let Some( deadline ) = new.deadline
    {
      if deadline <= new.start_date
      {
        return Err( AppError::validation( "goal deadline must be after start_date" ) );
      }
    }

    let existing: Option< i64 > = sqlx::query_scalar(
      "SELECT id FROM savings_goals WHERE owner_id = ? AND name = ?"
    )
    .bind( new.owner_id.get() )
    .bind( &new.name )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;
    if existing.is_some()
    {
      return Err( AppError::validation( "a goal with this name already exists" ) );
    }

    let schedule = match ( new.frequency, new.deadline )
    {
      ( Some( frequency ), Some( deadline ) ) => Some( plan_installments( new.start_date, deadline, frequency, new.target_amount ) ),
      _ => None,
    };

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    let result = sqlx::query(
      "INSERT INTO savings_goals \
       ( owner_id, name, target_amount, accrued_amount, start_date, deadline, frequency, icon, color, state ) \
       VALUES ( ?, ?, ?, '0', ?, ?, ?, ?, ?, 'active' )"
    )
    .bind( new.owner_id.get() )
    .bind( &new.name )
    .bind( new.target_amount.to_string() )
    .bind( new.start_date.format( "%Y-%m-%d" ).to_string() )
    .bind( new.deadline.map( |d| d.format( "%Y-%m-%d" ).to_string() ) )
    .bind( new.frequency.map( BudgetFrequency::as_db_str ) )
    .bind( new.icon.clone() )
    .bind( new.color.clone() )
    .execute( &mut *tx )
    .await
    .map_err( AppError::Internal )?;

    let goal_id = GoalId::new( result.last_insert_rowid() );

    if let Some( dates_and_amounts ) = &schedule
    {
      for ( sequence_number, ( date, amount ) ) in dates_and_amounts.iter().enumerate()
      {
        sqlx::query(
          "INSERT INTO installments ( goal_id, sequence_number, scheduled_date, expected_amount, state ) \
           VALUES ( ?, ?, ?, ?, 'pending' )"
        )
        .bind( goal_id.get() )
        .bind( i64::try_from( sequence_number + 1 ).unwrap_or( i64::MAX ) )
        .bind( date.format( "%Y-%m-%d" ).to_string() )
        .bind( amount.to_string() )
        .execute( &mut *tx )
        .await
        .map_err( AppError::Internal )?;
      }
    }

    tx.commit().await.map_err( AppError::Internal )?;

    Ok( Goal
    {
      id: goal_id,
      owner_id: new.owner_id,
      name: new.name,
      target_amount: new.target_amount,
      accrued_amount: Money::zero(),
      start_date: new.start_date,
      deadline: new.deadline,
      frequency: new.frequency,
      icon: new.icon,
      color: new.color,
      state: GoalState::Active,
    } )
  }

  /// `PUT /savings/goals/{id}`. Updates the mutable fields (name, target,
  /// deadline, frequency, icon, color) and the caller's requested
  /// ACTIVE/PAUSED/CANCELLED transition, then recomputes the `COMPLETED`
  /// invariant from `accrued` vs. the (possibly just-changed) `target` —
  /// a client cannot set `COMPLETED` directly, and raising `target` back
  /// above `accrued` un-completes a previously completed goal.
  pub async fn update_goal( &self, user: UserId, id: GoalId, update: GoalUpdate ) -> Result< Goal >
  {
    if update.target_amount.is_non_positive()
    {
      return Err( AppError::validation( "goal target_amount must be positive" ) );
    }
    if matches!( update.state, GoalState::Completed )
    {
      return Err( AppError::validation( "goal state cannot be set to completed directly" ) );
    }

    let mut goal = self.require_owned( id, user ).await?;

    if update.name != goal.name
    {
      let existing: Option< i64 > = sqlx::query_scalar(
        "SELECT id FROM savings_goals WHERE owner_id = ? AND name = ? AND id != ?"
      )
      .bind( user.get() )
      .bind( &update.name )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;
      if existing.is_some()
      {
        return Err( AppError::validation( "a goal with this name already exists" ) );
      }
    }

    goal.name = update.name;
    goal.target_amount = update.target_amount;
    goal.deadline = update.deadline;
    goal.frequency = update.frequency;
    goal.icon = update.icon;
    goal.color = update.color;
    goal.state = update.state;

    if goal.accrued_amount >= goal.target_amount.as_decimal()
    {
      goal.state = GoalState::Completed;
    }

    sqlx::query(
      "UPDATE savings_goals SET name = ?, target_amount = ?, deadline = ?, frequency = ?, \
       icon = ?, color = ?, state = ? WHERE id = ?"
    )
    .bind( &goal.name )
    .bind( goal.target_amount.to_string() )
    .bind( goal.deadline.map( |d| d.format( "%Y-%m-%d" ).to_string() ) )
    .bind( goal.frequency.map( BudgetFrequency::as_db_str ) )
    .bind( goal.icon.clone() )
    .bind( goal.color.clone() )
    .bind( goal.state.as_db_str() )
    .bind( id.get() )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    Ok( goal )
  }

  /// Find by id, asserting ownership.
  pub async fn require_owned( &self, id: GoalId, user: UserId ) -> Result< Goal >
  {
    let row = sqlx::query( "SELECT * FROM savings_goals WHERE id = ?" )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let goal = row.as_ref().map( row_to_goal ).transpose()?.ok_or( AppError::NotFound )?;
    if goal.owner_id != user
    {
      return Err( AppError::Forbidden );
    }
    Ok( goal )
  }

  /// `GET /savings/goals/{id}/installments`, ordered by sequence.
  pub async fn list_installments( &self, goal_id: GoalId ) -> Result< Vec< Installment > >
  {
    let rows = sqlx::query( "SELECT * FROM installments WHERE goal_id = ? ORDER BY sequence_number" )
      .bind( goal_id.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_installment ).collect()
  }

  /// `GET /savings/goals/{id}/contributions`, most recent first.
  pub async fn list_contributions( &self, goal_id: GoalId ) -> Result< Vec< Contribution > >
  {
    let rows = sqlx::query( "SELECT * FROM contributions WHERE goal_id = ? ORDER BY id DESC" )
      .bind( goal_id.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_contribution ).collect()
  }

  /// `contribute` (`SPEC_FULL.md` §4.6). Rejects `COMPLETED`/`CANCELLED`
  /// goals with `STATE_CONFLICT`. Persists the contribution, optionally
  /// marks one installment `PAID` (recording the amount actually paid),
  /// recomputes goal progress, and rebalances the remaining `PENDING`
  /// installments.
  pub async fn contribute( &self, user: UserId, new: NewContribution ) -> Result< Contribution >
  {
    if new.amount.is_non_positive()
    {
      return Err( AppError::validation( "contribution amount must be positive" ) );
    }

    let goal = self.require_owned( new.goal_id, user ).await?;
    if matches!( goal.state, GoalState::Completed | GoalState::Cancelled )
    {
      return Err( AppError::state_conflict( "cannot contribute to a completed or cancelled goal" ) );
    }

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    let result = sqlx::query(
      "INSERT INTO contributions ( goal_id, owner_id, amount, description, created_at, installment_id ) \
       VALUES ( ?, ?, ?, ?, ?, ? )"
    )
    .bind( new.goal_id.get() )
    .bind( user.get() )
    .bind( new.amount.to_string() )
    .bind( new.description.clone() )
    .bind( Utc::now().to_rfc3339() )
    .bind( new.installment_id.map( InstallmentId::get ) )
    .execute( &mut *tx )
    .await
    .map_err( AppError::Internal )?;
    let contribution_id = ContributionId::new( result.last_insert_rowid() );

    if let Some( installment_id ) = new.installment_id
    {
      let belongs: Option< i64 > = sqlx::query_scalar(
        "SELECT id FROM installments WHERE id = ? AND goal_id = ?"
      )
      .bind( installment_id.get() )
      .bind( new.goal_id.get() )
      .fetch_optional( &mut *tx )
      .await
      .map_err( AppError::Internal )?;

      if belongs.is_some()
      {
        sqlx::query(
          "UPDATE installments SET state = 'paid', expected_amount = ?, contribution_id = ? WHERE id = ?"
        )
        .bind( new.amount.to_string() )
        .bind( contribution_id.get() )
        .bind( installment_id.get() )
        .execute( &mut *tx )
        .await
        .map_err( AppError::Internal )?;
      }
    }

    let updated_goal = recompute_goal_progress( &mut tx, goal, new.amount ).await?;
    rebalance_pending_installments( &mut tx, updated_goal.id, updated_goal.target_amount, updated_goal.accrued_amount ).await?;

    tx.commit().await.map_err( AppError::Internal )?;

    Ok( Contribution
    {
      id: contribution_id,
      goal_id: new.goal_id,
      owner_id: user,
      amount: new.amount,
      description: new.description,
      installment_id: new.installment_id,
    } )
  }

  /// Find a contribution by id, asserting ownership.
  pub async fn require_owned_contribution( &self, id: ContributionId, user: UserId ) -> Result< Contribution >
  {
    let row = sqlx::query( "SELECT * FROM contributions WHERE id = ?" )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    let contribution = row.as_ref().map( row_to_contribution ).transpose()?.ok_or( AppError::NotFound )?;
    if contribution.owner_id != user
    {
      return Err( AppError::Forbidden );
    }
    Ok( contribution )
  }

  /// Only `amount` and `description` change. Applies the delta
  /// `new - old` via `recompute_goal_progress` and rebalances.
  pub async fn update_contribution(
    &self,
    user: UserId,
    id: ContributionId,
    amount: Money,
    description: Option< String >,
  ) -> Result< Contribution >
  {
    if amount.is_non_positive()
    {
      return Err( AppError::validation( "contribution amount must be positive" ) );
    }

    let old = self.require_owned_contribution( id, user ).await?;
    let goal = self.require_owned( old.goal_id, user ).await?;
    let delta = amount - old.amount;

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    sqlx::query( "UPDATE contributions SET amount = ?, description = ? WHERE id = ?" )
      .bind( amount.to_string() )
      .bind( description.clone() )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;

    if let Some( installment_id ) = old.installment_id
    {
      sqlx::query( "UPDATE installments SET expected_amount = ? WHERE id = ? AND state = 'paid'" )
        .bind( amount.to_string() )
        .bind( installment_id.get() )
        .execute( &mut *tx )
        .await
        .map_err( AppError::Internal )?;
    }

    let updated_goal = recompute_goal_progress( &mut tx, goal, delta ).await?;
    rebalance_pending_installments( &mut tx, updated_goal.id, updated_goal.target_amount, updated_goal.accrued_amount ).await?;

    tx.commit().await.map_err( AppError::Internal )?;

    Ok( Contribution { id, goal_id: old.goal_id, owner_id: user, amount, description, installment_id: old.installment_id } )
  }

  /// Unpays the targeted installment if one was linked (`PENDING`, cleared
  /// `contribution_id`), applies `recompute_goal_progress(-amount)` and
  /// rebalances, then deletes the contribution row.
  pub async fn delete_contribution( &self, user: UserId, id: ContributionId ) -> Result< () >
  {
    let contribution = self.require_owned_contribution( id, user ).await?;
    let goal = self.require_owned( contribution.goal_id, user ).await?;

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;

    if let Some( installment_id ) = contribution.installment_id
    {
      sqlx::query(
        "UPDATE installments SET state = 'pending', contribution_id = NULL WHERE id = ?"
      )
      .bind( installment_id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;
    }

    let updated_goal = recompute_goal_progress(
      &mut tx,
      goal,
      Money::zero().saturating_sub( contribution.amount ),
    )
    .await?;
    rebalance_pending_installments( &mut tx, updated_goal.id, updated_goal.target_amount, updated_goal.accrued_amount ).await?;

    sqlx::query( "DELETE FROM contributions WHERE id = ?" )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;

    tx.commit().await.map_err( AppError::Internal )?;
    Ok( () )
  }

  /// Deletes all contributions, all installments, then the goal, in one
  /// transaction (`SPEC_FULL.md` §4.6).
  pub async fn delete_goal( &self, user: UserId, id: GoalId ) -> Result< () >
  {
    self.require_owned( id, user ).await?;

    let mut tx = crate::db::begin_immediate( &self.pool ).await?;
    sqlx::query( "DELETE FROM contributions WHERE goal_id = ?" )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;
    sqlx::query( "DELETE FROM installments WHERE goal_id = ?" )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;
    sqlx::query( "DELETE FROM savings_goals WHERE id = ?" )
      .bind( id.get() )
      .execute( &mut *tx )
      .await
      .map_err( AppError::Internal )?;
    tx.commit().await.map_err( AppError::Internal )?;
    Ok( () )
  }

  /// `List` all goals owned by `user`.
  pub async fn list_goals( &self, user: UserId ) -> Result< Vec< Goal > >
  {
    let rows = sqlx::query( "SELECT * FROM savings_goals WHERE owner_id = ? ORDER BY id" )
      .bind( user.get() )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_goal ).collect()
  }
}

/// Generates the series of scheduled installment dates by stepping from
/// `start` by `frequency` until strictly past `deadline`, then divides
/// `target` by the step count using ceiling rounding so the installments
/// collectively cover the target (scenario 3, `SPEC_FULL.md` §4.6, §8).
fn plan_installments(
  start: NaiveDate,
  deadline: NaiveDate,
  frequency: BudgetFrequency,
  target: Money,
) -> Vec< ( NaiveDate, Money ) >
{
  let mut dates = vec![ start ];
  let mut current = start;
  loop
  {
    let next = frequency.step( current );
    if next > deadline
    {
      break;
    }
    dates.push( next );
    current = next;
  }

  let count = u32::try_from( dates.len() ).unwrap_or( 1 ).max( 1 );
  let per_installment = target.div_ceil( count );
  dates.into_iter().map( |d| ( d, per_installment ) ).collect()
}

/// `recomputeGoalProgress(goal, delta)` (`SPEC_FULL.md` §4.6): adjusts
/// `accrued` by `delta`, transitions to `COMPLETED` once `accrued >=
/// target`, and resumes a `PAUSED` goal to `ACTIVE` on a positive
/// contribution.
async fn recompute_goal_progress(
  tx: &mut sqlx::Transaction< '_, sqlx::Sqlite >,
  mut goal: Goal,
  delta: Money,
) -> Result< Goal >
{
  goal.accrued_amount = if delta.is_non_positive()
  {
    goal.accrued_amount.saturating_sub( Money::zero().saturating_sub( delta ) )
  }
  else
  {
    goal.accrued_amount + delta
  };

  if goal.accrued_amount >= goal.target_amount.as_decimal()
  {
    goal.state = GoalState::Completed;
  }
  else if goal.state == GoalState::Paused
  {
    goal.state = GoalState::Active;
  }

  sqlx::query( "UPDATE savings_goals SET accrued_amount = ?, state = ? WHERE id = ?" )
    .bind( goal.accrued_amount.to_string() )
    .bind( goal.state.as_db_str() )
    .bind( goal.id.get() )
    .execute( &mut **tx )
    .await
    .map_err( AppError::Internal )?;

  Ok( goal )
}

/// `rebalancePendingInstallments(goal)`: `remaining = max(0, target -
/// accrued)`; each `PENDING` installment's `expected_amount` becomes
/// `⌈remaining / N⌉` where `N` is the count of `PENDING` installments.
async fn rebalance_pending_installments(
  tx: &mut sqlx::Transaction< '_, sqlx::Sqlite >,
  goal_id: GoalId,
  target: Money,
  accrued: Money,
) -> Result< () >
{
  let pending_ids: Vec< i64 > = sqlx::query_scalar(
    "SELECT id FROM installments WHERE goal_id = ? AND state = 'pending' ORDER BY sequence_number"
  )
  .bind( goal_id.get() )
  .fetch_all( &mut **tx )
  .await
  .map_err( AppError::Internal )?;

  if pending_ids.is_empty()
  {
    return Ok( () );
  }

  let remaining = target.remaining_after( accrued );
  let count = u32::try_from( pending_ids.len() ).unwrap_or( 1 ).max( 1 );
  let per_installment = remaining.div_ceil( count );

  for id in pending_ids
  {
    sqlx::query( "UPDATE installments SET expected_amount = ? WHERE id = ?" )
      .bind( per_installment.to_string() )
      .bind( id )
      .execute( &mut **tx )
      .await
      .map_err( AppError::Internal )?;
  }

  Ok( () )
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn plan_installments_matches_scenario_3()
  {
    let start = NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" );
    let deadline = NaiveDate::from_ymd_opt( 2026, 6, 1 ).expect( "valid date" );
    let target = Money::from_str( "1200000" ).expect( "parse" );

    let plan = plan_installments( start, deadline, BudgetFrequency::Monthly, target );

    assert_eq!( plan.len(), 6 );
    assert_eq!( plan[ 0 ].0, start );
    assert_eq!( plan[ 5 ].0, NaiveDate::from_ymd_opt( 2026, 6, 1 ).expect( "valid date" ) );
    for ( _, amount ) in &plan
    {
      assert_eq!( amount.to_string(), "200000.00" );
    }
  }

  #[ test ]
  fn plan_installments_stops_strictly_past_deadline()
  {
    let start = NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" );
    let deadline = NaiveDate::from_ymd_opt( 2026, 2, 15 ).expect( "valid date" );
    let target = Money::from_str( "100" ).expect( "parse" );

    let plan = plan_installments( start, deadline, BudgetFrequency::Monthly, target );

    // Jan 1, Feb 1 included; Mar 1 is past Feb 15, excluded.
    assert_eq!( plan.len(), 2 );
  }
}
