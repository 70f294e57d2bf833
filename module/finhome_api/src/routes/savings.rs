//! Savings Engine (C6, `SPEC_FULL.md` §6 `/savings/*`)

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use finhome_core::savings::{ Contribution, Goal, GoalUpdate, Installment, NewContribution, NewGoal, SavingsRepository };
use finhome_types::{ BudgetFrequency, ContributionId, GoalId, GoalState, InstallmentId, Money };
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{ ApiError, JsonBody, JsonPath };
use crate::jwt_auth::AuthenticatedUser;

/// Body accepted by `POST /savings/goals`.
#[ derive( Debug, Deserialize ) ]
pub struct CreateGoalRequest
{
  pub name: String,
  pub target_amount: Money,
  pub start_date: NaiveDate,
  pub deadline: Option< NaiveDate >,
  pub frequency: Option< BudgetFrequency >,
  pub icon: Option< String >,
  pub color: Option< String >,
}

/// Body accepted by `PUT /savings/goals/{id}`.
#[ derive( Debug, Deserialize ) ]
pub struct UpdateGoalRequest
{
  pub name: String,
  pub target_amount: Money,
  pub deadline: Option< NaiveDate >,
  pub frequency: Option< BudgetFrequency >,
  pub icon: Option< String >,
  pub color: Option< String >,
  pub state: GoalState,
}

impl From< UpdateGoalRequest > for GoalUpdate
{
  fn from( value: UpdateGoalRequest ) -> Self
  {
    Self
    {
      name: value.name,
      target_amount: value.target_amount,
      deadline: value.deadline,
      frequency: value.frequency,
      icon: value.icon,
      color: value.color,
      state: value.state,
    }
  }
}

/// Body accepted by `POST /savings/contributions`.
#[ derive( Debug, Deserialize ) ]
pub struct CreateContributionRequest
{
  pub goal_id: i64,
  pub amount: Money,
  pub description: Option< String >,
  pub installment_id: Option< i64 >,
}

impl From< CreateContributionRequest > for NewContribution
{
  fn from( value: CreateContributionRequest ) -> Self
  {
    Self
    {
      goal_id: GoalId::new( value.goal_id ),
      amount: value.amount,
      description: value.description,
      installment_id: value.installment_id.map( InstallmentId::new ),
    }
  }
}

/// Body accepted by `PUT /savings/contributions/{id}`.
#[ derive( Debug, Deserialize ) ]
pub struct UpdateContributionRequest
{
  pub amount: Money,
  pub description: Option< String >,
}

/// `POST /savings/goals`.
pub async fn create_goal(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonBody( body ): JsonBody< CreateGoalRequest >,
) -> Result< ( StatusCode, Json< Goal > ), ApiError >
{
  let repo = SavingsRepository::new( pool );
  let goal = repo.create_goal( NewGoal
  {
    owner_id: user.id,
    name: body.name,
    target_amount: body.target_amount,
    start_date: body.start_date,
    deadline: body.deadline,
    frequency: body.frequency,
    icon: body.icon,
    color: body.color,
  } ).await?;
  Ok( ( StatusCode::CREATED, Json( goal ) ) )
}

/// `GET /savings/goals` — goals owned by the caller.
pub async fn list_goals(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< Goal > >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  Ok( Json( repo.list_goals( user.id ).await? ) )
}

/// `GET /savings/goals/{id}`.
pub async fn get_goal(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< Goal >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  Ok( Json( repo.require_owned( GoalId::new( id ), user.id ).await? ) )
}

/// `PUT /savings/goals/{id}`.
pub async fn update_goal(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
  JsonBody( body ): JsonBody< UpdateGoalRequest >,
) -> Result< Json< Goal >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  let goal = repo.update_goal( user.id, GoalId::new( id ), body.into() ).await?;
  Ok( Json( goal ) )
}

/// `DELETE /savings/goals/{id}`.
pub async fn delete_goal(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< StatusCode, ApiError >
{
  let repo = SavingsRepository::new( pool );
  repo.delete_goal( user.id, GoalId::new( id ) ).await?;
  Ok( StatusCode::NO_CONTENT )
}

/// `GET /savings/goals/{id}/installments` — the goal's plan, paid and
/// pending steps alike.
pub async fn list_installments(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< Vec< Installment > >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  let goal_id = GoalId::new( id );
  repo.require_owned( goal_id, user.id ).await?;
  Ok( Json( repo.list_installments( goal_id ).await? ) )
}

/// `GET /savings/goals/{id}/contributions`.
pub async fn list_goal_contributions(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< Vec< Contribution > >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  let goal_id = GoalId::new( id );
  repo.require_owned( goal_id, user.id ).await?;
  Ok( Json( repo.list_contributions( goal_id ).await? ) )
}

/// `POST /savings/contributions` — records a contribution, recomputes goal
/// progress, and rebalances remaining `PENDING` installments.
pub async fn create_contribution(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonBody( body ): JsonBody< CreateContributionRequest >,
) -> Result< ( StatusCode, Json< Contribution > ), ApiError >
{
  let repo = SavingsRepository::new( pool );
  let contribution = repo.contribute( user.id, body.into() ).await?;
  Ok( ( StatusCode::CREATED, Json( contribution ) ) )
}

/// `PUT /savings/contributions/{id}`.
pub async fn update_contribution(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
  JsonBody( body ): JsonBody< UpdateContributionRequest >,
) -> Result< Json< Contribution >, ApiError >
{
  let repo = SavingsRepository::new( pool );
  let contribution = repo
    .update_contribution( user.id, ContributionId::new( id ), body.amount, body.description )
    .await?;
  Ok( Json( contribution ) )
}

/// `DELETE /savings/contributions/{id}` — unwinds the linked installment and
/// goal progress before removing the row.
pub async fn delete_contribution(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< StatusCode, ApiError >
{
  let repo = SavingsRepository::new( pool );
  repo.delete_contribution( user.id, ContributionId::new( id ) ).await?;
  Ok( StatusCode::NO_CONTENT )
}
