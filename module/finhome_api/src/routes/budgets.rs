//! Budget Engine (C5, `SPEC_FULL.md` §6 `/budgets*`)

use axum::extract::{ Query, State };
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use finhome_core::budgets::{ Budget, BudgetRepository, BudgetUpdate, NewBudget };
use finhome_types::{ BudgetFrequency, BudgetPublicId, CategoryId, Money };
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{ ApiError, JsonBody, JsonPath };
use crate::jwt_auth::AuthenticatedUser;

/// Body accepted by `POST /budgets`.
#[ derive( Debug, Deserialize ) ]
pub struct CreateBudgetRequest
{
  pub category_id: i64,
  pub cap_amount: Money,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub frequency: BudgetFrequency,
  pub auto_renew: bool,
}

/// Body accepted by `PUT /budgets/{publicId}`.
#[ derive( Debug, Deserialize ) ]
pub struct UpdateBudgetRequest
{
  pub cap_amount: Money,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub frequency: BudgetFrequency,
  pub auto_renew: bool,
}

/// Query parameters accepted by `GET /budgets/near-limit`.
#[ derive( Debug, Deserialize ) ]
pub struct NearLimitQuery
{
  #[ serde( default = "default_threshold" ) ]
  pub threshold: Decimal,
}

fn default_threshold() -> Decimal
{
  Decimal::new( 8, 1 ) // 0.8
}

/// `POST /budgets`.
pub async fn create(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonBody( body ): JsonBody< CreateBudgetRequest >,
) -> Result< ( StatusCode, Json< Budget > ), ApiError >
{
  let repo = BudgetRepository::new( pool );
  let budget = repo.create( NewBudget
  {
    owner_id: user.id,
    category_id: CategoryId::new( body.category_id ),
    cap_amount: body.cap_amount,
    start_date: body.start_date,
    end_date: body.end_date,
    frequency: body.frequency,
    auto_renew: body.auto_renew,
  } ).await?;
  Ok( ( StatusCode::CREATED, Json( budget ) ) )
}

/// `GET /budgets` — every budget the caller owns, any state.
pub async fn list(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< Budget > >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  Ok( Json( repo.list_all( user.id ).await? ) )
}

/// `GET /budgets/{publicId}`.
pub async fn get_one(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( public_id ): JsonPath< Uuid >,
) -> Result< Json< Budget >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  Ok( Json( repo.require_owned( BudgetPublicId::new( public_id ), user.id ).await? ) )
}

/// `PUT /budgets/{publicId}`.
pub async fn update(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( public_id ): JsonPath< Uuid >,
  JsonBody( body ): JsonBody< UpdateBudgetRequest >,
) -> Result< Json< Budget >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  let owned = repo.require_owned( BudgetPublicId::new( public_id ), user.id ).await?;
  let updated = repo.update( owned.id, BudgetUpdate
  {
    cap_amount: body.cap_amount,
    start_date: body.start_date,
    end_date: body.end_date,
    frequency: body.frequency,
    auto_renew: body.auto_renew,
  } ).await?;
  Ok( Json( updated ) )
}

/// `DELETE /budgets/{publicId}` — force `INACTIVE` (the only terminal exit
/// besides the renewal scheduler's own expiry path).
pub async fn delete(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( public_id ): JsonPath< Uuid >,
) -> Result< StatusCode, ApiError >
{
  let repo = BudgetRepository::new( pool );
  let owned = repo.require_owned( BudgetPublicId::new( public_id ), user.id ).await?;
  repo.deactivate( owned.id ).await?;
  Ok( StatusCode::NO_CONTENT )
}

/// `PUT /budgets/{publicId}/deactivate`.
pub async fn deactivate(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( public_id ): JsonPath< Uuid >,
) -> Result< Json< Budget >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  let owned = repo.require_owned( BudgetPublicId::new( public_id ), user.id ).await?;
  Ok( Json( repo.deactivate( owned.id ).await? ) )
}

/// `GET /budgets/active` — active-and-in-window today.
pub async fn active(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< Budget > >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  Ok( Json( repo.list_current( user.id, finhome_core::projections::today() ).await? ) )
}

/// `GET /budgets/near-limit?threshold=0.8`.
pub async fn near_limit(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  Query( query ): Query< NearLimitQuery >,
) -> Result< Json< Vec< Budget > >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  Ok( Json( repo.list_near_limit( user.id, query.threshold ).await? ) )
}

/// `POST /budgets/sync-consumption` — recompute every owned budget's
/// `consumed` from source entries; idempotent (`SPEC_FULL.md` §8).
pub async fn sync_consumption(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< serde_json::Value >, ApiError >
{
  let repo = BudgetRepository::new( pool );
  let updated = repo.sync_all_consumption( user.id ).await?;
  Ok( Json( serde_json::json!( { "updated": updated } ) ) )
}
