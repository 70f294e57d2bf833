//! Projection Engine (C7, `SPEC_FULL.md` §6 `/projections*`)

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use finhome_core::projections::{ Projection, ProjectionInput, ProjectionRepository };
use finhome_types::{ BudgetFrequency, CategoryId, EntryType, Money, ProjectionId };
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{ ApiError, JsonBody, JsonPath };
use crate::jwt_auth::AuthenticatedUser;

fn default_active() -> bool
{
  true
}

/// Body accepted by `POST`/`PUT /projections[/{id}]`.
#[ derive( Debug, Deserialize ) ]
pub struct ProjectionRequest
{
  pub name: String,
  pub category_id: i64,
  pub amount: Money,
  pub entry_type: EntryType,
  pub frequency: BudgetFrequency,
  pub start_date: NaiveDate,
  pub description: Option< String >,
  #[ serde( default = "default_active" ) ]
  pub active: bool,
}

impl From< ProjectionRequest > for ProjectionInput
{
  fn from( value: ProjectionRequest ) -> Self
  {
    Self
    {
      name: value.name,
      category_id: CategoryId::new( value.category_id ),
      amount: value.amount,
      entry_type: value.entry_type,
      frequency: value.frequency,
      start_date: value.start_date,
      description: value.description,
      active: value.active,
    }
  }
}

/// `POST /projections`.
pub async fn create(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonBody( body ): JsonBody< ProjectionRequest >,
) -> Result< ( StatusCode, Json< Projection > ), ApiError >
{
  let repo = ProjectionRepository::new( pool );
  let projection = repo.create( user.id, body.into() ).await?;
  Ok( ( StatusCode::CREATED, Json( projection ) ) )
}

/// `GET /projections` — templates owned by the caller.
pub async fn list(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< Projection > >, ApiError >
{
  let repo = ProjectionRepository::new( pool );
  Ok( Json( repo.list( user.id ).await? ) )
}

/// `GET /projections/{id}`.
pub async fn get_one(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< Projection >, ApiError >
{
  let repo = ProjectionRepository::new( pool );
  Ok( Json( repo.require_owned( ProjectionId::new( id ), user.id ).await? ) )
}

/// `PUT /projections/{id}`.
pub async fn update(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
  JsonBody( body ): JsonBody< ProjectionRequest >,
) -> Result< Json< Projection >, ApiError >
{
  let repo = ProjectionRepository::new( pool );
  let projection = repo.update( user.id, ProjectionId::new( id ), body.into() ).await?;
  Ok( Json( projection ) )
}

/// `DELETE /projections/{id}`.
pub async fn delete(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< StatusCode, ApiError >
{
  let repo = ProjectionRepository::new( pool );
  repo.delete( user.id, ProjectionId::new( id ) ).await?;
  Ok( StatusCode::NO_CONTENT )
}

/// `POST /projections/{id}/execute` — materialize the template into a real
/// entry dated today, inheriting the ledger's budget side effect.
pub async fn execute(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< ( StatusCode, Json< finhome_core::ledger::Entry > ), ApiError >
{
  let repo = ProjectionRepository::new( pool );
  let entry = repo.execute( user.id, ProjectionId::new( id ), finhome_core::projections::today() ).await?;
  Ok( ( StatusCode::CREATED, Json( entry ) ) )
}
