//! Ledger (C3, `SPEC_FULL.md` §6 `/transactions*`)

use axum::extract::{ Query, State };
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use finhome_core::error::AppError;
use finhome_core::ledger::{ Entry, EntryFilter, EntryInput, LedgerRepository, Summary };
use finhome_types::{ CategoryId, EntryId, EntryType, Money };
use serde::Deserialize;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::{ ApiError, JsonBody, JsonPath };
use crate::jwt_auth::AuthenticatedUser;

/// Body accepted by `POST`/`PUT /transactions[/{id}]`.
#[ derive( Debug, Deserialize ) ]
pub struct EntryRequest
{
  pub category_id: i64,
  pub amount: Money,
  pub entry_type: EntryType,
  pub description: Option< String >,
  pub date: NaiveDate,
}

impl From< EntryRequest > for EntryInput
{
  fn from( value: EntryRequest ) -> Self
  {
    Self
    {
      category_id: CategoryId::new( value.category_id ),
      amount: value.amount,
      entry_type: value.entry_type,
      description: value.description,
      date: value.date,
    }
  }
}

/// Query parameters accepted by `GET /transactions/range`.
#[ derive( Debug, Deserialize ) ]
pub struct RangeQuery
{
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// `POST /transactions` — create an entry; on `EXPENSE`, adjusts the
/// matching active budget inside the same transaction (C5 integration).
pub async fn create(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonBody( body ): JsonBody< EntryRequest >,
) -> Result< ( StatusCode, Json< Entry > ), ApiError >
{
  let repo = LedgerRepository::new( pool );
  let entry = repo.create_entry( user.id, body.into(), None ).await?;
  Ok( ( StatusCode::CREATED, Json( entry ) ) )
}

/// `GET /transactions` — list the caller's entries, unfiltered.
pub async fn list(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< Entry > >, ApiError >
{
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.list_entries( user.id, &EntryFilter::default() ).await? ) )
}

/// `GET /transactions/{id}` — a single owned entry.
pub async fn get_one(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< Entry >, ApiError >
{
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.require_owned( EntryId::new( id ), user.id ).await? ) )
}

/// `PUT /transactions/{id}` — update, recomputing the budget delta against
/// the row's pre-update state (§9.1, fixed).
pub async fn update(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
  JsonBody( body ): JsonBody< EntryRequest >,
) -> Result< Json< Entry >, ApiError >
{
  let repo = LedgerRepository::new( pool );
  let entry = repo.update_entry( user.id, EntryId::new( id ), body.into() ).await?;
  Ok( Json( entry ) )
}

/// `DELETE /transactions/{id}` — apply the budget delta, then delete
/// (§9.2, fixed ordering).
pub async fn delete(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< StatusCode, ApiError >
{
  let repo = LedgerRepository::new( pool );
  repo.delete_entry( user.id, EntryId::new( id ) ).await?;
  Ok( StatusCode::NO_CONTENT )
}

/// `GET /transactions/type/{t}`.
pub async fn list_by_type(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( entry_type ): JsonPath< String >,
) -> Result< Json< Vec< Entry > >, ApiError >
{
  let entry_type = EntryType::from_str( &entry_type ).map_err( AppError::validation )?;
  let filter = EntryFilter { entry_type: Some( entry_type ), ..EntryFilter::default() };
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.list_entries( user.id, &filter ).await? ) )
}

/// `GET /transactions/category/{id}`.
pub async fn list_by_category(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( category_id ): JsonPath< i64 >,
) -> Result< Json< Vec< Entry > >, ApiError >
{
  let filter = EntryFilter { category_id: Some( CategoryId::new( category_id ) ), ..EntryFilter::default() };
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.list_entries( user.id, &filter ).await? ) )
}

/// `GET /transactions/range?start&end`.
pub async fn list_by_range(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  Query( range ): Query< RangeQuery >,
) -> Result< Json< Vec< Entry > >, ApiError >
{
  let filter = EntryFilter
  {
    start_date: Some( range.start ),
    end_date: Some( range.end ),
    ..EntryFilter::default()
  };
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.list_entries( user.id, &filter ).await? ) )
}

/// `GET /transactions/balance`.
pub async fn balance(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Money >, ApiError >
{
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.balance( user.id ).await? ) )
}

/// `GET /transactions/summary`.
pub async fn summary(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Summary >, ApiError >
{
  let repo = LedgerRepository::new( pool );
  Ok( Json( repo.summary( user.id ).await? ) )
}
