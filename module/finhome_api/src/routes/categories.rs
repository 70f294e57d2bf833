//! Category Registry (C4, `SPEC_FULL.md` §6 `/categories*`)
//!
//! Read-only. `list_available_to` already folds predefined and owned rows
//! together, so the handlers here are direct passthroughs.

use axum::extract::State;
use axum::Json;
use finhome_core::categories::CategoryRepository;
use finhome_core::error::AppError;
use finhome_types::CategoryId;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::{ ApiError, JsonPath };
use crate::jwt_auth::AuthenticatedUser;

/// `GET /categories` — predefined categories plus any the caller owns.
pub async fn list(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
) -> Result< Json< Vec< finhome_core::categories::Category > >, ApiError >
{
  let repo = CategoryRepository::new( pool );
  Ok( Json( repo.list_available_to( user.id ).await? ) )
}

/// `GET /categories/type/{t}` — categories compatible with the given entry
/// type (`INCOME`/`EXPENSE`), predefined plus owned.
pub async fn list_by_type(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( entry_type ): JsonPath< String >,
) -> Result< Json< Vec< finhome_core::categories::Category > >, ApiError >
{
  let entry_type = finhome_types::EntryType::from_str( &entry_type ).map_err( AppError::validation )?;
  let repo = CategoryRepository::new( pool );
  Ok( Json( repo.list_available_to_by_type( user.id, entry_type ).await? ) )
}

/// `GET /categories/{id}` — a single category, if visible to the caller.
pub async fn get_one(
  State( pool ): State< SqlitePool >,
  AuthenticatedUser( user ): AuthenticatedUser,
  JsonPath( id ): JsonPath< i64 >,
) -> Result< Json< finhome_core::categories::Category >, ApiError >
{
  let repo = CategoryRepository::new( pool );
  Ok( Json( repo.require_visible( CategoryId::new( id ), user.id ).await? ) )
}
