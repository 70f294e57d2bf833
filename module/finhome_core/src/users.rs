//! Identity Resolver (C2) and the `User` repository
//!
//! Maps the principal produced by token verification — an external
//! identity-provider subject uuid on the ES256 path, or a bare internal id
//! on the legacy HS256 path — to the one authoritative `User` model
//! (`SPEC_FULL.md` §9.5: a single definition, not two). Everything
//! downstream of [`UserRepository::resolve_by_external_subject`] and
//! [`UserRepository::resolve_by_legacy_id`] only ever sees the internal
//! [`finhome_types::UserId`]; the external subject uuid never crosses this
//! boundary (`SPEC_FULL.md` §4.2, load-bearing for every ownership check).

use crate::error::{ AppError, Result };
use chrono::Utc;
use finhome_types::{ Role, UserId, UserPublicId };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use serde::Serialize;
use uuid::Uuid;

/// The authenticated principal and the account data every use-case needs to
/// render responses (email, role) without a second lookup.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct User
{
  /// Internal numeric id; the only id ownership checks ever compare.
  pub id: UserId,
  /// Client-facing identifier, distinct from both `id` and
  /// `external_subject_uuid`.
  pub public_uuid: UserPublicId,
  /// The external identity provider's subject uuid, if this account was
  /// provisioned through it. `None` for legacy-only accounts.
  pub external_subject_uuid: Option< Uuid >,
  pub email: String,
  pub active: bool,
  pub role: Role,
  /// Non-null iff `role == Role::UserChild`; that guardian must itself be a
  /// `Role::User`.
  pub guardian_id: Option< UserId >,
}

/// Repository for `User` rows, and the Identity Resolver's lookup paths.
#[ derive( Debug, Clone ) ]
pub struct UserRepository
{
  pool: SqlitePool,
}

impl UserRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  fn row_to_user( row: &sqlx::sqlite::SqliteRow ) -> Result< User >
  {
    let role_str: String = row.get( "role" );
    let role = Role::from_str( &role_str )
      .map_err( |_| AppError::Internal( sqlx::Error::Decode( "unrecognized role".into() ) ) )?;
    let public_uuid: String = row.get( "public_uuid" );
    let external: Option< String > = row.get( "external_subject_uuid" );

    Ok( User
    {
      id: UserId::new( row.get( "id" ) ),
      public_uuid: UserPublicId::new(
        Uuid::parse_str( &public_uuid )
          .map_err( |_| AppError::Internal( sqlx::Error::Decode( "malformed public_uuid".into() ) ) )?,
      ),
      external_subject_uuid: external
        .map( |s| Uuid::parse_str( &s ) )
        .transpose()
        .map_err( |_| AppError::Internal( sqlx::Error::Decode( "malformed external_subject_uuid".into() ) ) )?,
      email: row.get( "email" ),
      active: row.get::< i64, _ >( "active" ) != 0,
      role,
      guardian_id: row.get::< Option< i64 >, _ >( "guardian_id" ).map( UserId::new ),
    } )
  }

  /// Look up by internal id, the only lookup handlers ever need once a
  /// principal has been resolved.
  pub async fn find_by_id( &self, id: UserId ) -> Result< Option< User > >
  {
    let row = sqlx::query(
      "SELECT id, public_uuid, external_subject_uuid, email, active, role, guardian_id \
       FROM users WHERE id = ?"
    )
    .bind( id.get() )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    row.as_ref().map( Self::row_to_user ).transpose()
  }

  async fn find_by_external_subject( &self, subject: Uuid ) -> Result< Option< User > >
  {
    let row = sqlx::query(
      "SELECT id, public_uuid, external_subject_uuid, email, active, role, guardian_id \
       FROM users WHERE external_subject_uuid = ?"
    )
    .bind( subject.to_string() )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    row.as_ref().map( Self::row_to_user ).transpose()
  }

  /// C2's ES256 resolution path: external subject uuid → internal `User`.
  /// Unknown subject or inactive user both fail the request.
  pub async fn resolve_by_external_subject( &self, subject: Uuid ) -> Result< User >
  {
    let user = self
      .find_by_external_subject( subject )
      .await?
      .ok_or( AppError::AuthInvalid )?;

    if !user.active
    {
      return Err( AppError::AuthUserInactive );
    }

    Ok( user )
  }

  /// C2's legacy HS256 resolution path: bare internal id → internal `User`.
  pub async fn resolve_by_legacy_id( &self, id: UserId ) -> Result< User >
  {
    let user = self.find_by_id( id ).await?.ok_or( AppError::AuthInvalid )?;

    if !user.active
    {
      return Err( AppError::AuthUserInactive );
    }

    Ok( user )
  }

  /// Create a user row (identity-provider signup trigger or admin action).
  /// Not reachable from any public route in the core (`SPEC_FULL.md` §1:
  /// self-registration is a deprecated external collaborator), but needed
  /// by admin provisioning and by test fixtures.
  pub async fn create(
    &self,
    email: &str,
    role: Role,
    external_subject_uuid: Option< Uuid >,
    guardian_id: Option< UserId >,
  ) -> Result< User >
  {
    if role == Role::UserChild && guardian_id.is_none()
    {
      return Err( AppError::validation( "user_child accounts require a guardian_id" ) );
    }
    if role != Role::UserChild && guardian_id.is_some()
    {
      return Err( AppError::validation( "guardian_id is only valid for user_child accounts" ) );
    }
    if let Some( guardian_id ) = guardian_id
    {
      let guardian = self.find_by_id( guardian_id ).await?;
      match guardian
      {
        Some( g ) if g.role == Role::User => {}
        _ => return Err( AppError::validation( "guardian must be an existing user with role USER" ) ),
      }
    }

    let public_uuid = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
      "INSERT INTO users (public_uuid, external_subject_uuid, email, active, role, guardian_id, created_at) \
       VALUES (?, ?, ?, 1, ?, ?, ?)"
    )
    .bind( public_uuid.to_string() )
    .bind( external_subject_uuid.map( |u| u.to_string() ) )
    .bind( email )
    .bind( role.as_db_str() )
    .bind( guardian_id.map( UserId::get ) )
    .bind( now )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    let id = UserId::new( result.last_insert_rowid() );
    self.find_by_id( id ).await?.ok_or( AppError::Internal( sqlx::Error::RowNotFound ) )
  }

  /// Deactivate a user. Never hard-deletes (`SPEC_FULL.md` §3): financial
  /// history survives.
  pub async fn deactivate( &self, id: UserId ) -> Result< () >
  {
    sqlx::query( "UPDATE users SET active = 0 WHERE id = ?" )
      .bind( id.get() )
      .execute( &self.pool )
      .await
      .map_err( AppError::Internal )?;
    Ok( () )
  }

  /// Self-registration for the deprecated legacy-only path (`SPEC_FULL.md`
  /// §6 `POST /auth/register`). Stores a bcrypt hash rather than the
  /// identity-provider subject; rejects a duplicate email as `Validation`
  /// rather than surfacing the store's unique-constraint error directly.
  pub async fn create_with_password( &self, email: &str, password_hash: &str ) -> Result< User >
  {
    if self.find_by_email( email ).await?.is_some()
    {
      return Err( AppError::validation( "email already registered" ) );
    }

    let public_uuid = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
      "INSERT INTO users (public_uuid, external_subject_uuid, email, active, role, guardian_id, created_at, password_hash) \
       VALUES (?, NULL, ?, 1, ?, NULL, ?, ?)"
    )
    .bind( public_uuid.to_string() )
    .bind( email )
    .bind( Role::User.as_db_str() )
    .bind( now )
    .bind( password_hash )
    .execute( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    let id = UserId::new( result.last_insert_rowid() );
    self.find_by_id( id ).await?.ok_or( AppError::Internal( sqlx::Error::RowNotFound ) )
  }

  async fn find_by_email( &self, email: &str ) -> Result< Option< User > >
  {
    let row = sqlx::query(
      "SELECT id, public_uuid, external_subject_uuid, email, active, role, guardian_id \
       FROM users WHERE email = ?"
    )
    .bind( email )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    row.as_ref().map( Self::row_to_user ).transpose()
  }

  /// Looks up the stored bcrypt hash for the legacy login path
  /// (`SPEC_FULL.md` §6 `POST /auth/login`). Returns `None` for accounts
  /// provisioned through the identity provider (no password set) as well as
  /// for an unknown email, so the caller can return one generic "invalid
  /// credentials" response either way.
  pub async fn find_password_hash_by_email( &self, email: &str ) -> Result< Option< ( User, String ) > >
  {
    let row = sqlx::query(
      "SELECT id, public_uuid, external_subject_uuid, email, active, role, guardian_id, password_hash \
       FROM users WHERE email = ?"
    )
    .bind( email )
    .fetch_optional( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    let Some( row ) = row else { return Ok( None ) };
    let password_hash: Option< String > = row.get( "password_hash" );
    let Some( password_hash ) = password_hash else { return Ok( None ) };
    let user = Self::row_to_user( &row )?;
    Ok( Some( ( user, password_hash ) ) )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use finhome_test_support::TestDatabaseBuilder;

  async fn setup() -> ( sqlx::SqlitePool, UserRepository )
  {
    let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
    crate::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
    let pool = db.pool().clone();
    ( pool.clone(), UserRepository::new( pool ) )
  }

  #[ tokio::test ]
  async fn resolve_by_external_subject_rejects_unknown_subject()
  {
    let ( _pool, repo ) = setup().await;
    let result = repo.resolve_by_external_subject( Uuid::new_v4() ).await;
    assert!( matches!( result, Err( AppError::AuthInvalid ) ) );
  }

  #[ tokio::test ]
  async fn resolve_rejects_inactive_user()
  {
    let ( _pool, repo ) = setup().await;
    let subject = Uuid::new_v4();
    let user = repo.create( "a@example.com", Role::User, Some( subject ), None ).await.expect( "create" );
    repo.deactivate( user.id ).await.expect( "deactivate" );

    let result = repo.resolve_by_external_subject( subject ).await;
    assert!( matches!( result, Err( AppError::AuthUserInactive ) ) );
  }

  #[ tokio::test ]
  async fn child_account_requires_existing_guardian_with_user_role()
  {
    let ( _pool, repo ) = setup().await;
    let guardian = repo.create( "parent@example.com", Role::User, Some( Uuid::new_v4() ), None )
      .await
      .expect( "create guardian" );

    let child = repo
      .create( "child@example.com", Role::UserChild, Some( Uuid::new_v4() ), Some( guardian.id ) )
      .await
      .expect( "create child" );
    assert_eq!( child.guardian_id, Some( guardian.id ) );

    let rejected = repo.create( "orphan@example.com", Role::UserChild, Some( Uuid::new_v4() ), None ).await;
    assert!( rejected.is_err() );
  }
}
