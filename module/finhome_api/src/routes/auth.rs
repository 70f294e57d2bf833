//! Deprecated legacy register/login path (C1, `SPEC_FULL.md` §6
//! `/auth/register`, `/auth/login`, `/auth/me`)
//!
//! Kept only for collaborators not yet migrated to the identity provider's
//! ES256 flow. Mints the same HS256 token shape [`crate::jwt_auth`]'s
//! legacy path already verifies, so a token from here works anywhere an
//! ES256 token would.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use finhome_core::error::AppError;
use finhome_core::users::{ User, UserRepository };
use jsonwebtoken::{ encode, EncodingKey, Header };
use serde::{ Deserialize, Serialize };

use crate::error::{ ApiError, ErrorResponse, JsonBody };
use crate::jwt_auth::AuthenticatedUser;
use crate::rate_limiter::LoginRateLimiter;
use crate::state::AppState;

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Body accepted by `POST /auth/register`.
#[ derive( Debug, Deserialize ) ]
pub struct RegisterRequest
{
  pub email: String,
  pub password: String,
}

/// Body accepted by `POST /auth/login`.
#[ derive( Debug, Deserialize ) ]
pub struct LoginRequest
{
  pub email: String,
  pub password: String,
}

/// Response returned by both `/auth/register` and `/auth/login`.
#[ derive( Debug, Serialize ) ]
pub struct TokenResponse
{
  pub access_token: String,
  pub user: User,
}

#[ derive( Debug, Serialize ) ]
struct LegacyClaims
{
  sub: String,
  exp: i64,
}

fn mint_legacy_token( user: &User, secret: &str ) -> Result< String, AppError >
{
  let exp = chrono::Utc::now().timestamp() + 3600;
  let claims = LegacyClaims { sub: user.id.get().to_string(), exp };
  encode( &Header::new( jsonwebtoken::Algorithm::HS256 ), &claims, &EncodingKey::from_secret( secret.as_bytes() ) )
    .map_err( | _ | AppError::Internal( sqlx::Error::Decode( "failed to mint legacy token".into() ) ) )
}

/// `POST /auth/register` — deprecated. Stores a bcrypt hash; rejects a
/// duplicate email rather than silently logging the existing account in.
pub async fn register(
  State( state ): State< AppState >,
  JsonBody( body ): JsonBody< RegisterRequest >,
) -> Result< ( StatusCode, Json< TokenResponse > ), ApiError >
{
  if body.password.len() < 8
  {
    return Err( AppError::validation( "password must be at least 8 characters" ).into() );
  }

  let hash = bcrypt::hash( &body.password, BCRYPT_COST )
    .map_err( | _ | AppError::Internal( sqlx::Error::Decode( "failed to hash password".into() ) ) )?;

  let users = UserRepository::new( state.pool.clone() );
  let user = users.create_with_password( &body.email, &hash ).await?;

  let secret = state.settings.jwt.legacy_hs256_secret.as_deref().ok_or( AppError::AuthInvalid )?;
  let access_token = mint_legacy_token( &user, secret )?;

  Ok( ( StatusCode::CREATED, Json( TokenResponse { access_token, user } ) ) )
}

/// `POST /auth/login` — deprecated, rate-limited by submitted email (5 per
/// minute) to slow down credential stuffing against the legacy path. Not
/// part of the shared seven-variant taxonomy, so the 429 is built directly
/// rather than routed through [`ApiError`].
pub async fn login(
  State( state ): State< AppState >,
  State( limiter ): State< LoginRateLimiter >,
  JsonBody( body ): JsonBody< LoginRequest >,
) -> Result< Json< TokenResponse >, Response >
{
  if !limiter.check( &body.email )
  {
    return Err(
      ( StatusCode::TOO_MANY_REQUESTS, Json( ErrorResponse::with_code( "too many login attempts", "RATE_LIMITED" ) ) )
        .into_response(),
    );
  }

  let login_inner = async
  {
    let users = UserRepository::new( state.pool.clone() );
    let found = users.find_password_hash_by_email( &body.email ).await?;
    let ( user, hash ) = found.ok_or( AppError::AuthInvalid )?;

    let verified = bcrypt::verify( &body.password, &hash )
      .map_err( | _ | AppError::Internal( sqlx::Error::Decode( "failed to verify password".into() ) ) )?;
    if !verified
    {
      return Err( AppError::AuthInvalid );
    }
    if !user.active
    {
      return Err( AppError::AuthUserInactive );
    }

    let secret = state.settings.jwt.legacy_hs256_secret.as_deref().ok_or( AppError::AuthInvalid )?;
    let access_token = mint_legacy_token( &user, secret )?;

    Ok( TokenResponse { access_token, user } )
  };

  login_inner.await.map( Json ).map_err( | e | ApiError::from( e ).into_response() )
}

/// `GET /auth/me` — echoes the resolved principal, on either auth path.
pub async fn me( AuthenticatedUser( user ): AuthenticatedUser ) -> Json< User >
{
  Json( user )
}
