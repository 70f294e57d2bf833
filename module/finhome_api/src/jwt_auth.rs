//! Token Verifier (C1) and Identity Resolver (C2) at the HTTP boundary
//!
//! [`AuthenticatedUser`] is the one Axum extractor every protected handler
//! takes. It tries the ES256/JWKS path first; only if that fails, and only
//! if the deployment still has the legacy path enabled, does it fall back
//! to HS256 verification keyed by an internal numeric user id — the
//! verification scheme this API used before the ES256 rework
//! (`SPEC_FULL.md` §4.1). Either way the extractor resolves through
//! [`finhome_core::users::UserRepository`] and hands the handler a fully
//! resolved [`finhome_core::users::User`]; nothing downstream ever sees the
//! raw token or the external subject uuid (`SPEC_FULL.md` §4.2).

use axum::extract::FromRef;
use finhome_core::config::JwtSettings;
use finhome_core::error::AppError;
use finhome_core::users::{ User, UserRepository };
use jsonwebtoken::{ decode, decode_header, Algorithm, DecodingKey, Validation };
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::jwks_cache::JwksCache;

/// State the [`AuthenticatedUser`] extractor needs, reachable from any
/// combined application state via [`FromRef`].
#[ derive( Clone ) ]
pub struct AuthState
{
  pub pool: SqlitePool,
  pub jwks: Arc< JwksCache >,
  pub settings: JwtSettings,
}

impl AuthState
{
  #[ must_use ]
  pub fn new( pool: SqlitePool, settings: JwtSettings ) -> Self
  {
    let jwks = Arc::new( JwksCache::new( settings.jwks_url.clone() ) );
    Self { pool, jwks, settings }
  }
}

/// Claims on an ES256 access token minted by the identity provider.
#[ derive( Debug, Deserialize ) ]
struct EsClaims
{
  /// External identity-provider subject uuid.
  sub: String,
  #[ allow( dead_code ) ]
  email: String,
  #[ allow( dead_code ) ]
  role: String,
}

/// Claims on a legacy HS256 access token: just the internal numeric user id.
#[ derive( Debug, Deserialize ) ]
struct LegacyClaims
{
  sub: String,
}

/// The resolved principal, threaded explicitly into every handler argument
/// rather than through any ambient task-local state (`SPEC_FULL.md` §4.2).
pub struct AuthenticatedUser( pub User );

#[ async_trait::async_trait ]
impl< S > axum::extract::FromRequestParts< S > for AuthenticatedUser
where
  S: Send + Sync,
  AuthState: FromRef< S >,
{
  type Rejection = ApiError;

  async fn from_request_parts( parts: &mut axum::http::request::Parts, state: &S ) -> Result< Self, Self::Rejection >
  {
    let auth_state = AuthState::from_ref( state );

    let token = parts
      .headers
      .get( axum::http::header::AUTHORIZATION )
      .and_then( |h| h.to_str().ok() )
      .and_then( |h| h.strip_prefix( "Bearer " ) )
      .ok_or( AppError::AuthInvalid )?;

    let user = resolve_es256( &auth_state, token ).await;
    let user = match user
    {
      Ok( user ) => user,
      Err( _ ) if auth_state.settings.legacy_hs256_enabled => resolve_legacy( &auth_state, token ).await?,
      Err( error ) => return Err( error.into() ),
    };

    Ok( AuthenticatedUser( user ) )
  }
}

/// ES256 path: resolve `kid` against the JWKS cache, verify signature and
/// expiry, then map the subject uuid to an internal user.
async fn resolve_es256( state: &AuthState, token: &str ) -> Result< User, AppError >
{
  let header = decode_header( token ).map_err( | _ | AppError::AuthInvalid )?;
  let kid = header.kid.ok_or( AppError::AuthInvalid )?;
  if header.alg != Algorithm::ES256
  {
    return Err( AppError::AuthInvalid );
  }

  let key: Arc< DecodingKey > = state.jwks.resolve( &kid ).await?;

  let mut validation = Validation::new( Algorithm::ES256 );
  validation.set_issuer( &[ &state.settings.issuer ] );

  let data = decode::< EsClaims >( token, &key, &validation ).map_err( | _ | AppError::AuthInvalid )?;
  let subject = Uuid::parse_str( &data.claims.sub ).map_err( | _ | AppError::AuthInvalid )?;

  let users = UserRepository::new( state.pool.clone() );
  users.resolve_by_external_subject( subject ).await
}

/// Legacy HS256 path, tried only after the ES256 path fails and only when
/// `legacy_hs256_enabled` is set (`SPEC_FULL.md` §4.1).
async fn resolve_legacy( state: &AuthState, token: &str ) -> Result< User, ApiError >
{
  let secret = state.settings.legacy_hs256_secret.as_deref().ok_or( AppError::AuthInvalid )?;

  let mut validation = Validation::new( Algorithm::HS256 );
  validation.set_required_spec_claims( &[ "exp", "sub" ] );

  let data = decode::< LegacyClaims >( token, &DecodingKey::from_secret( secret.as_bytes() ), &validation )
    .map_err( | _ | AppError::AuthInvalid )?;
  let user_id: i64 = data.claims.sub.parse().map_err( | _ | AppError::AuthInvalid )?;

  let users = UserRepository::new( state.pool.clone() );
  let user = users.resolve_by_legacy_id( finhome_types::UserId::new( user_id ) ).await?;
  Ok( user )
}
