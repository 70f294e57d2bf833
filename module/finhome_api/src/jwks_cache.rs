//! JWKS cache for the Token Verifier's ES256 path (C1, `SPEC_FULL.md` §4.1)
//!
//! Keys are cached by `kid` in a [`dashmap::DashMap`] so concurrent request
//! handlers never block each other on a cache hit. A cache miss triggers a
//! refresh of the whole set from the configured JWKS endpoint; the refresh
//! itself is single-flighted behind a `tokio::sync::Mutex` held only across
//! the outbound HTTP call, so a thundering herd of misses collapses into one
//! fetch instead of one per request.

use finhome_core::error::{ AppError, Result };
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// One entry of a JSON Web Key Set, restricted to the EC (P-256) shape
/// ES256 tokens use.
#[ derive( Debug, Deserialize ) ]
struct Jwk
{
  kid: String,
  kty: String,
  crv: Option< String >,
  x: Option< String >,
  y: Option< String >,
}

#[ derive( Debug, Deserialize ) ]
struct JwkSet
{
  keys: Vec< Jwk >,
}

/// Concurrency-safe cache of ES256 verification keys, keyed by `kid`.
pub struct JwksCache
{
  jwks_url: String,
  client: reqwest::Client,
  keys: dashmap::DashMap< String, Arc< DecodingKey > >,
  refresh_lock: tokio::sync::Mutex< () >,
}

impl JwksCache
{
  /// Build a cache pointed at `jwks_url`. The HTTP client carries a bounded
  /// timeout so a slow or wedged identity provider never hangs a request
  /// handler (`SPEC_FULL.md` §5).
  #[ must_use ]
  pub fn new( jwks_url: impl Into< String > ) -> Self
  {
    let client = reqwest::Client::builder()
      .timeout( Duration::from_secs( 5 ) )
      .build()
      .unwrap_or_default();

    Self
    {
      jwks_url: jwks_url.into(),
      client,
      keys: dashmap::DashMap::new(),
      refresh_lock: tokio::sync::Mutex::new( () ),
    }
  }

  /// Resolve a `kid` to a verification key, refreshing the set from the
  /// JWKS endpoint on a cache miss. A refresh that fails to produce the
  /// requested `kid` is treated as `AUTH_INVALID`, never a 5xx — per
  /// `SPEC_FULL.md` §4.1, a flaky identity-provider endpoint must not turn
  /// into an outage for every other caller.
  pub async fn resolve( &self, kid: &str ) -> Result< Arc< DecodingKey > >
  {
    if let Some( key ) = self.keys.get( kid )
    {
      return Ok( Arc::clone( &key ) );
    }

    self.refresh( kid ).await?;

    self.keys
      .get( kid )
      .map( |entry| Arc::clone( &entry ) )
      .ok_or( AppError::AuthInvalid )
  }

  /// Single-flighted refresh of the whole key set. `kid` is the key a
  /// waiter is blocked on; after acquiring `refresh_lock`, re-check the
  /// cache before fetching — a waiter that lost the race to an earlier
  /// caller's refresh finds `kid` already populated and returns without
  /// hitting the network itself (`SPEC_FULL.md` §5: "refill is guarded so
  /// concurrent misses do not all fetch").
  async fn refresh( &self, kid: &str ) -> Result< () >
  {
    let _guard = self.refresh_lock.lock().await;

    if self.keys.contains_key( kid )
    {
      return Ok( () );
    }

    let response = self.client
      .get( &self.jwks_url )
      .send()
      .await
      .map_err( | _ | AppError::AuthInvalid )?;

    let jwks: JwkSet = response
      .json()
      .await
      .map_err( | _ | AppError::AuthInvalid )?;

    for jwk in jwks.keys
    {
      if jwk.kty != "EC" || jwk.crv.as_deref() != Some( "P-256" )
      {
        continue;
      }
      let ( Some( x ), Some( y ) ) = ( jwk.x.as_deref(), jwk.y.as_deref() ) else { continue };
      let Ok( key ) = DecodingKey::from_ec_components( x, y ) else { continue };
      self.keys.insert( jwk.kid, Arc::new( key ) );
    }

    Ok( () )
  }
}
