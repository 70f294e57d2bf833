//! Login-endpoint rate limiting
//!
//! The deprecated legacy login path (`SPEC_FULL.md` §6 `POST /auth/login`)
//! is the one route on this surface that accepts a secret directly from the
//! caller, so it is the one route worth throttling per-key rather than
//! relying on the reverse proxy alone. One `governor` keyed rate limiter,
//! keyed by the submitted email, bounds repeated guesses against a single
//! account without needing a shared store.

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{ Quota, RateLimiter };
use nonzero_ext::nonzero;
use std::sync::Arc;

type KeyedLimiter = RateLimiter< String, DefaultKeyedStateStore< String >, DefaultClock >;

/// Five attempts per minute per email, refilled continuously.
#[ derive( Clone ) ]
pub struct LoginRateLimiter
{
  limiter: Arc< KeyedLimiter >,
}

impl LoginRateLimiter
{
  #[ must_use ]
  pub fn new() -> Self
  {
    let quota = Quota::per_minute( nonzero!( 5u32 ) );
    Self { limiter: Arc::new( RateLimiter::keyed( quota ) ) }
  }

  /// `true` if this key is still within quota (and the attempt is counted
  /// against it); `false` once the key has exhausted its budget for the
  /// window.
  #[ must_use ]
  pub fn check( &self, key: &str ) -> bool
  {
    self.limiter.check_key( &key.to_string() ).is_ok()
  }
}

impl Default for LoginRateLimiter
{
  fn default() -> Self
  {
    Self::new()
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn exhausts_quota_then_blocks()
  {
    let limiter = LoginRateLimiter::new();
    for _ in 0..5
    {
      assert!( limiter.check( "a@example.com" ) );
    }
    assert!( !limiter.check( "a@example.com" ) );
  }

  #[ test ]
  fn distinct_keys_have_independent_quotas()
  {
    let limiter = LoginRateLimiter::new();
    for _ in 0..5
    {
      assert!( limiter.check( "a@example.com" ) );
    }
    assert!( limiter.check( "b@example.com" ) );
  }
}
