//! Runtime configuration for the finhome backend
//!
//! Resolves settings through [`finhome_config`]'s layered precedence —
//! environment variables, then an explicit `./config/finhome.toml`, then the
//! defaults below — for the database connection, the HTTP bind address, the
//! Token Verifier's JWKS/legacy-HS256 settings, and the Renewal Scheduler's
//! tick interval.

use finhome_config::{ ConfigLayer, LayersBuilder };
use std::path::PathBuf;
use std::time::Duration;

/// Token Verifier settings (C1, `SPEC_FULL.md` §4.1).
#[ derive( Debug, Clone ) ]
pub struct JwtSettings
{
  /// Expected `iss` claim on ES256 tokens.
  pub issuer: String,
  /// JWKS endpoint polled to validate ES256 signatures.
  pub jwks_url: String,
  /// Whether the deprecated HS256 verify-only path is accepted at all.
  pub legacy_hs256_enabled: bool,
  /// Shared secret for the legacy HS256 path. Required when
  /// `legacy_hs256_enabled` is true.
  pub legacy_hs256_secret: Option< String >,
}

/// All runtime settings for the finhome backend.
#[ derive( Debug, Clone ) ]
pub struct Settings
{
  pub database_url: String,
  pub bind_address: String,
  pub jwt: JwtSettings,
  /// How often the Renewal Scheduler (C8) sweeps for expired budgets.
  pub scheduler_tick: Duration,
}

fn get_string( layers: &[ Box< dyn ConfigLayer > ], key: &str, default: &str ) -> String
{
  for layer in layers
  {
    if let Ok( Some( value ) ) = layer.get( key )
    {
      if let Some( s ) = value.value.as_str()
      {
        return s.to_string();
      }
    }
  }
  default.to_string()
}

fn get_bool( layers: &[ Box< dyn ConfigLayer > ], key: &str, default: bool ) -> bool
{
  for layer in layers
  {
    if let Ok( Some( value ) ) = layer.get( key )
    {
      if let Some( b ) = value.value.as_bool()
      {
        return b;
      }
    }
  }
  default
}

fn get_u64( layers: &[ Box< dyn ConfigLayer > ], key: &str, default: u64 ) -> u64
{
  for layer in layers
  {
    if let Ok( Some( value ) ) = layer.get( key )
    {
      if let Some( i ) = value.value.as_integer()
      {
        return u64::try_from( i ).unwrap_or( default );
      }
    }
  }
  default
}

fn get_optional_string( layers: &[ Box< dyn ConfigLayer > ], key: &str ) -> Option< String >
{
  for layer in layers
  {
    if let Ok( Some( value ) ) = layer.get( key )
    {
      if let Some( s ) = value.value.as_str()
      {
        return Some( s.to_string() );
      }
    }
  }
  None
}

impl Settings
{
  /// Load settings through the standard layer precedence. `config_path`
  /// overrides the default `./config/finhome.toml` location; a missing file
  /// is not an error, the layer below it (or the hardcoded default) applies.
  ///
  /// # Errors
  ///
  /// Returns an error only if a config file exists but is not valid TOML.
  pub fn load( config_path: Option< PathBuf > ) -> finhome_config::Result< Self >
  {
    let mut builder = LayersBuilder::new( "finhome" );
    if let Some( path ) = config_path
    {
      builder = builder.config_path( path );
    }
    let layers = builder.build()?;

    Ok( Self
    {
      database_url: get_string( &layers, "database.url", "sqlite://./finhome.db?mode=rwc" ),
      bind_address: get_string( &layers, "server.bind_address", "0.0.0.0:8080" ),
      jwt: JwtSettings
      {
        issuer: get_string( &layers, "jwt.issuer", "https://auth.example.com/" ),
        jwks_url: get_string( &layers, "jwt.jwks_url", "https://auth.example.com/.well-known/jwks.json" ),
        legacy_hs256_enabled: get_bool( &layers, "jwt.legacy_hs256_enabled", false ),
        legacy_hs256_secret: get_optional_string( &layers, "jwt.legacy_hs256_secret" ),
      },
      scheduler_tick: Duration::from_secs( get_u64( &layers, "scheduler.tick_seconds", 3600 ) ),
    } )
  }

  /// Settings suitable for tests: in-memory database, scheduler disabled by
  /// way of an hour-long tick, legacy HS256 enabled with a fixed secret so
  /// fixtures can mint tokens without a JWKS server.
  #[ must_use ]
  pub fn for_tests() -> Self
  {
    Self
    {
      database_url: "sqlite::memory:".to_string(),
      bind_address: "127.0.0.1:0".to_string(),
      jwt: JwtSettings
      {
        issuer: "https://test.example.com/".to_string(),
        jwks_url: "https://test.example.com/.well-known/jwks.json".to_string(),
        legacy_hs256_enabled: true,
        legacy_hs256_secret: Some( "test-secret".to_string() ),
      },
      scheduler_tick: Duration::from_secs( 3600 ),
    }
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn load_falls_back_to_defaults_when_file_absent()
  {
    let settings = Settings::load( Some( PathBuf::from( "/nonexistent/finhome.toml" ) ) )
      .expect( "load with defaults" );
    assert_eq!( settings.bind_address, "0.0.0.0:8080" );
    assert!( !settings.jwt.legacy_hs256_enabled );
  }

  #[ test ]
  fn for_tests_enables_legacy_hs256_with_a_fixed_secret()
  {
    let settings = Settings::for_tests();
    assert!( settings.jwt.legacy_hs256_enabled );
    assert_eq!( settings.jwt.legacy_hs256_secret.as_deref(), Some( "test-secret" ) );
  }
}
