//! The seven-variant error taxonomy shared by every use-case
//!
//! `finhome_api` maps each variant to the status code named in
//! `SPEC_FULL.md` §7; nothing downstream of a use-case ever has to
//! string-match a message to decide how to respond. Ownership mismatches use
//! `Forbidden`, never `NotFound` — the rewrite's fix for the source's
//! occasional conflation of the two (`SPEC_FULL.md` §9.3).

/// The single error type returned by every `finhome_core` operation.
#[ derive( Debug, thiserror::Error ) ]
pub enum AppError
{
  /// Token absent/malformed/bad signature/expired/unknown-kid-after-refresh.
  #[ error( "invalid or missing authentication token" ) ]
  AuthInvalid,

  /// Token valid, but the resolved user row is deactivated.
  #[ error( "user account is inactive" ) ]
  AuthUserInactive,

  /// Authenticated, but the target row's owner does not match the
  /// principal. Never used to reveal that a row simply doesn't exist.
  #[ error( "not permitted to access this resource" ) ]
  Forbidden,

  /// No row with this id exists under any owner.
  #[ error( "resource not found" ) ]
  NotFound,

  /// Schema violation, out-of-range amount, date inversion, category/type
  /// mismatch, or a duplicate name where uniqueness is required.
  #[ error( "validation error: {0}" ) ]
  Validation( String ),

  /// The operation is forbidden in the resource's current state (e.g.
  /// contributing to a completed goal, a second active budget for a
  /// category).
  #[ error( "state conflict: {0}" ) ]
  StateConflict( String ),

  /// Anything unexpected: surfaced generically, logged with detail.
  #[ error( "internal error" ) ]
  Internal( #[ from ] sqlx::Error ),
}

impl AppError
{
  /// Build a `Validation` error from any displayable message.
  pub fn validation( message: impl Into< String > ) -> Self
  {
    Self::Validation( message.into() )
  }

  /// Build a `StateConflict` error from any displayable message.
  pub fn state_conflict( message: impl Into< String > ) -> Self
  {
    Self::StateConflict( message.into() )
  }
}

/// Result type used throughout `finhome_core`.
pub type Result< T > = core::result::Result< T, AppError >;
