//! Fixed-decimal currency amount
//!
//! The system has no currency conversion (`SPEC_FULL.md` §1 Non-goals): every
//! amount is the same currency, represented as a [`rust_decimal::Decimal`]
//! rounded to two fractional digits rather than a float, so repeated
//! addition/subtraction across budgets and goals never accumulates binary
//! rounding error.

use rust_decimal::{ Decimal, RoundingStrategy };
use serde::{ Deserialize, Deserializer, Serialize, Serializer };
use std::cmp::Ordering;
use std::fmt;
use std::ops::{ Add, Sub };
use std::str::FromStr;

const SCALE: u32 = 2;

/// A non-negative-by-convention monetary amount in the system's single
/// currency. Nothing in this type forbids negative values directly (deltas
/// computed in `finhome_core` are signed), but every persisted balance is
/// clamped to zero at the call site that would otherwise let it go negative.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord ) ]
pub struct Money( Decimal );

impl Money
{
  /// The additive identity.
  #[ must_use ]
  pub fn zero() -> Self
  {
    Self( Decimal::ZERO )
  }

  /// Build a `Money` from a `Decimal`, normalized to two fractional digits.
  #[ must_use ]
  pub fn from_decimal( value: Decimal ) -> Self
  {
    Self( value.round_dp( SCALE ) )
  }

  /// The underlying decimal value.
  #[ must_use ]
  pub const fn as_decimal( self ) -> Decimal
  {
    self.0
  }

  /// True if this amount is strictly greater than zero.
  #[ must_use ]
  pub fn is_positive( self ) -> bool
  {
    self.0 > Decimal::ZERO
  }

  /// True if this amount is zero or negative.
  #[ must_use ]
  pub fn is_non_positive( self ) -> bool
  {
    self.0 <= Decimal::ZERO
  }

  /// `self - other`, clamped at zero (consumed/accrued amounts never go
  /// negative per `SPEC_FULL.md` §4.5's `adjust` clamp).
  #[ must_use ]
  pub fn saturating_sub( self, other: Self ) -> Self
  {
    let result = self.0 - other.0;
    Self( result.max( Decimal::ZERO ) )
  }

  /// `max(0, self - other)`, used for `remaining = max(0, target - accrued)`.
  #[ must_use ]
  pub fn remaining_after( self, subtracted: Self ) -> Self
  {
    self.saturating_sub( subtracted )
  }

  /// Ceiling division by a positive integer count, used both for
  /// goal-plan generation and `rebalancePendingInstallments` so the rounding
  /// rule can never drift between the two call sites.
  ///
  /// # Panics
  ///
  /// Panics if `count` is zero; callers only invoke this with a verified
  /// positive installment count.
  #[ must_use ]
  pub fn div_ceil( self, count: u32 ) -> Self
  {
    assert!( count > 0, "div_ceil requires a positive count" );
    let divided = self.0 / Decimal::from( count );
    Self( divided.round_dp_with_strategy( SCALE, RoundingStrategy::AwayFromZero ) )
  }
}

impl Default for Money
{
  fn default() -> Self
  {
    Self::zero()
  }
}

impl Add for Money
{
  type Output = Self;

  fn add( self, rhs: Self ) -> Self
  {
    Self::from_decimal( self.0 + rhs.0 )
  }
}

impl Sub for Money
{
  type Output = Self;

  fn sub( self, rhs: Self ) -> Self
  {
    Self::from_decimal( self.0 - rhs.0 )
  }
}

impl fmt::Display for Money
{
  fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
  {
    write!( f, "{}", self.0.round_dp( SCALE ) )
  }
}

impl FromStr for Money
{
  type Err = rust_decimal::Error;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    Decimal::from_str( s ).map( Self::from_decimal )
  }
}

impl From< Decimal > for Money
{
  fn from( value: Decimal ) -> Self
  {
    Self::from_decimal( value )
  }
}

impl From< Money > for Decimal
{
  fn from( value: Money ) -> Self
  {
    value.0
  }
}

impl PartialEq< Decimal > for Money
{
  fn eq( &self, other: &Decimal ) -> bool
  {
    self.0 == *other
  }
}

impl PartialOrd< Decimal > for Money
{
  fn partial_cmp( &self, other: &Decimal ) -> Option< Ordering >
  {
    self.0.partial_cmp( other )
  }
}

impl Serialize for Money
{
  fn serialize< S >( &self, serializer: S ) -> Result< S::Ok, S::Error >
  where
    S: Serializer,
  {
    self.0.serialize( serializer )
  }
}

impl< 'de > Deserialize< 'de > for Money
{
  fn deserialize< D >( deserializer: D ) -> Result< Self, D::Error >
  where
    D: Deserializer< 'de >,
  {
    Decimal::deserialize( deserializer ).map( Self::from_decimal )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn div_ceil_matches_scenario_3_first_split()
  {
    let target = Money::from_str( "1200000" ).expect( "parse" );
    let per_installment = target.div_ceil( 6 );
    assert_eq!( per_installment.to_string(), "200000.00" );
  }

  #[ test ]
  fn div_ceil_rounds_up_on_non_exact_division()
  {
    let remaining = Money::from_str( "1050000" ).expect( "parse" );
    let per_installment = remaining.div_ceil( 5 );
    assert_eq!( per_installment.to_string(), "210000.00" );

    let odd = Money::from_str( "10" ).expect( "parse" );
    let split = odd.div_ceil( 3 );
    assert_eq!( split.to_string(), "3.34" );
  }

  #[ test ]
  fn saturating_sub_never_goes_negative()
  {
    let a = Money::from_str( "50" ).expect( "parse" );
    let b = Money::from_str( "120" ).expect( "parse" );
    assert_eq!( a.saturating_sub( b ), Money::zero() );
  }

  #[ test ]
  fn round_trips_through_json()
  {
    let m = Money::from_str( "199.90" ).expect( "parse" );
    let json = serde_json::to_string( &m ).expect( "serialize" );
    let back: Money = serde_json::from_str( &json ).expect( "deserialize" );
    assert_eq!( back, m );
  }
}
