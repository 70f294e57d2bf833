//! Typed entity identifiers
//!
//! Every row in the store has an internal `i64` primary key. Per the
//! identifier-exposure rule, most entities hand that number straight to
//! clients; `Budget` and `User` additionally carry a public `Uuid` so the
//! sequential internal id never has to leave the process. Wrapping each kind
//! of id in its own type keeps a `CategoryId` from being passed where a
//! `BudgetId` was expected at a call site.

use serde::{ Deserialize, Serialize };
use std::fmt;

macro_rules! numeric_id
{
  ( $( #[ $meta:meta ] )* $name:ident ) =>
  {
    $( #[ $meta ] )*
    #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize ) ]
    #[ serde( transparent ) ]
    pub struct $name( pub i64 );

    impl $name
    {
      /// Wrap a raw database id.
      #[ must_use ]
      pub const fn new( id: i64 ) -> Self
      {
        Self( id )
      }

      /// Unwrap back to the raw database id.
      #[ must_use ]
      pub const fn get( self ) -> i64
      {
        self.0
      }
    }

    impl fmt::Display for $name
    {
      fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
      {
        write!( f, "{}", self.0 )
      }
    }

    impl From< i64 > for $name
    {
      fn from( id: i64 ) -> Self
      {
        Self( id )
      }
    }

    impl From< $name > for i64
    {
      fn from( id: $name ) -> Self
      {
        id.0
      }
    }
  };
}

macro_rules! uuid_id
{
  ( $( #[ $meta:meta ] )* $name:ident ) =>
  {
    $( #[ $meta ] )*
    #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
    #[ serde( transparent ) ]
    pub struct $name( pub uuid::Uuid );

    impl $name
    {
      /// Generate a fresh random public identifier.
      #[ must_use ]
      pub fn generate() -> Self
      {
        Self( uuid::Uuid::new_v4() )
      }

      /// Wrap an existing uuid (e.g. one read back from storage).
      #[ must_use ]
      pub const fn new( id: uuid::Uuid ) -> Self
      {
        Self( id )
      }

      /// Unwrap back to the raw uuid.
      #[ must_use ]
      pub const fn get( self ) -> uuid::Uuid
      {
        self.0
      }
    }

    impl fmt::Display for $name
    {
      fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
      {
        write!( f, "{}", self.0 )
      }
    }

    impl From< uuid::Uuid > for $name
    {
      fn from( id: uuid::Uuid ) -> Self
      {
        Self( id )
      }
    }

    impl From< $name > for uuid::Uuid
    {
      fn from( id: $name ) -> Self
      {
        id.0
      }
    }
  };
}

numeric_id!(
  /// Internal numeric id of a `User` row. Never exposed to clients directly;
  /// the resolved principal downstream components see is always this type,
  /// not the external identity-provider subject uuid.
  UserId
);

numeric_id!(
  /// Internal numeric id of a `Category` row.
  CategoryId
);

numeric_id!(
  /// Internal numeric id of an `Entry` (income or expense) row.
  EntryId
);

numeric_id!(
  /// Internal numeric id of a `Budget` row. Not exposed to clients; routes
  /// address budgets by `BudgetPublicId`.
  BudgetId
);

numeric_id!(
  /// Internal numeric id of a `SavingsGoal` row.
  GoalId
);

numeric_id!(
  /// Internal numeric id of an `Installment` row.
  InstallmentId
);

numeric_id!(
  /// Internal numeric id of a `Contribution` row.
  ContributionId
);

numeric_id!(
  /// Internal numeric id of a `Projection` row.
  ProjectionId
);

uuid_id!(
  /// Client-facing identifier for a `Budget`, distinct from its internal id.
  BudgetPublicId
);

uuid_id!(
  /// Client-facing identifier for a `User`, distinct from its internal id
  /// and from the identity provider's external subject uuid.
  UserPublicId
);

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn numeric_id_round_trips_through_json()
  {
    let id = CategoryId::new( 42 );
    let json = serde_json::to_string( &id ).expect( "serialize" );
    assert_eq!( json, "42" );
    let back: CategoryId = serde_json::from_str( &json ).expect( "deserialize" );
    assert_eq!( back, id );
  }

  #[ test ]
  fn uuid_id_round_trips_through_json()
  {
    let id = BudgetPublicId::generate();
    let json = serde_json::to_string( &id ).expect( "serialize" );
    let back: BudgetPublicId = serde_json::from_str( &json ).expect( "deserialize" );
    assert_eq!( back, id );
  }
}
