//! Closed enumerations shared across the domain and the HTTP surface
//!
//! Every enum here round-trips through both SQLite (as its lower-case
//! string spelling) and JSON (same spelling) via `sqlx::Type`/`serde`, so a
//! value read from the store and one parsed from a request body compare
//! equal without a translation layer at the boundary.

use chrono::{ Datelike, NaiveDate };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

/// A user's role. `UserChild` accounts are linked to a guardian `User` with
/// role `User` (`SPEC_FULL.md` §3); `Admin` bypasses owner checks only on
/// admin-scoped routes.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum Role
{
  /// Full access, including admin-scoped routes that bypass owner checks.
  Admin,
  /// A regular account.
  User,
  /// A child account that must carry a non-null guardian id.
  UserChild,
}

/// The type of a `Category` and the set of `Entry` types it accepts.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum CategoryType
{
  /// Accepts only `EntryType::Income` entries.
  Income,
  /// Accepts only `EntryType::Expense` entries.
  Expense,
  /// Accepts either entry type.
  Both,
}

impl CategoryType
{
  /// The single source of truth for entry/category type compatibility
  /// (`SPEC_FULL.md` §4.4): `Both` accepts either `EntryType`, otherwise the
  /// two must match exactly.
  #[ must_use ]
  pub fn permits_entry_type( self, entry_type: EntryType ) -> bool
  {
    match self
    {
      Self::Both => true,
      Self::Income => entry_type == EntryType::Income,
      Self::Expense => entry_type == EntryType::Expense,
    }
  }
}

/// Whether an `Entry` is money coming in or going out.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum EntryType
{
  /// Income entry; increases `Ledger::balance`.
  Income,
  /// Expense entry; decreases `Ledger::balance` and is the only entry type
  /// that feeds the Budget Engine's consumption tracker.
  Expense,
}

/// The recurrence cadence shared by `Budget`, `SavingsGoal` installment
/// plans, and `Projection`.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum BudgetFrequency
{
  /// Every 7 days.
  Weekly,
  /// Every 14 days.
  Biweekly,
  /// Every calendar month.
  Monthly,
  /// Every 3 calendar months.
  Quarterly,
  /// Every 6 calendar months.
  Semiannual,
  /// Every 12 calendar months.
  Annual,
}

impl BudgetFrequency
{
  /// Step `date` forward by one period of this frequency. Calendar-month
  /// based frequencies step by months (clamping the day-of-month into the
  /// target month, since e.g. Jan 31 + 1 month has no Feb 31); week-based
  /// frequencies step by a fixed number of days.
  #[ must_use ]
  pub fn step( self, date: NaiveDate ) -> NaiveDate
  {
    match self
    {
      Self::Weekly => date + chrono::Duration::days( 7 ),
      Self::Biweekly => date + chrono::Duration::days( 14 ),
      Self::Monthly => add_months( date, 1 ),
      Self::Quarterly => add_months( date, 3 ),
      Self::Semiannual => add_months( date, 6 ),
      Self::Annual => add_months( date, 12 ),
    }
  }
}

/// Add `months` calendar months to `date`, clamping the day-of-month to the
/// last valid day of the resulting month.
fn add_months( date: NaiveDate, months: i32 ) -> NaiveDate
{
  let total_months = date.year() * 12 + i32::try_from( date.month() ).unwrap_or( 1 ) - 1 + months;
  let year = total_months.div_euclid( 12 );
  let month = total_months.rem_euclid( 12 ) + 1;
  let month = u32::try_from( month ).unwrap_or( 1 );

  let mut day = date.day();
  loop
  {
    if let Some( result ) = NaiveDate::from_ymd_opt( year, month, day )
    {
      return result;
    }
    day -= 1;
  }
}

/// Lifecycle state of a `Budget` (`SPEC_FULL.md` §4.5).
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum BudgetState
{
  /// `consumed < cap`; the budget currently applies.
  Active,
  /// Terminal for the row; only the renewal scheduler or an explicit
  /// deactivate call produces this state.
  Inactive,
  /// `consumed >= cap`.
  Over,
}

/// Lifecycle state of a `SavingsGoal`.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum GoalState
{
  /// `accrued < target`; contributions are accepted.
  Active,
  /// `accrued >= target`; set automatically by `recomputeGoalProgress`.
  Completed,
  /// Temporarily suspended; resumes to `Active` on the next contribution.
  Paused,
  /// Terminal; contributions are rejected.
  Cancelled,
}

/// Lifecycle state of one `Installment` in a goal's payment plan.
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "SCREAMING_SNAKE_CASE" ) ]
pub enum InstallmentState
{
  /// Not yet paid; participates in `rebalancePendingInstallments`.
  Pending,
  /// Paid, with `contribution_id` set.
  Paid,
  /// Scheduled date has passed while still `Pending`. The core spec does not
  /// define an automated transition into this state; it is available for a
  /// future scheduled sweep but is not written by any operation specified
  /// here.
  Overdue,
  /// The parent goal was cancelled.
  Cancelled,
}

macro_rules! db_string_enum
{
  ( $name:ident { $( $variant:ident => $db:literal ),+ $(,)? } ) =>
  {
    impl $name
    {
      /// The lower-case string spelling stored in the database.
      #[ must_use ]
      pub const fn as_db_str( self ) -> &'static str
      {
        match self
        {
          $( Self::$variant => $db, )+
        }
      }
    }

    impl fmt::Display for $name
    {
      fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
      {
        write!( f, "{}", self.as_db_str() )
      }
    }

    impl FromStr for $name
    {
      type Err = String;

      fn from_str( s: &str ) -> Result< Self, Self::Err >
      {
        match s
        {
          $( $db => Ok( Self::$variant ), )+
          other => Err( format!( "unrecognized {}: {other}", stringify!( $name ) ) ),
        }
      }
    }
  };
}

db_string_enum!( Role { Admin => "admin", User => "user", UserChild => "user_child" } );
db_string_enum!( CategoryType { Income => "income", Expense => "expense", Both => "both" } );
db_string_enum!( EntryType { Income => "income", Expense => "expense" } );
db_string_enum!(
  BudgetFrequency
  {
    Weekly => "weekly",
    Biweekly => "biweekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Semiannual => "semiannual",
    Annual => "annual",
  }
);
db_string_enum!( BudgetState { Active => "active", Inactive => "inactive", Over => "over" } );
db_string_enum!(
  GoalState
  {
    Active => "active",
    Completed => "completed",
    Paused => "paused",
    Cancelled => "cancelled",
  }
);
db_string_enum!(
  InstallmentState
  {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
  }
);

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn both_permits_either_entry_type()
  {
    assert!( CategoryType::Both.permits_entry_type( EntryType::Income ) );
    assert!( CategoryType::Both.permits_entry_type( EntryType::Expense ) );
  }

  #[ test ]
  fn income_category_rejects_expense_entries()
  {
    assert!( !CategoryType::Income.permits_entry_type( EntryType::Expense ) );
  }

  #[ test ]
  fn monthly_step_clamps_short_months()
  {
    let jan_31 = NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" );
    let stepped = BudgetFrequency::Monthly.step( jan_31 );
    assert_eq!( stepped, NaiveDate::from_ymd_opt( 2026, 2, 28 ).expect( "valid date" ) );
  }

  #[ test ]
  fn monthly_window_matches_scenario_2()
  {
    let start = NaiveDate::from_ymd_opt( 2026, 2, 1 ).expect( "valid date" );
    let next_start = BudgetFrequency::Monthly.step( start );
    let end = next_start - chrono::Duration::days( 1 );
    assert_eq!( end, NaiveDate::from_ymd_opt( 2026, 2, 28 ).expect( "valid date" ) );
  }

  #[ test ]
  fn db_str_round_trips()
  {
    assert_eq!( BudgetState::from_str( "over" ), Ok( BudgetState::Over ) );
    assert_eq!( BudgetState::Over.as_db_str(), "over" );
  }
}
