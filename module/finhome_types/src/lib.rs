//! Shared domain types for the finhome personal-finance backend
//!
//! This crate provides the identifiers, money representation, and the small
//! closed enums (`Role`, `CategoryType`, `EntryType`, `BudgetFrequency`,
//! `BudgetState`, `GoalState`, `InstallmentState`) shared by `finhome_core`
//! and `finhome_api`. Nothing here talks to a database or the network; it is
//! the vocabulary every other crate in the workspace agrees on.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
mod ids;

#[cfg(feature = "enabled")]
mod money;

#[cfg(feature = "enabled")]
mod enums;

#[cfg(feature = "enabled")]
pub use ids::
{
  BudgetId, BudgetPublicId, CategoryId, ContributionId, EntryId, GoalId, InstallmentId,
  ProjectionId, UserId, UserPublicId,
};

#[cfg(feature = "enabled")]
pub use money::Money;

#[cfg(feature = "enabled")]
pub use enums::
{
  BudgetFrequency, BudgetState, CategoryType, EntryType, GoalState, InstallmentState, Role,
};
