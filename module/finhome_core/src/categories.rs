//! Category Registry (C4)
//!
//! Read-only lookup surface over predefined and user-owned categories.
//! `CategoryType::permits_entry_type` (in `finhome_types`) is the single
//! source of truth for the entry/category compatibility rule; this module
//! only adds the repository queries and the ownership-aware "visible to
//! user" filter (predefined rows union the user's own rows).

use crate::error::{ AppError, Result };
use finhome_types::{ CategoryId, CategoryType, EntryType, UserId };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;
use serde::Serialize;

/// A `Category` row.
#[ derive( Debug, Clone, PartialEq, Eq, Serialize ) ]
pub struct Category
{
  pub id: CategoryId,
  pub name: String,
  pub icon: Option< String >,
  pub category_type: CategoryType,
  pub predefined: bool,
  /// `None` iff `predefined`.
  pub owner_id: Option< UserId >,
}

impl Category
{
  /// `true` if this category is predefined, or owned by `user`.
  #[ must_use ]
  pub fn visible_to( &self, user: UserId ) -> bool
  {
    self.predefined || self.owner_id == Some( user )
  }

  /// Delegates to `CategoryType::permits_entry_type`, the single source of
  /// truth for the compatibility rule (`SPEC_FULL.md` §4.4).
  #[ must_use ]
  pub fn permits_entry_type( &self, entry_type: EntryType ) -> bool
  {
    self.category_type.permits_entry_type( entry_type )
  }
}

fn row_to_category( row: &sqlx::sqlite::SqliteRow ) -> Result< Category >
{
  let category_type: String = row.try_get( "type" ).map_err( AppError::Internal )?;
  let owner_id: Option< i64 > = row.try_get( "owner_id" ).map_err( AppError::Internal )?;

  Ok( Category
  {
    id: CategoryId::new( row.try_get( "id" ).map_err( AppError::Internal )? ),
    name: row.try_get( "name" ).map_err( AppError::Internal )?,
    icon: row.try_get( "icon" ).map_err( AppError::Internal )?,
    category_type: CategoryType::from_str( &category_type )
      .map_err( AppError::validation )?,
    predefined: row.try_get::< i64, _ >( "predefined" ).map_err( AppError::Internal )? != 0,
    owner_id: owner_id.map( UserId::new ),
  } )
}

/// Repository for `Category` rows (C4).
#[ derive( Debug, Clone ) ]
pub struct CategoryRepository
{
  pool: SqlitePool,
}

impl CategoryRepository
{
  #[ must_use ]
  pub fn new( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// All predefined categories.
  pub async fn list_predefined( &self ) -> Result< Vec< Category > >
  {
    let rows = sqlx::query( "SELECT * FROM categories WHERE predefined = 1 ORDER BY name" )
      .fetch_all( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    rows.iter().map( row_to_category ).collect()
  }

  /// Predefined categories ∪ categories owned by `user`.
  pub async fn list_available_to( &self, user: UserId ) -> Result< Vec< Category > >
  {
    let rows = sqlx::query(
      "SELECT * FROM categories WHERE predefined = 1 OR owner_id = ? ORDER BY name"
    )
    .bind( user.get() )
    .fetch_all( &self.pool )
    .await
    .map_err( AppError::Internal )?;

    rows.iter().map( row_to_category ).collect()
  }

  /// Categories available to `user`, filtered to those accepting `entry_type`.
  pub async fn list_available_to_by_type(
    &self,
    user: UserId,
    entry_type: EntryType,
  ) -> Result< Vec< Category > >
  {
    let categories = self.list_available_to( user ).await?;
    Ok(
      categories
        .into_iter()
        .filter( |c| c.permits_entry_type( entry_type ) )
        .collect()
    )
  }

  /// Look up a single category by id, regardless of visibility. Callers
  /// that need the visibility check call [`Category::visible_to`]
  /// themselves (e.g. to distinguish `NOT_FOUND` from `FORBIDDEN`).
  pub async fn find_by_id( &self, id: CategoryId ) -> Result< Option< Category > >
  {
    let row = sqlx::query( "SELECT * FROM categories WHERE id = ?" )
      .bind( id.get() )
      .fetch_optional( &self.pool )
      .await
      .map_err( AppError::Internal )?;

    row.as_ref().map( row_to_category ).transpose()
  }

  /// Look up a category and fail the way `Ledger::CreateEntry` requires:
  /// `NOT_FOUND` if no such row exists, `FORBIDDEN` if it exists but is
  /// neither predefined nor owned by `user`.
  pub async fn require_visible( &self, id: CategoryId, user: UserId ) -> Result< Category >
  {
    let category = self.find_by_id( id ).await?.ok_or( AppError::NotFound )?;
    if !category.visible_to( user )
    {
      return Err( AppError::Forbidden );
    }
    Ok( category )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  fn income_category() -> Category
  {
    Category
    {
      id: CategoryId::new( 1 ),
      name: "Salary".to_string(),
      icon: None,
      category_type: CategoryType::Income,
      predefined: true,
      owner_id: None,
    }
  }

  #[ test ]
  fn predefined_category_is_visible_to_anyone()
  {
    assert!( income_category().visible_to( UserId::new( 42 ) ) );
  }

  #[ test ]
  fn owned_category_is_only_visible_to_owner()
  {
    let mut c = income_category();
    c.predefined = false;
    c.owner_id = Some( UserId::new( 7 ) );

    assert!( c.visible_to( UserId::new( 7 ) ) );
    assert!( !c.visible_to( UserId::new( 8 ) ) );
  }

  #[ test ]
  fn income_category_rejects_expense_entry()
  {
    assert!( !income_category().permits_entry_type( EntryType::Expense ) );
  }
}
