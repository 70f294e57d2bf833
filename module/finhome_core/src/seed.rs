//! Predefined category seeding
//!
//! Populates the `categories` table with the fixed set of predefined,
//! owner-less rows every account shares (`SPEC_FULL.md` §3, §4.4). Safe to
//! run more than once: each row is looked up by name before insertion.

use crate::error::{ AppError, Result };
use finhome_types::CategoryType;
use sqlx::SqlitePool;

/// `(name, icon, category_type)` for every predefined category.
const PREDEFINED_CATEGORIES: &[ ( &str, &str, CategoryType ) ] =
&[
  ( "Salary", "💰", CategoryType::Income ),
  ( "Freelance", "💼", CategoryType::Income ),
  ( "Gift", "🎁", CategoryType::Both ),
  ( "Refund", "↩️", CategoryType::Both ),
  ( "Groceries", "🛒", CategoryType::Expense ),
  ( "Rent", "🏠", CategoryType::Expense ),
  ( "Utilities", "💡", CategoryType::Expense ),
  ( "Transportation", "🚌", CategoryType::Expense ),
  ( "Dining", "🍽️", CategoryType::Expense ),
  ( "Entertainment", "🎬", CategoryType::Expense ),
  ( "Healthcare", "🩺", CategoryType::Expense ),
  ( "Education", "📚", CategoryType::Expense ),
];

/// Seed the predefined categories, skipping any that already exist.
///
/// # Errors
///
/// Returns an error if a lookup or insert fails.
pub async fn seed_predefined_categories( pool: &SqlitePool ) -> Result< usize >
{
  let mut inserted = 0usize;

  for ( name, icon, category_type ) in PREDEFINED_CATEGORIES
  {
    let existing: Option< i64 > = sqlx::query_scalar(
      "SELECT id FROM categories WHERE predefined = 1 AND name = ?"
    )
    .bind( *name )
    .fetch_optional( pool )
    .await
    .map_err( AppError::Internal )?;

    if existing.is_some()
    {
      continue;
    }

    sqlx::query( "INSERT INTO categories ( name, icon, type, predefined, owner_id ) VALUES ( ?, ?, ?, 1, NULL )" )
      .bind( *name )
      .bind( *icon )
      .bind( category_type.as_db_str() )
      .execute( pool )
      .await
      .map_err( AppError::Internal )?;

    inserted += 1;
  }

  Ok( inserted )
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use finhome_test_support::TestDatabaseBuilder;

  #[ tokio::test ]
  async fn seeding_twice_is_idempotent()
  {
    let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
    crate::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );

    let first = seed_predefined_categories( db.pool() ).await.expect( "first seed" );
    assert_eq!( first, PREDEFINED_CATEGORIES.len() );

    let second = seed_predefined_categories( db.pool() ).await.expect( "second seed" );
    assert_eq!( second, 0 );

    let count: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM categories WHERE predefined = 1" )
      .fetch_one( db.pool() )
      .await
      .expect( "count" );
    assert_eq!( count as usize, PREDEFINED_CATEGORIES.len() );
  }
}
