//! Repository-level integration tests exercising the numbered scenarios
//! across module boundaries (ledger + budgets, ownership).

use chrono::NaiveDate;
use finhome_core::budgets::{ BudgetRepository, NewBudget };
use finhome_core::categories::CategoryRepository;
use finhome_core::ledger::{ EntryInput, LedgerRepository };
use finhome_core::projections::{ ProjectionInput, ProjectionRepository };
use finhome_core::users::UserRepository;
use finhome_types::{ BudgetFrequency, CategoryId, EntryType, Money, Role, UserId };
use finhome_test_support::TestDatabaseBuilder;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

async fn setup() -> SqlitePool
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
  finhome_core::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
  db.pool().clone()
}

async fn seed_food_category( pool: &SqlitePool, owner: UserId ) -> CategoryId
{
  let result = sqlx::query(
    "INSERT INTO categories ( name, type, predefined, owner_id ) VALUES ( 'Food', 'expense', 0, ? )"
  )
  .bind( owner.get() )
  .execute( pool )
  .await
  .expect( "seed category" );
  CategoryId::new( result.last_insert_rowid() )
}

#[ tokio::test ]
async fn scenario_1_budget_consumption_tracks_entry_mutations()
{
  let pool = setup().await;
  let users = UserRepository::new( pool.clone() );
  let user = users.create( "u@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "create user" );
  let category_id = seed_food_category( &pool, user.id ).await;

  let budgets = BudgetRepository::new( pool.clone() );
  let budget = budgets.create( NewBudget
  {
    owner_id: user.id,
    category_id,
    cap_amount: Money::from_str( "500000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
    frequency: BudgetFrequency::Monthly,
    auto_renew: true,
  } )
  .await
  .expect( "create budget" );

  let ledger = LedgerRepository::new( pool.clone() );
  let entry_120k = ledger.create_entry(
    user.id,
    EntryInput
    {
      category_id,
      amount: Money::from_str( "120000" ).expect( "parse" ),
      entry_type: EntryType::Expense,
      description: None,
      date: NaiveDate::from_ymd_opt( 2026, 1, 5 ).expect( "valid date" ),
    },
    None,
  )
  .await
  .expect( "create entry 1" );

  ledger.create_entry(
    user.id,
    EntryInput
    {
      category_id,
      amount: Money::from_str( "80000" ).expect( "parse" ),
      entry_type: EntryType::Expense,
      description: None,
      date: NaiveDate::from_ymd_opt( 2026, 1, 10 ).expect( "valid date" ),
    },
    None,
  )
  .await
  .expect( "create entry 2" );

  let after_two = budgets.require_owned( budget.public_uuid, user.id ).await.expect( "reload" );
  assert_eq!( after_two.consumed_amount.to_string(), "200000.00" );
  assert_eq!( after_two.state, finhome_types::BudgetState::Active );
  assert!( after_two.consumption_ratio() < rust_decimal::Decimal::from_str( "0.8" ).expect( "parse" ) );

  ledger.create_entry(
    user.id,
    EntryInput
    {
      category_id,
      amount: Money::from_str( "350000" ).expect( "parse" ),
      entry_type: EntryType::Expense,
      description: None,
      date: NaiveDate::from_ymd_opt( 2026, 1, 15 ).expect( "valid date" ),
    },
    None,
  )
  .await
  .expect( "create entry 3" );

  let after_three = budgets.require_owned( budget.public_uuid, user.id ).await.expect( "reload" );
  assert_eq!( after_three.consumed_amount.to_string(), "550000.00" );
  assert_eq!( after_three.state, finhome_types::BudgetState::Over );

  ledger.delete_entry( user.id, entry_120k.id ).await.expect( "delete entry 1" );

  let after_delete = budgets.require_owned( budget.public_uuid, user.id ).await.expect( "reload" );
  assert_eq!( after_delete.consumed_amount.to_string(), "430000.00" );
  assert_eq!( after_delete.state, finhome_types::BudgetState::Active );
}

#[ tokio::test ]
async fn scenario_4_duplicate_active_budget_is_state_conflict()
{
  let pool = setup().await;
  let users = UserRepository::new( pool.clone() );
  let user = users.create( "u2@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "create user" );
  let category_id = seed_food_category( &pool, user.id ).await;

  let budgets = BudgetRepository::new( pool.clone() );
  let new = || NewBudget
  {
    owner_id: user.id,
    category_id,
    cap_amount: Money::from_str( "500000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
    frequency: BudgetFrequency::Monthly,
    auto_renew: true,
  };

  budgets.create( new() ).await.expect( "first create succeeds" );
  let second = budgets.create( new() ).await;
  assert!( matches!( second, Err( finhome_core::error::AppError::StateConflict( _ ) ) ) );
}

#[ tokio::test ]
async fn scenario_5_ownership_mismatch_is_forbidden_not_not_found()
{
  let pool = setup().await;
  let users = UserRepository::new( pool.clone() );
  let owner = users.create( "owner@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "owner" );
  let other = users.create( "other@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "other" );
  let category_id = seed_food_category( &pool, owner.id ).await;

  let ledger = LedgerRepository::new( pool.clone() );
  let entry = ledger.create_entry(
    owner.id,
    EntryInput
    {
      category_id,
      amount: Money::from_str( "1000" ).expect( "parse" ),
      entry_type: EntryType::Expense,
      description: None,
      date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    },
    None,
  )
  .await
  .expect( "create entry" );

  let result = ledger.require_owned( entry.id, other.id ).await;
  assert!( matches!( result, Err( finhome_core::error::AppError::Forbidden ) ) );

  let category_repo = CategoryRepository::new( pool.clone() );
  let unknown_category_result = category_repo.require_visible( CategoryId::new( 999_999 ), other.id ).await;
  assert!( matches!( unknown_category_result, Err( finhome_core::error::AppError::NotFound ) ) );
}

#[ tokio::test ]
async fn scenario_6_projection_execution_materializes_entry_and_feeds_budget()
{
  let pool = setup().await;
  let users = UserRepository::new( pool.clone() );
  let user = users.create( "u3@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "create user" );

  let result = sqlx::query(
    "INSERT INTO categories ( name, type, predefined, owner_id ) VALUES ( 'Rent', 'expense', 0, ? )"
  )
  .bind( user.id.get() )
  .execute( &pool )
  .await
  .expect( "seed category" );
  let category_id = CategoryId::new( result.last_insert_rowid() );

  let budgets = BudgetRepository::new( pool.clone() );
  let budget = budgets.create( NewBudget
  {
    owner_id: user.id,
    category_id,
    cap_amount: Money::from_str( "500000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    end_date: NaiveDate::from_ymd_opt( 2026, 1, 31 ).expect( "valid date" ),
    frequency: BudgetFrequency::Monthly,
    auto_renew: true,
  } )
  .await
  .expect( "create budget" );

  let projections = ProjectionRepository::new( pool.clone() );
  let projection = projections.create( user.id, ProjectionInput
  {
    name: "Rent".to_string(),
    category_id,
    amount: Money::from_str( "100000" ).expect( "parse" ),
    entry_type: EntryType::Expense,
    frequency: BudgetFrequency::Monthly,
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    description: None,
    active: true,
  } )
  .await
  .expect( "create projection" );

  let execution_day = NaiveDate::from_ymd_opt( 2026, 1, 10 ).expect( "valid date" );
  let entry = projections.execute( user.id, projection.id, execution_day ).await.expect( "execute" );
  assert_eq!( entry.amount.to_string(), "100000.00" );
  assert_eq!( entry.entry_type, EntryType::Expense );
  assert_eq!( entry.category_id, category_id );
  assert_eq!( entry.date, execution_day );

  let reloaded = projections.require_owned( projection.id, user.id ).await.expect( "reload" );
  assert_eq!( reloaded.last_executed, Some( execution_day ) );

  let budget_after = budgets.require_owned( budget.public_uuid, user.id ).await.expect( "reload budget" );
  assert_eq!( budget_after.consumed_amount.to_string(), "100000.00" );
}

#[ tokio::test ]
async fn inactive_projection_cannot_be_executed()
{
  let pool = setup().await;
  let users = UserRepository::new( pool.clone() );
  let user = users.create( "u4@example.com", Role::User, Some( Uuid::new_v4() ), None ).await.expect( "create user" );
  let category_id = seed_food_category( &pool, user.id ).await;

  let projections = ProjectionRepository::new( pool.clone() );
  let projection = projections.create( user.id, ProjectionInput
  {
    name: "Groceries".to_string(),
    category_id,
    amount: Money::from_str( "50000" ).expect( "parse" ),
    entry_type: EntryType::Expense,
    frequency: BudgetFrequency::Monthly,
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    description: None,
    active: false,
  } )
  .await
  .expect( "create projection" );

  let result = projections
    .execute( user.id, projection.id, NaiveDate::from_ymd_opt( 2026, 1, 10 ).expect( "valid date" ) )
    .await;
  assert!( matches!( result, Err( finhome_core::error::AppError::StateConflict( _ ) ) ) );
}
