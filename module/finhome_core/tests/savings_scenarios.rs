//! Repository-level integration test for the Savings Engine's goal-plan and
//! contribution-rebalance scenario.

use chrono::NaiveDate;
use finhome_core::savings::{ GoalUpdate, NewContribution, NewGoal, SavingsRepository };
use finhome_core::users::UserRepository;
use finhome_types::{ BudgetFrequency, GoalState, InstallmentState, Money, Role };
use finhome_test_support::TestDatabaseBuilder;
use std::str::FromStr;
use uuid::Uuid;

#[ tokio::test ]
async fn scenario_3_goal_plan_and_contribution_rebalances_pending_installments()
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
  finhome_core::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
  let pool = db.pool().clone();

  let users = UserRepository::new( pool.clone() );
  let user = users.create( "saver@example.com", Role::User, Some( Uuid::new_v4() ), None )
    .await
    .expect( "create user" );

  let savings = SavingsRepository::new( pool.clone() );
  let goal = savings.create_goal( NewGoal
  {
    owner_id: user.id,
    name: "Trip".to_string(),
    target_amount: Money::from_str( "1200000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    deadline: Some( NaiveDate::from_ymd_opt( 2026, 6, 1 ).expect( "valid date" ) ),
    frequency: Some( BudgetFrequency::Monthly ),
    icon: None,
    color: None,
  } )
  .await
  .expect( "create goal" );

  let installments = savings.list_installments( goal.id ).await.expect( "list installments" );
  assert_eq!( installments.len(), 6 );
  for installment in &installments
  {
    assert_eq!( installment.expected_amount.to_string(), "200000.00" );
    assert_eq!( installment.state, InstallmentState::Pending );
  }

  let first = installments[ 0 ].clone();
  savings.contribute( user.id, NewContribution
  {
    goal_id: goal.id,
    amount: Money::from_str( "150000" ).expect( "parse" ),
    description: None,
    installment_id: Some( first.id ),
  } )
  .await
  .expect( "contribute" );

  let reloaded_goal = savings.require_owned( goal.id, user.id ).await.expect( "reload goal" );
  assert_eq!( reloaded_goal.accrued_amount.to_string(), "150000.00" );
  assert_eq!( reloaded_goal.state, GoalState::Active );

  let reloaded_installments = savings.list_installments( goal.id ).await.expect( "reload installments" );
  let paid = reloaded_installments.iter().find( |i| i.id == first.id ).expect( "first installment" );
  assert_eq!( paid.state, InstallmentState::Paid );
  assert_eq!( paid.expected_amount.to_string(), "150000.00" );

  let pending: Vec< _ > = reloaded_installments.iter().filter( |i| i.state == InstallmentState::Pending ).collect();
  assert_eq!( pending.len(), 5 );
  for installment in pending
  {
    // ⌈(1200000 − 150000) / 5⌉ = 210000.
    assert_eq!( installment.expected_amount.to_string(), "210000.00" );
  }
}

#[ tokio::test ]
async fn contributing_enough_to_meet_target_completes_the_goal()
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
  finhome_core::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
  let pool = db.pool().clone();

  let users = UserRepository::new( pool.clone() );
  let user = users.create( "saver2@example.com", Role::User, Some( Uuid::new_v4() ), None )
    .await
    .expect( "create user" );

  let savings = SavingsRepository::new( pool.clone() );
  let goal = savings.create_goal( NewGoal
  {
    owner_id: user.id,
    name: "Emergency Fund".to_string(),
    target_amount: Money::from_str( "100000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    deadline: None,
    frequency: None,
    icon: None,
    color: None,
  } )
  .await
  .expect( "create goal" );

  savings.contribute( user.id, NewContribution
  {
    goal_id: goal.id,
    amount: Money::from_str( "100000" ).expect( "parse" ),
    description: Some( "lump sum".to_string() ),
    installment_id: None,
  } )
  .await
  .expect( "contribute" );

  let reloaded = savings.require_owned( goal.id, user.id ).await.expect( "reload" );
  assert_eq!( reloaded.state, GoalState::Completed );

  let rejected = savings.contribute( user.id, NewContribution
  {
    goal_id: goal.id,
    amount: Money::from_str( "1" ).expect( "parse" ),
    description: None,
    installment_id: None,
  } )
  .await;
  assert!( matches!( rejected, Err( finhome_core::error::AppError::StateConflict( _ ) ) ) );
}

#[ tokio::test ]
async fn update_goal_pauses_and_resumes_and_cannot_force_completed()
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
  finhome_core::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
  let pool = db.pool().clone();

  let users = UserRepository::new( pool.clone() );
  let user = users.create( "saver3@example.com", Role::User, Some( Uuid::new_v4() ), None )
    .await
    .expect( "create user" );

  let savings = SavingsRepository::new( pool.clone() );
  let goal = savings.create_goal( NewGoal
  {
    owner_id: user.id,
    name: "Camera".to_string(),
    target_amount: Money::from_str( "100000" ).expect( "parse" ),
    start_date: NaiveDate::from_ymd_opt( 2026, 1, 1 ).expect( "valid date" ),
    deadline: None,
    frequency: None,
    icon: None,
    color: None,
  } )
  .await
  .expect( "create goal" );

  // A client cannot force COMPLETED directly while accrued < target.
  let forced = savings.update_goal( user.id, goal.id, GoalUpdate
  {
    name: goal.name.clone(),
    target_amount: goal.target_amount,
    deadline: goal.deadline,
    frequency: goal.frequency,
    icon: None,
    color: None,
    state: GoalState::Completed,
  } )
  .await;
  assert!( matches!( forced, Err( finhome_core::error::AppError::Validation( _ ) ) ) );

  let paused = savings.update_goal( user.id, goal.id, GoalUpdate
  {
    name: goal.name.clone(),
    target_amount: goal.target_amount,
    deadline: goal.deadline,
    frequency: goal.frequency,
    icon: None,
    color: None,
    state: GoalState::Paused,
  } )
  .await
  .expect( "pause" );
  assert_eq!( paused.state, GoalState::Paused );

  savings.contribute( user.id, NewContribution
  {
    goal_id: goal.id,
    amount: Money::from_str( "10000" ).expect( "parse" ),
    description: None,
    installment_id: None,
  } )
  .await
  .expect( "contribute resumes a paused goal" );

  let resumed = savings.require_owned( goal.id, user.id ).await.expect( "reload" );
  assert_eq!( resumed.state, GoalState::Active );

  // Raising target back above accrued un-completes a completed goal.
  savings.contribute( user.id, NewContribution
  {
    goal_id: goal.id,
    amount: Money::from_str( "90000" ).expect( "parse" ),
    description: None,
    installment_id: None,
  } )
  .await
  .expect( "complete the goal" );
  let completed = savings.require_owned( goal.id, user.id ).await.expect( "reload" );
  assert_eq!( completed.state, GoalState::Completed );

  let raised = savings.update_goal( user.id, goal.id, GoalUpdate
  {
    name: completed.name.clone(),
    target_amount: Money::from_str( "500000" ).expect( "parse" ),
    deadline: completed.deadline,
    frequency: completed.frequency,
    icon: None,
    color: None,
    state: GoalState::Active,
  } )
  .await
  .expect( "raise target" );
  assert_eq!( raised.state, GoalState::Active );
}
