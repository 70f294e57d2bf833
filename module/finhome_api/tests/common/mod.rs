//! Shared integration-test infrastructure: an in-memory database, seeded
//! users, a real [`axum::Router`] built from [`finhome_api::state::AppState`],
//! and a legacy HS256 token minter so requests can be made exactly as a
//! real client would, `Authorization` header included.

#![ allow( dead_code ) ]

use axum::Router;
use axum::routing::{ delete, get, post, put };
use finhome_api::routes;
use finhome_api::state::AppState;
use finhome_core::config::Settings;
use finhome_core::users::{ User, UserRepository };
use finhome_test_support::TestDatabaseBuilder;
use finhome_types::Role;
use jsonwebtoken::{ encode, EncodingKey, Header };
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

#[ derive( Serialize ) ]
struct LegacyClaims
{
  sub: String,
  exp: i64,
}

/// Spins up an in-memory, migrated database.
pub async fn setup_pool() -> SqlitePool
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.expect( "db" );
  finhome_core::migrations::apply_all_migrations( db.pool() ).await.expect( "migrate" );
  db.pool().clone()
}

/// Creates a user directly against the pool, bypassing HTTP.
pub async fn create_user( pool: &SqlitePool, email: &str ) -> User
{
  let users = UserRepository::new( pool.clone() );
  users.create( email, Role::User, Some( Uuid::new_v4() ), None ).await.expect( "create user" )
}

/// Mints a legacy HS256 token for `user`, verifiable by
/// [`finhome_api::jwt_auth`]'s legacy path under `Settings::for_tests()`.
pub fn legacy_token( user: &User ) -> String
{
  let claims = LegacyClaims { sub: user.id.get().to_string(), exp: chrono::Utc::now().timestamp() + 3600 };
  encode( &Header::new( jsonwebtoken::Algorithm::HS256 ), &claims, &EncodingKey::from_secret( b"test-secret" ) )
    .expect( "mint legacy token" )
}

/// Builds the full route tree against `pool`, the same wiring
/// `src/bin/finhome_api_server.rs` assembles at startup.
pub fn build_router( pool: SqlitePool ) -> Router
{
  let state = AppState::new( pool, Settings::for_tests() );

  Router::new()
    .route( "/health", get( routes::health::health_check ) )
    .route( "/auth/register", post( routes::auth::register ) )
    .route( "/auth/login", post( routes::auth::login ) )
    .route( "/auth/me", get( routes::auth::me ) )
    .route( "/categories", get( routes::categories::list ) )
    .route( "/categories/type/:t", get( routes::categories::list_by_type ) )
    .route( "/categories/:id", get( routes::categories::get_one ) )
    .route( "/transactions", post( routes::transactions::create ) )
    .route( "/transactions", get( routes::transactions::list ) )
    .route( "/transactions/balance", get( routes::transactions::balance ) )
    .route( "/transactions/summary", get( routes::transactions::summary ) )
    .route( "/transactions/range", get( routes::transactions::list_by_range ) )
    .route( "/transactions/type/:t", get( routes::transactions::list_by_type ) )
    .route( "/transactions/category/:id", get( routes::transactions::list_by_category ) )
    .route( "/transactions/:id", get( routes::transactions::get_one ) )
    .route( "/transactions/:id", put( routes::transactions::update ) )
    .route( "/transactions/:id", delete( routes::transactions::delete ) )
    .route( "/budgets", post( routes::budgets::create ) )
    .route( "/budgets", get( routes::budgets::list ) )
    .route( "/budgets/active", get( routes::budgets::active ) )
    .route( "/budgets/near-limit", get( routes::budgets::near_limit ) )
    .route( "/budgets/sync-consumption", post( routes::budgets::sync_consumption ) )
    .route( "/budgets/:id", get( routes::budgets::get_one ) )
    .route( "/budgets/:id", put( routes::budgets::update ) )
    .route( "/budgets/:id", delete( routes::budgets::delete ) )
    .route( "/budgets/:id/deactivate", put( routes::budgets::deactivate ) )
    .route( "/projections", post( routes::projections::create ) )
    .route( "/projections", get( routes::projections::list ) )
    .route( "/projections/:id", get( routes::projections::get_one ) )
    .route( "/projections/:id", put( routes::projections::update ) )
    .route( "/projections/:id", delete( routes::projections::delete ) )
    .route( "/projections/:id/execute", post( routes::projections::execute ) )
    .route( "/savings/goals", post( routes::savings::create_goal ) )
    .route( "/savings/goals", get( routes::savings::list_goals ) )
    .route( "/savings/goals/:id", get( routes::savings::get_goal ) )
    .route( "/savings/goals/:id", put( routes::savings::update_goal ) )
    .route( "/savings/goals/:id", delete( routes::savings::delete_goal ) )
    .route( "/savings/goals/:id/installments", get( routes::savings::list_installments ) )
    .route( "/savings/goals/:id/contributions", get( routes::savings::list_goal_contributions ) )
    .route( "/savings/contributions", post( routes::savings::create_contribution ) )
    .route( "/savings/contributions/:id", put( routes::savings::update_contribution ) )
    .route( "/savings/contributions/:id", delete( routes::savings::delete_contribution ) )
    .with_state( state )
}

/// Seeds one predefined expense category directly, since the HTTP surface
/// never needs to create one (`SPEC_FULL.md` §3: predefined categories are
/// seeded at startup, not created through the API).
pub async fn seed_category( pool: &SqlitePool, name: &str, category_type: &str ) -> i64
{
  let result = sqlx::query( "INSERT INTO categories ( name, icon, type, predefined, owner_id ) VALUES ( ?, '', ?, 1, NULL )" )
    .bind( name )
    .bind( category_type )
    .execute( pool )
    .await
    .expect( "seed category" );
  result.last_insert_rowid()
}
