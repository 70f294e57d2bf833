//! finhome API server
//!
//! Wires `finhome_core`'s use-cases to an axum `Router`, migrates and seeds
//! the database on startup, and spawns the Renewal Scheduler (C8) as a
//! background tokio task alongside the HTTP listener.
//!
//! # Configuration
//!
//! Settings resolve through [`finhome_core::config::Settings::load`]'s
//! layered precedence (environment variables, then `./config/finhome.toml`,
//! then hardcoded defaults): `DATABASE_URL`-equivalent `database.url`,
//! `server.bind_address`, the `jwt.*` Token Verifier settings, and
//! `scheduler.tick_seconds`.

use axum::http::{ header, Method };
use axum::routing::{ delete, get, post, put };
use axum::Router;
use finhome_api::routes;
use finhome_api::state::AppState;
use finhome_core::config::Settings;
use finhome_core::migrations::apply_all_migrations;
use finhome_core::scheduler::RenewalScheduler;
use finhome_core::seed::seed_predefined_categories;
use sqlx::sqlite::{ SqliteConnectOptions, SqlitePoolOptions };
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Deployment mode classification for production safety warnings.
///
/// - **Pilot**: localhost development environment.
/// - **ProductionUnconfirmed**: production environment detected but not
///   explicitly configured.
/// - **Production** / **Development**: explicitly configured via
///   `FINHOME_DEPLOYMENT_MODE`.
enum DeploymentMode
{
  Pilot,
  ProductionUnconfirmed,
  Production,
  Development,
}

/// Detects deployment mode from `FINHOME_DEPLOYMENT_MODE` plus common
/// hosting-environment signals (Kubernetes, AWS, Heroku) when unset.
fn detect_deployment_mode() -> DeploymentMode
{
  match env::var( "FINHOME_DEPLOYMENT_MODE" ).as_deref()
  {
    Ok( "development" ) => return DeploymentMode::Development,
    Ok( "production" ) => return DeploymentMode::Production,
    Ok( "pilot" ) => return DeploymentMode::Pilot,
    _ => {}
  }

  let is_production =
    env::var( "KUBERNETES_SERVICE_HOST" ).is_ok() ||
    env::var( "AWS_EXECUTION_ENV" ).is_ok() ||
    env::var( "DYNO" ).is_ok() ||
    !cfg!( debug_assertions );

  if is_production
  {
    DeploymentMode::ProductionUnconfirmed
  }
  else
  {
    DeploymentMode::Pilot
  }
}

#[ tokio::main ]
async fn main() -> Result< (), Box< dyn std::error::Error > >
{
  let dotenv_result = dotenvy::dotenv();
  tracing_subscriber::fmt::init();

  match dotenv_result
  {
    Ok( path ) => tracing::debug!( "Loaded .env from: {:?}", path ),
    Err( _ ) => tracing::debug!( "No .env file loaded (not required)" ),
  }

  match detect_deployment_mode()
  {
    DeploymentMode::ProductionUnconfirmed =>
    {
      tracing::warn!( "Production environment detected but FINHOME_DEPLOYMENT_MODE not set" );
      tracing::warn!( "Set FINHOME_DEPLOYMENT_MODE=production to confirm production deployment" );
    }
    DeploymentMode::Production => tracing::info!( "Production mode confirmed" ),
    DeploymentMode::Development => tracing::info!( "Development mode" ),
    DeploymentMode::Pilot => tracing::info!( "Pilot mode (localhost only)" ),
  }

  let config_path = env::var( "FINHOME_CONFIG_PATH" ).ok().map( std::path::PathBuf::from );
  let settings = Settings::load( config_path )?;

  tracing::info!( "Initializing finhome API server..." );
  tracing::info!( "Database: {}", settings.database_url );

  // `busy_timeout` gives a concurrent `BEGIN IMMEDIATE` (see
  // `finhome_core::db::begin_immediate`) something to wait on instead of
  // failing `SQLITE_BUSY` immediately when another connection already
  // holds the write lock (`SPEC_FULL.md` §5).
  let connect_options = SqliteConnectOptions::from_str( &settings.database_url )?
    .busy_timeout( Duration::from_secs( 5 ) );

  let pool = SqlitePoolOptions::new()
    .max_connections( 5 )
    .connect_with( connect_options )
    .await?;

  apply_all_migrations( &pool ).await?;
  let seeded = seed_predefined_categories( &pool ).await?;
  tracing::info!( "Seeded {} predefined categories", seeded );

  let scheduler_tick = settings.scheduler_tick;
  RenewalScheduler::new( pool.clone() ).spawn( scheduler_tick );

  let bind_address = settings.bind_address.clone();
  let app_state = AppState::new( pool, settings );

  let app = Router::new()
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
    .with_state( app_state )
    .layer(
      CorsLayer::new()
        .allow_origin(
          [ "http://localhost:5173", "http://localhost:5174", "http://localhost:5175" ]
            .map( | o | o.parse::< axum::http::HeaderValue >().expect( "static origin parses" ) ),
        )
        .allow_methods( [ Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH ] )
        .allow_headers( [ header::CONTENT_TYPE, header::AUTHORIZATION ] ),
    );

  let addr: SocketAddr = bind_address.parse().unwrap_or_else( | _ | SocketAddr::from( ( [ 0, 0, 0, 0 ], 8080 ) ) );
  tracing::info!( "finhome API listening on http://{}", addr );

  let listener = tokio::net::TcpListener::bind( addr ).await?;
  axum::serve( listener, app ).await?;

  Ok( () )
}

#[ cfg( test ) ]
mod deployment_mode_tests
{
  use super::*;

  fn clear_production_env_vars()
  {
    env::remove_var( "FINHOME_DEPLOYMENT_MODE" );
    env::remove_var( "KUBERNETES_SERVICE_HOST" );
    env::remove_var( "AWS_EXECUTION_ENV" );
    env::remove_var( "DYNO" );
  }

  #[ test ]
  fn test_pilot_mode_default()
  {
    clear_production_env_vars();
    let mode = detect_deployment_mode();
    #[ cfg( debug_assertions ) ]
    assert!( matches!( mode, DeploymentMode::Pilot ) );
  }

  #[ test ]
  fn test_production_kubernetes_detection()
  {
    clear_production_env_vars();
    env::set_var( "KUBERNETES_SERVICE_HOST", "10.0.0.1" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::ProductionUnconfirmed ) );
    env::remove_var( "KUBERNETES_SERVICE_HOST" );
  }

  #[ test ]
  fn test_production_aws_detection()
  {
    clear_production_env_vars();
    env::set_var( "AWS_EXECUTION_ENV", "AWS_ECS_FARGATE" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::ProductionUnconfirmed ) );
    env::remove_var( "AWS_EXECUTION_ENV" );
  }

  #[ test ]
  fn test_production_heroku_detection()
  {
    clear_production_env_vars();
    env::set_var( "DYNO", "web.1" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::ProductionUnconfirmed ) );
    env::remove_var( "DYNO" );
  }

  #[ test ]
  fn test_explicit_production_mode()
  {
    clear_production_env_vars();
    env::set_var( "FINHOME_DEPLOYMENT_MODE", "production" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::Production ) );
    env::remove_var( "FINHOME_DEPLOYMENT_MODE" );
  }

  #[ test ]
  fn test_explicit_production_overrides_heuristics()
  {
    clear_production_env_vars();
    env::set_var( "KUBERNETES_SERVICE_HOST", "10.0.0.1" );
    env::set_var( "AWS_EXECUTION_ENV", "AWS_ECS_FARGATE" );
    env::set_var( "FINHOME_DEPLOYMENT_MODE", "production" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::Production ) );
    env::remove_var( "FINHOME_DEPLOYMENT_MODE" );
    env::remove_var( "KUBERNETES_SERVICE_HOST" );
    env::remove_var( "AWS_EXECUTION_ENV" );
  }

  #[ test ]
  fn test_multiple_production_indicators()
  {
    clear_production_env_vars();
    env::set_var( "KUBERNETES_SERVICE_HOST", "10.0.0.1" );
    env::set_var( "AWS_EXECUTION_ENV", "AWS_ECS_FARGATE" );
    env::set_var( "DYNO", "web.1" );
    let mode = detect_deployment_mode();
    assert!( matches!( mode, DeploymentMode::ProductionUnconfirmed ) );
    env::remove_var( "KUBERNETES_SERVICE_HOST" );
    env::remove_var( "AWS_EXECUTION_ENV" );
    env::remove_var( "DYNO" );
  }
}
