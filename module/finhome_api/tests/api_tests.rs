//! HTTP-level integration tests driving the real `axum::Router` built by
//! `common::build_router`, exactly as a client would: JSON bodies, a
//! `Authorization: Bearer` header minted by `common::legacy_token`, and
//! real status codes decoded off the wire rather than repository-level
//! `Result`s.

mod common;

use axum::body::Body;
use axum::http::{ Request, StatusCode };
use http_body_util::BodyExt;
use serde_json::{ json, Value };
use tower::ServiceExt;

async fn body_json( response: axum::response::Response ) -> Value
{
  let bytes = response.into_body().collect().await.expect( "collect body" ).to_bytes();
  serde_json::from_slice( &bytes ).expect( "response body is JSON" )
}

#[ tokio::test ]
async fn unauthenticated_request_is_rejected()
{
  let pool = common::setup_pool().await;
  let app = common::build_router( pool );

  let response = app
    .oneshot( Request::builder().uri( "/transactions" ).body( Body::empty() ).expect( "request" ) )
    .await
    .expect( "response" );

  assert_eq!( response.status(), StatusCode::UNAUTHORIZED );
}

#[ tokio::test ]
async fn entry_create_and_get_round_trip_over_http()
{
  let pool = common::setup_pool().await;
  let user = common::create_user( &pool, "http-entry@example.com" ).await;
  let token = common::legacy_token( &user );
  let category_id = common::seed_category( &pool, "Groceries", "EXPENSE" ).await;
  let app = common::build_router( pool );

  let create_body = json!(
  {
    "category_id": category_id,
    "amount": "4250",
    "entry_type": "EXPENSE",
    "description": "Weekly shop",
    "date": "2026-01-05",
  } );

  let create_response = app.clone()
    .oneshot(
      Request::builder()
        .method( "POST" )
        .uri( "/transactions" )
        .header( "content-type", "application/json" )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::from( create_body.to_string() ) )
        .expect( "request" ),
    )
    .await
    .expect( "response" );

  assert_eq!( create_response.status(), StatusCode::CREATED );
  let created = body_json( create_response ).await;
  let entry_id = created[ "id" ].as_i64().expect( "entry id" );
  assert_eq!( created[ "amount" ], "4250.00" );

  let get_response = app
    .oneshot(
      Request::builder()
        .uri( format!( "/transactions/{entry_id}" ) )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::empty() )
        .expect( "request" ),
    )
    .await
    .expect( "response" );

  assert_eq!( get_response.status(), StatusCode::OK );
  let fetched = body_json( get_response ).await;
  assert_eq!( fetched[ "id" ], entry_id );
  assert_eq!( fetched[ "description" ], "Weekly shop" );
}

#[ tokio::test ]
async fn entry_owned_by_another_user_is_forbidden_not_not_found()
{
  let pool = common::setup_pool().await;
  let owner = common::create_user( &pool, "owner@example.com" ).await;
  let intruder = common::create_user( &pool, "intruder@example.com" ).await;
  let intruder_token = common::legacy_token( &intruder );
  let category_id = common::seed_category( &pool, "Salary", "INCOME" ).await;
  let owner_token = common::legacy_token( &owner );
  let app = common::build_router( pool );

  let create_body = json!(
  {
    "category_id": category_id,
    "amount": "500000",
    "entry_type": "INCOME",
    "description": null,
    "date": "2026-01-01",
  } );

  let create_response = app.clone()
    .oneshot(
      Request::builder()
        .method( "POST" )
        .uri( "/transactions" )
        .header( "content-type", "application/json" )
        .header( "authorization", format!( "Bearer {owner_token}" ) )
        .body( Body::from( create_body.to_string() ) )
        .expect( "request" ),
    )
    .await
    .expect( "response" );
  assert_eq!( create_response.status(), StatusCode::CREATED );
  let created = body_json( create_response ).await;
  let entry_id = created[ "id" ].as_i64().expect( "entry id" );

  let intruder_response = app
    .oneshot(
      Request::builder()
        .uri( format!( "/transactions/{entry_id}" ) )
        .header( "authorization", format!( "Bearer {intruder_token}" ) )
        .body( Body::empty() )
        .expect( "request" ),
    )
    .await
    .expect( "response" );

  assert_eq!( intruder_response.status(), StatusCode::FORBIDDEN );
}

#[ tokio::test ]
async fn budget_create_list_and_deactivate_round_trip_over_http()
{
  let pool = common::setup_pool().await;
  let user = common::create_user( &pool, "budgeter@example.com" ).await;
  let token = common::legacy_token( &user );
  let category_id = common::seed_category( &pool, "Dining", "EXPENSE" ).await;
  let app = common::build_router( pool );

  let create_body = json!(
  {
    "category_id": category_id,
    "cap_amount": "300000",
    "start_date": "2026-01-01",
    "end_date": "2026-01-31",
    "frequency": "MONTHLY",
    "auto_renew": false,
  } );

  let create_response = app.clone()
    .oneshot(
      Request::builder()
        .method( "POST" )
        .uri( "/budgets" )
        .header( "content-type", "application/json" )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::from( create_body.to_string() ) )
        .expect( "request" ),
    )
    .await
    .expect( "response" );
  assert_eq!( create_response.status(), StatusCode::CREATED );
  let created = body_json( create_response ).await;
  let public_id = created[ "public_uuid" ].as_str().expect( "budget public_uuid" ).to_string();

  let list_response = app.clone()
    .oneshot(
      Request::builder()
        .uri( "/budgets" )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::empty() )
        .expect( "request" ),
    )
    .await
    .expect( "response" );
  assert_eq!( list_response.status(), StatusCode::OK );
  let listed = body_json( list_response ).await;
  assert_eq!( listed.as_array().expect( "array" ).len(), 1 );

  let delete_response = app
    .oneshot(
      Request::builder()
        .method( "DELETE" )
        .uri( format!( "/budgets/{public_id}" ) )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::empty() )
        .expect( "request" ),
    )
    .await
    .expect( "response" );
  assert_eq!( delete_response.status(), StatusCode::NO_CONTENT );
}

#[ tokio::test ]
async fn malformed_json_body_returns_structured_bad_request()
{
  let pool = common::setup_pool().await;
  let user = common::create_user( &pool, "malformed@example.com" ).await;
  let token = common::legacy_token( &user );
  let app = common::build_router( pool );

  let response = app
    .oneshot(
      Request::builder()
        .method( "POST" )
        .uri( "/transactions" )
        .header( "content-type", "application/json" )
        .header( "authorization", format!( "Bearer {token}" ) )
        .body( Body::from( "{ not json" ) )
        .expect( "request" ),
    )
    .await
    .expect( "response" );

  assert_eq!( response.status(), StatusCode::BAD_REQUEST );
  let payload = body_json( response ).await;
  assert_eq!( payload[ "code" ], "MALFORMED_JSON" );
}
