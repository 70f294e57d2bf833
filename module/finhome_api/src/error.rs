//! Custom error types and JSON error responses for the API
//!
//! All API errors return the same envelope:
//! ```json
//! {"error": "description", "code": "ERROR_CODE", "details": "optional details"}
//! ```

use axum::
{
  http::StatusCode,
  response::{ IntoResponse, Response },
  Json,
};
use finhome_core::error::AppError;
use serde::Serialize;

/// Standard JSON error response envelope.
#[ derive( Serialize ) ]
pub struct ErrorResponse
{
  pub error: String,
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub code: Option< String >,
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub details: Option< String >,
}

impl ErrorResponse
{
  /// Create error response with just a message
  pub fn new( error: impl Into< String > ) -> Self
  {
    Self { error: error.into(), code: None, details: None }
  }

  /// Create error response with code
  pub fn with_code( error: impl Into< String >, code: impl Into< String > ) -> Self
  {
    Self { error: error.into(), code: Some( code.into() ), details: None }
  }

  /// Create full error response with all fields
  pub fn with_details( error: impl Into< String >, code: impl Into< String >, details: impl Into< String > ) -> Self
  {
    Self { error: error.into(), code: Some( code.into() ), details: Some( details.into() ) }
  }
}

impl IntoResponse for ErrorResponse
{
  fn into_response( self ) -> Response
  {
    ( StatusCode::BAD_REQUEST, Json( self ) ).into_response()
  }
}

/// Wraps [`finhome_core::error::AppError`] so it can carry an `IntoResponse`
/// impl here, the only crate that knows about HTTP status codes
/// (`SPEC_FULL.md` §7). The status mapping is the taxonomy's one fixed
/// point: every handler returns `Result<T, ApiError>` and this is the only
/// place that decides what a `StateConflict` or a `Forbidden` means on the
/// wire.
pub struct ApiError( pub AppError );

impl From< AppError > for ApiError
{
  fn from( error: AppError ) -> Self
  {
    Self( error )
  }
}

impl IntoResponse for ApiError
{
  fn into_response( self ) -> Response
  {
    let ( status, code ) = match &self.0
    {
      AppError::AuthInvalid => ( StatusCode::UNAUTHORIZED, "AUTH_INVALID" ),
      AppError::AuthUserInactive => ( StatusCode::UNAUTHORIZED, "AUTH_USER_INACTIVE" ),
      AppError::Forbidden => ( StatusCode::FORBIDDEN, "FORBIDDEN" ),
      AppError::NotFound => ( StatusCode::NOT_FOUND, "NOT_FOUND" ),
      AppError::Validation( _ ) => ( StatusCode::BAD_REQUEST, "VALIDATION" ),
      AppError::StateConflict( _ ) => ( StatusCode::CONFLICT, "STATE_CONFLICT" ),
      AppError::Internal( _ ) =>
      {
        tracing::error!( error = %self.0, "internal error" );
        ( StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL" )
      }
    };

    // Unexpected failures never leak their cause; everything else is
    // surfaced verbatim (`SPEC_FULL.md` §7 propagation policy).
    let message = if matches!( self.0, AppError::Internal( _ ) )
    {
      "internal error".to_string()
    }
    else
    {
      self.0.to_string()
    };

    ( status, Json( ErrorResponse::with_code( message, code ) ) ).into_response()
  }
}

/// Custom extractor wrapper that provides JSON error responses for Path
/// parameter failures instead of axum's default plain-text rejection.
pub struct JsonPath< T >( pub T );

#[ async_trait::async_trait ]
impl< T, S > axum::extract::FromRequestParts< S > for JsonPath< T >
where
  T: serde::de::DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ErrorResponse;

  async fn from_request_parts( parts: &mut axum::http::request::Parts, state: &S ) -> Result< Self, Self::Rejection >
  {
    match axum::extract::Path::< T >::from_request_parts( parts, state ).await
    {
      Ok( value ) => Ok( Self( value.0 ) ),
      Err( rejection ) =>
      {
        let error_msg = rejection.to_string();
        if error_msg.contains( "Cannot parse" )
        {
          Err( ErrorResponse::with_code( "Invalid path parameter", "INVALID_PARAMETER" ) )
        }
        else
        {
          Err( ErrorResponse::new( error_msg ) )
        }
      }
    }
  }
}

/// Custom extractor wrapper that converts axum's 422 JSON-body rejections
/// into the same 400 `{error, code, details}` envelope every other error
/// on this API uses.
pub struct JsonBody< T >( pub T );

#[ async_trait::async_trait ]
impl< T, S > axum::extract::FromRequest< S > for JsonBody< T >
where
  T: serde::de::DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ( StatusCode, Json< ErrorResponse > );

  async fn from_request( req: axum::http::Request< axum::body::Body >, state: &S ) -> Result< Self, Self::Rejection >
  {
    match axum::Json::< T >::from_request( req, state ).await
    {
      Ok( value ) => Ok( Self( value.0 ) ),
      Err( rejection ) =>
      {
        let error_msg = rejection.to_string();

        let error_response = if error_msg.contains( "missing field" )
        {
          ErrorResponse::with_code( format!( "Missing required field: {error_msg}" ), "MISSING_FIELD" )
        }
        else if error_msg.contains( "invalid type" ) || error_msg.contains( "expected" )
        {
          ErrorResponse::with_code( "Invalid JSON: type mismatch or malformed structure", "INVALID_JSON" )
        }
        else
        {
          ErrorResponse::with_code( "Malformed JSON request body", "MALFORMED_JSON" )
        };

        Err( ( StatusCode::BAD_REQUEST, Json( error_response ) ) )
      }
    }
  }
}
