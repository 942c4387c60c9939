// src/error.rs
use log::error;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the portfolio service surfaces to a caller.
///
/// Each variant carries a stable [`kind`](Error::kind) tag so clients can
/// branch on the failure without parsing messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Missing or invalid input supplied by the caller.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No record matching the caller's identity and the requested id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Per-symbol info was requested for a symbol the caller does not hold.
    #[error("Symbol {0} is not in the portfolio")]
    NotInPortfolio(String),

    /// The provider answered, but without a usable price.
    #[error("Quote unavailable for {0}")]
    QuoteUnavailable(String),

    /// The provider could not be reached or refused the request.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotInPortfolio(_) => "NOT_IN_PORTFOLIO",
            Self::QuoteUnavailable(_) => "QUOTE_UNAVAILABLE",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::NotInPortfolio(_) => StatusCode::NOT_FOUND,
            Self::QuoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures of the external quote feed.
    pub fn is_quote_failure(&self) -> bool {
        matches!(self, Self::QuoteUnavailable(_) | Self::Provider(_))
    }
}

impl Reject for Error {}

/// Wraps any storage driver error as an internal failure.
pub fn db_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Internal(format!("database: {}", e))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    kind: &'a str,
}

fn error_reply(status: StatusCode, kind: &str, message: String) -> warp::reply::Response {
    let body = warp::reply::json(&ErrorBody {
        error: message,
        kind,
    });
    warp::reply::with_status(body, status).into_response()
}

pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    if let Some(e) = err.find::<Error>() {
        let message = match e {
            Error::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        return Ok(error_reply(e.status(), e.kind(), message));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Invalid request body: {}", e),
        ));
    }

    if err.is_not_found() {
        return Ok(error_reply(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Route not found".to_string(),
        ));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            "Method not allowed".to_string(),
        ));
    }

    error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal server error".to_string(),
    ))
}
