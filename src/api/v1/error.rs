use crate::api::v1::handler::ApiResponse;
use crate::application_port::TokenError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let status = match err {
            ApiErrorCode::InvalidRequest | ApiErrorCode::InvalidCredential => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, status))
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::InvalidRequest,
            "Request body could not be parsed",
        ));
        Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled rejection: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Request could not be understood")]
    InvalidRequest,
    #[error("Refresh token is invalid, expired, or revoked")]
    InvalidCredential,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    /// Log the real cause, hand the caller an opaque marker. Store and
    /// signing failures must not be distinguishable from each other at the
    /// boundary.
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::InputMalformed => ApiErrorCode::InvalidRequest,
            TokenError::CredentialInvalid => ApiErrorCode::InvalidCredential,
            TokenError::Store(e) => ApiErrorCode::internal(e),
            TokenError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}
