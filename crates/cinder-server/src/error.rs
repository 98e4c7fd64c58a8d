// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use cinder_server_api::ErrorResponse;
use cinder_server_db::DbError;
use cinder_server_secrets::{SecretsError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Secrets(#[from] SecretsError),

	/// Request body was not acceptable JSON. Keeps the rejection's status.
	#[error("Invalid request body: {0}")]
	Json(#[from] JsonRejection),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Storage error: {0}")]
	Store(#[from] StoreError),

	#[error("Invalid policy: {0}")]
	Policy(String),
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::Secrets(e) => {
				if e.is_internal() {
					tracing::error!(error = %e, kind = %e.kind(), "request failed");
				}
				let status =
					StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
				(status, ErrorResponse::from_secrets_error(e))
			}
			ServerError::Json(rejection) => {
				let status = rejection.status();
				let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
					"size_limit"
				} else {
					"bad_request"
				};
				(status, ErrorResponse::new(kind, rejection.body_text()))
			}
			ServerError::Db(_)
			| ServerError::Store(_)
			| ServerError::Policy(_) => {
				tracing::error!(error = %self, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
		};

		(status, Json(body)).into_response()
	}
}
