// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret HTTP handlers.
//!
//! Ids that do not parse are answered exactly like ids that do not exist.

use axum::{
	extract::{rejection::JsonRejection, Path, State},
	http::{header, StatusCode},
	response::IntoResponse,
	Json,
};
use cinder_server_api::{
	CreateSecretRequest, CreateSecretResponse, ErrorResponse, SecretMetadataResponse, SecretResponse,
};
use cinder_server_secrets::{SecretId, SecretsError, Submission};

use crate::{api::AppState, error::ServerError};

const NO_STORE: &str = "no-store";

fn parse_id(raw: &str) -> Result<SecretId, ServerError> {
	raw.parse().map_err(|_| ServerError::Secrets(SecretsError::NotFound))
}

#[utoipa::path(
    post,
    path = "/secret",
    request_body = CreateSecretRequest,
    responses(
        (status = 201, description = "Secret stored", body = CreateSecretResponse),
        (status = 400, description = "Malformed envelope or policy violation", body = ErrorResponse),
        (status = 413, description = "Secret exceeds the size limit", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    ),
    tag = "secrets"
)]
/// POST /secret - Store an encrypted envelope.
#[tracing::instrument(skip(state, payload))]
pub async fn create_secret(
	State(state): State<AppState>,
	payload: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let Json(request) = payload?;
	tracing::debug!(
		duration = %request.duration,
		attachments = request.attachments.len(),
		"create secret request"
	);

	let submission = Submission::parse(
		&request.envelope,
		&request.attachments,
		request.duration,
		request.burn_mode.into(),
		request.password_protected,
	)?;
	let id = state.manager.submit(submission).await?;

	Ok((
		StatusCode::CREATED,
		Json(CreateSecretResponse { id: id.to_string() }),
	))
}

#[utoipa::path(
    get,
    path = "/secret/{id}",
    params(
        ("id" = String, Path, description = "Secret ID")
    ),
    responses(
        (status = 200, description = "Secret metadata; does not consume a read", body = SecretMetadataResponse),
        (status = 404, description = "Unknown, expired or exhausted", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    ),
    tag = "secrets"
)]
/// GET /secret/{id} - Metadata probe.
#[tracing::instrument(skip(state))]
pub async fn get_secret_metadata(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let id = parse_id(&id)?;
	let metadata = state.manager.get_metadata(id).await?;
	Ok((
		[(header::CACHE_CONTROL, NO_STORE)],
		Json(SecretMetadataResponse::from(metadata)),
	))
}

#[utoipa::path(
    post,
    path = "/secret/{id}",
    params(
        ("id" = String, Path, description = "Secret ID")
    ),
    responses(
        (status = 200, description = "Envelope; consumes one read", body = SecretResponse),
        (status = 404, description = "Unknown, expired or exhausted", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    ),
    tag = "secrets"
)]
/// POST /secret/{id} - Read a secret. A POST so that link previews and
/// prefetchers never burn it.
#[tracing::instrument(skip(state))]
pub async fn read_secret(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let id = parse_id(&id)?;
	let secret = state.manager.read(id).await?;
	Ok((
		[(header::CACHE_CONTROL, NO_STORE)],
		Json(SecretResponse::from(secret)),
	))
}

#[utoipa::path(
    delete,
    path = "/secret/{id}",
    params(
        ("id" = String, Path, description = "Secret ID")
    ),
    responses(
        (status = 204, description = "Secret deleted"),
        (status = 404, description = "Unknown, expired or exhausted", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    ),
    tag = "secrets"
)]
/// DELETE /secret/{id} - Delete a secret before it is read.
#[tracing::instrument(skip(state))]
pub async fn delete_secret(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
	let id = parse_id(&id)?;
	state.manager.delete(id).await?;
	Ok(StatusCode::NO_CONTENT)
}
