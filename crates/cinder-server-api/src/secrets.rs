// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use cinder_server_secrets::{BurnMode, Secret, SecretMetadata, SecretsError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Read policy as sent over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BurnModeApi {
	Unlimited,
	#[default]
	Burn,
	SlowBurn { reads: u32 },
}

impl From<BurnModeApi> for BurnMode {
	fn from(mode: BurnModeApi) -> Self {
		match mode {
			BurnModeApi::Unlimited => BurnMode::Unlimited,
			BurnModeApi::Burn => BurnMode::Burn,
			BurnModeApi::SlowBurn { reads } => BurnMode::SlowBurn(reads),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateSecretRequest {
	/// Envelope wire string, `cinder://?...#...`.
	pub envelope: String,
	#[serde(default)]
	pub attachments: Vec<String>,
	/// One of the server's allow-listed durations, e.g. `"1d"`.
	pub duration: String,
	#[serde(default)]
	pub burn_mode: BurnModeApi,
	#[serde(default)]
	pub password_protected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateSecretResponse {
	pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SecretMetadataResponse {
	pub id: String,
	pub password_protected: bool,
	/// Reads left before deletion; `null` when only expiry applies.
	pub remaining_reads: Option<u32>,
	pub attachment_count: usize,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl From<SecretMetadata> for SecretMetadataResponse {
	fn from(metadata: SecretMetadata) -> Self {
		Self {
			id: metadata.id.to_string(),
			password_protected: metadata.password_protected,
			remaining_reads: remaining_reads(metadata.remaining_reads),
			attachment_count: metadata.attachment_count,
			created_at: metadata.created_at,
			expires_at: metadata.expires_at,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SecretResponse {
	pub id: String,
	pub envelope: String,
	pub attachments: Vec<String>,
	pub password_protected: bool,
	pub remaining_reads: Option<u32>,
	pub expires_at: DateTime<Utc>,
}

impl From<Secret> for SecretResponse {
	fn from(secret: Secret) -> Self {
		Self {
			id: secret.id.to_string(),
			envelope: secret.envelope.encode(),
			attachments: secret.attachments.iter().map(|a| a.encode()).collect(),
			password_protected: secret.password_protected,
			remaining_reads: remaining_reads(secret.remaining_reads),
			expires_at: secret.expires_at,
		}
	}
}

fn remaining_reads(stored: i64) -> Option<u32> {
	u32::try_from(stored).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ErrorResponse {
	/// Stable error kind, e.g. `not_found`.
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}

	/// Client-safe rendering. Internal errors lose their detail.
	pub fn from_secrets_error(err: &SecretsError) -> Self {
		let message = if err.is_internal() {
			"storage temporarily unavailable, try again later".to_string()
		} else {
			err.to_string()
		};
		Self::new(err.kind().as_str(), message)
	}
}
