// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("Job failed: {message}")]
	Failed { message: String, retryable: bool },

	#[error("Job cancelled")]
	Cancelled,

	#[error("Job not found: {0}")]
	NotFound(String),
}

impl JobError {
	pub fn failed(message: impl Into<String>) -> Self {
		JobError::Failed {
			message: message.into(),
			retryable: false,
		}
	}

	pub fn retryable(message: impl Into<String>) -> Self {
		JobError::Failed {
			message: message.into(),
			retryable: true,
		}
	}
}

pub type Result<T> = std::result::Result<T, JobError>;
