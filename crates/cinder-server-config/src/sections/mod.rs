// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod http;
mod jobs;
mod logging;
mod policy;
mod storage;

pub use http::{HttpConfig, HttpConfigLayer};
pub use jobs::{JobsConfig, JobsConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use policy::{PolicyConfigLayer, SecretPolicyConfig};
pub use storage::{StorageBackend, StorageConfig, StorageConfigLayer};
