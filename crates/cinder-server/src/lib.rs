// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Burn-after-read secret sharing server.
//!
//! This crate maps the secret lifecycle onto HTTP. The server only ever sees
//! encrypted envelopes; keys stay with the clients.

pub mod api;
pub mod api_docs;
pub mod error;
pub mod health;
pub mod jobs;
pub mod routes;
pub mod storage;

pub use api::{create_app_state, create_router, policy_from_config, AppState};
pub use api_docs::ApiDoc;
pub use cinder_server_config::ServerConfig;
pub use error::ServerError;
pub use storage::open_store;
