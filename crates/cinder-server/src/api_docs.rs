// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenAPI documentation for cinder-server, served at `/api/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cinder Server API",
        version = "1.0.0",
        description = "Burn-after-read secret sharing. The server stores encrypted envelopes only; keys never leave the client.",
        license(name = "Proprietary")
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    tags(
        (name = "secrets", description = "Create, inspect, read and delete secrets"),
        (name = "health", description = "Health checks")
    ),
    paths(
        crate::routes::secrets::create_secret,
        crate::routes::secrets::get_secret_metadata,
        crate::routes::secrets::read_secret,
        crate::routes::secrets::delete_secret,
        crate::routes::health::health_check,
    ),
    components(schemas(
        cinder_server_api::BurnModeApi,
        cinder_server_api::CreateSecretRequest,
        cinder_server_api::CreateSecretResponse,
        cinder_server_api::SecretMetadataResponse,
        cinder_server_api::SecretResponse,
        cinder_server_api::ErrorResponse,
        cinder_server_api::HealthResponse,
        cinder_server_api::HealthStatus,
        cinder_server_api::StorageHealth,
        cinder_server_api::JobInfo,
        cinder_server_api::LastRunInfo,
    ))
)]
pub struct ApiDoc;
