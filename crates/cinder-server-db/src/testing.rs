// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::pool::run_migrations;

/// In-memory pool with the schema applied.
///
/// An in-memory SQLite database lives and dies with its connection, so the
/// pool is pinned to a single connection that is never recycled.
pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}
