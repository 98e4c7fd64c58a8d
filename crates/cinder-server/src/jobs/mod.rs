// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod secret_sweep;

pub use secret_sweep::{SecretSweepJob, SECRET_SWEEP_JOB_ID};
