// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ready-made host adapters.
//!
//! - [`memory`]: an in-memory host tree with an operation log, for tests, benches, and headless
//!   rendering.

pub mod memory;
