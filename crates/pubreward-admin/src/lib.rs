// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing surface: the admin service, the bounded background task
//! pool it hands long-running ledger work to, and the REST API.

pub mod pool;
pub mod router;
pub mod service;

pub use pool::TaskPool;
pub use router::{ApiResponse, build_router, serve};
pub use service::{AdminService, Whoami};
