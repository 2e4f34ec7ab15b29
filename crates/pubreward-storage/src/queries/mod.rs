// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules.
//!
//! Every function is synchronous over a `&rusqlite::Connection` so the same
//! statement serves both a standalone call and a batch transaction
//! (`Transaction` derefs to `Connection`).

pub mod batch;
pub mod blacklist;
pub mod bonus;
pub mod checkpoint;
pub mod messages;
pub mod profiles;
pub mod sensitive;
pub mod stats;
pub mod tallies;
pub mod tasks;
pub mod violations;

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    /// In-memory connection with the full schema applied.
    pub fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&mut conn).unwrap();
        conn
    }
}
