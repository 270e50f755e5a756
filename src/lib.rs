//! Upload Portal
//!
//! A small password-protected file drop: log in with an account from the
//! SQLite `users` table, then upload files into a fixed directory.
//!
//! # Modules
//!
//! - `auth`: Argon2 credential checks and signed-cookie sessions
//! - `storage`: the upload directory and file name sanitizing
//! - `routes`: the HTML pages and the health check
//! - `state`: shared state wired up at startup

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod templates;
