//! SQLite persistence
//!
//! Only the credential table lives here. Uploaded files are tracked on disk.
//! The pool is returned empty; `CredentialStore::initialize` creates the schema.

mod schema;
mod users;

pub use schema::*;
pub use users::*;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

use crate::error::Result;

const MAX_CONNECTIONS: u32 = 5;
/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the credential database, creating the file if it does not exist yet
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    Ok(pool)
}
