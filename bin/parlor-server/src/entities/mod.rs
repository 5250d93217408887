//! Database abstraction layer.
//!
//! [`ConversationStore`] and [`MessageStore`] define the persistence
//! interface; the default implementation is [`SqliteStore`].  To swap to
//! another database, implement both traits for a new type and change the
//! concrete type in [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since
//! Rust 1.75) so no extra `async-trait` crate is required here.

pub mod conversation;
pub mod dao;
pub mod message;

pub use conversation::{ConversationPreview, ConversationStore};
pub use dao::{Conversation, Message};
pub use message::MessageStore;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

/// SQLite-backed conversation store.
///
/// # Migrations path
///
/// `sqlx::migrate!("./migrations")` resolves the path **at compile time**
/// relative to `CARGO_MANIFEST_DIR` (the crate root), so the directory is
/// embedded into the binary.  The database file location is determined at
/// runtime by the `PARLOR_DATABASE_URL` environment variable.
///
/// # Queries
///
/// The `sqlx::query` (runtime-verified) form is used deliberately so that no
/// `DATABASE_URL` environment variable is needed at compile time.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending
    /// migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://parlor.db"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with migrations applied.
    ///
    /// The pool is pinned to a single connection; with more, each pool
    /// connection would see its own empty `:memory:` database.
    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        use sqlx::sqlite::SqlitePoolOptions;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}
