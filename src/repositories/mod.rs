//! Repositories module - Data access for every persisted entity
//!
//! Each repository wraps the shared SQLite pool and owns the SQL for one
//! aggregate. Queries are plain `sqlx::query`/`query_as` calls bound at
//! runtime; the schema lives in `migrations/` and is applied by [`pool::connect`].
//!
//! Timestamps are written as fixed-width RFC 3339 text (UTC, microseconds),
//! so ordering by the text column is ordering by time.

pub mod chat;
pub mod message;
pub mod pool;
pub mod profile;
pub mod traits;

pub use traits::{Create, Read};

pub use chat::ChatRepository;
pub use message::MessageRepository;
pub use pool::{connect, connect_in_memory};
pub use profile::{ConsumerRepository, FarmerRepository, ProfileRepository};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current time at the precision stored in the database
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn db_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
