//! # Postgres
//!
//! All durable state lives in three tables, created by
//! `scripts/01_create_tables.sql`:
//!
//! - `registrations`: pending team submissions, `members` as a JSONB array
//! - `approved_members`: registrations promoted by an admin, stamped with
//!   `approved_at`
//! - `settings`: key/value rows of editable event metadata, values as JSONB
//!   so a fee can be numeric while the rest stay strings
//!
//! Queries run through a shared [`sqlx::PgPool`]. No retries: a failed call
//! surfaces straight back to the request that issued it.
use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

pub async fn init_postgres(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .unwrap()
}
