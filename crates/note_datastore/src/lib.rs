//! # DataStore Module
//!
//! Persists the association between a source video and the note-generation
//! task that produced a note for it. The pipeline writes one row per finished
//! task, and the request layer consults the latest row for a
//! `(video_id, platform)` pair to refuse duplicate submissions.
//!
//! The module uses sqlx for database operations and exposes a small trait so
//! the pipeline can be exercised against in-memory stores in tests.

mod datastore;
mod domain;

pub use datastore::postgres::PgDataStore;
pub use datastore::DataStore;
pub use domain::VideoTask;
