//! Postgres persistence for live and historical disaster events.
//!
//! Knows nothing about feeds or classification. Matching predicates use the
//! shared rules in `disaster_common::matching` so every store agrees on what
//! "same cluster" and "duplicate" mean.

pub mod migrate;
pub mod rows;
pub mod store;

pub use migrate::migrate;
pub use store::PgDisasterStore;
