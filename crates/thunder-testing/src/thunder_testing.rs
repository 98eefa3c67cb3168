//! Thunder test support
//!
//! `MockBackend` stands in for the external backend service: it keeps an
//! in-memory catalog, counts calls per operation, can be scripted to fail,
//! and can hold a call open on a `Notify` gate to exercise re-entrancy guards.

mod fixtures;
mod mock;

pub use fixtures::{connection, init_test_logging, row, sample_backend};
pub use mock::{MockBackend, Op, RecordedCall};
