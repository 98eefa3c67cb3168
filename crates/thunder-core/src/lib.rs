//! Thunder Core - shared types and the backend boundary
//!
//! This crate provides the fundamental types that every other Thunder crate
//! depends on:
//!
//! - `Backend` - Trait for the service that executes schema reads and staged edits
//! - `Envelope` - Uniform `{data, errors}` response wrapper returned by the backend
//! - Row, column, index and create-table draft models
//! - `ThunderError` - Core error taxonomy
//! - `TabId` and `RequestToken` - identities used to scope edit sessions and
//!   detect stale responses

mod backend;
mod draft;
mod envelope;
mod error;
mod ids;
mod row;
mod schema;

pub use backend::*;
pub use draft::*;
pub use envelope::*;
pub use error::*;
pub use ids::*;
pub use row::*;
pub use schema::*;
