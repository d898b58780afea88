//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where callers create rows

pub mod event;
pub mod rsvp;
pub mod user;
