//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or any Postgres executor) as the first argument.

pub mod event_repo;
pub mod rsvp_repo;
pub mod user_repo;

pub use event_repo::EventRepo;
pub use rsvp_repo::RsvpRepo;
pub use user_repo::UserRepo;
