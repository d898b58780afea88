//! Campus core: shared types, error taxonomy, and the RSVP domain.
//!
//! This crate has no database or HTTP dependencies so the RSVP manager can be
//! driven by any store implementing [`rsvp::RsvpStore`].

pub mod error;
pub mod events;
pub mod pagination;
pub mod retry;
pub mod roles;
pub mod rsvp;
pub mod types;
