pub mod event;
pub mod rsvp;
