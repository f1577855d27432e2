//! Domain services.
//!
//! Each operation is split in two: a pure `decide_*` function that takes the
//! loaded record, the caller's [`Session`](crate::session::Session) and the
//! clock reading and either refuses or returns the exact write to perform,
//! and a service method that loads, decides and applies that write.

pub mod events;
pub mod feedback;
pub mod lost_found;

pub use events::EventsService;
pub use feedback::FeedbackService;
pub use lost_found::LostFoundService;
