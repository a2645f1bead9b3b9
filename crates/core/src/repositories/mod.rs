//! Services over the consultation store.
//!
//! - [`consultations`]: booking, listing, changing and deleting consultations
//! - [`registry`]: registering the patients and practitioners consultations refer to

pub mod consultations;
pub mod registry;
