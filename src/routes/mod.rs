//! Handlers behind [`crate::handle_request`]. Each returns a JSON string.

pub mod persist;
pub mod share;
pub mod util;
pub mod worker;
