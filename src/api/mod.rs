//! Route handlers.
//!
//! Handlers run only after the admission pipeline has admitted,
//! authenticated and (where the route requires it) authorized the request.
//! They talk to collaborators exclusively through the store traits.

pub mod health;
pub mod movies;
pub mod notify;
pub mod tokens;
pub mod users;
