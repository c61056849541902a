//! GDS-Connect user profile service.
//!
//! User profiles live in a MongoDB `users` collection. The HTTP API under
//! `/api` lists, reads and creates users, finds users with overlapping
//! interests, and manages who a user is visible to.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod store;
pub mod users;
