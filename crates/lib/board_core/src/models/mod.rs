//! Domain models.
//!
//! Each entity has a row type (what the store reads back), a public view
//! (what the API serializes, never containing secrets), an input type
//! (optional fields as received) and a validated `New*` type that the store
//! writes.

pub mod server;
pub mod user;
