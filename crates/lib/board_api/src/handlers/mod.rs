//! HTTP request handlers.

pub mod auth;
pub mod servers;
pub mod users;
pub mod wx;
