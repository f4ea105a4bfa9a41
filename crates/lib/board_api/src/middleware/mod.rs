//! Request guards: the token middleware and the extractors that run after it.

pub mod auth;
pub mod object;
