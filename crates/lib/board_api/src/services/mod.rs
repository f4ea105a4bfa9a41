//! Request flows that span several core calls.

pub mod auth;
pub mod wx;
