//! API route handlers

pub mod history;
pub mod session;
