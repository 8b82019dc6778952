//! Request middleware and extractors

pub mod cors;
pub mod identity;
pub mod session;
