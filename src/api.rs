//! Clients of remote services.

pub mod atproto;
