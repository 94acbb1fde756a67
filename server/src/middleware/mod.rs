//! Request extractors and middleware

pub mod auth;
