//! API handlers for the SDC backend

pub mod admin;
pub mod agencies;
pub mod auth;
pub mod badges;
pub mod contracts;
pub mod disputes;
pub mod favorites;
pub mod kyc;
pub mod marketplace;
pub mod messages;
pub mod notifications;
pub mod users;
pub mod wallet;

// Re-export the auth extractors for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, OptionalUser};
