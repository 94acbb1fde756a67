//! SDC backend library
//!
//! Exposes the service modules and the HTTP router so the binary and the
//! integration tests build the same application.

pub mod accounts;
pub mod agencies;
pub mod app_state;
pub mod auth;
pub mod badges;
pub mod config;
pub mod contracts;
pub mod disputes;
pub mod error;
pub mod extract;
pub mod favorites;
pub mod handlers;
pub mod jobs;
pub mod kyc;
pub mod marketplace;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod reports;
pub mod routes;
pub mod uploads;
pub mod wallet;
pub mod websocket;
