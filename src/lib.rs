//! RunaMitra Record Store Library
//!
//! This library exports the core modules of the offline-first record
//! store behind the RunaMitra loan app: local persistence, domain
//! models, the opportunistic sync engine, and the HTTP/WebSocket surface
//! the UI talks to.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod notification;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync;
pub mod websocket;
