#![warn(missing_docs)]
//! pollwatch watches external listings and booking calendars, reconciles
//! each fresh snapshot against persisted alert state, and emails the
//! changes.

pub mod cmd;
pub mod config;
pub mod engine;
pub mod http_client;
pub mod http_server;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod providers;
pub mod runner;
pub mod supervisor;
pub mod test_helpers;
