//! Todo REST API library.
//!
//! This module exports the core components for testing and integration.

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod http;
pub mod service;
pub mod types;
