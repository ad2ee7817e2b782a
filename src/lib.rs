//! Playdeck Library
//!
//! This library exposes modules for integration testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ratelimit;
pub mod state;
pub mod test_utils;
pub mod upload;
