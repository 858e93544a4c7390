//! Payrail - Payment reconciliation service for subscription checkout
//!
//! This library provides the core functionality for the Payrail billing
//! service, including database operations, Midtrans gateway integration,
//! webhook verification, and API handlers.

pub mod config;
pub mod correlation;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod id;
pub mod models;
pub mod pricing;
pub mod status;
pub mod subscription;
