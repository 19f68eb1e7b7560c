//! RefundGuard - policy-driven refund automation for Whop storefronts
//!
//! This library provides the core functionality for the RefundGuard service:
//! the policy evaluator, token lifecycle management, the retrying payment
//! gateway client, the refund orchestrator, and the HTTP API handlers.

pub mod config;
pub mod db;
pub mod demo;
pub mod email;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod session;
pub mod token;
pub mod transport;
