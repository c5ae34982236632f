//! Infrastructure adapters. Implement outbound ports.
//!
//! Storefront HTTP, exchange rates, caches, terminal UI. Map errors to DomainError.

pub mod access;
pub mod persistence;
pub mod rates;
pub mod storefront;
pub mod ui;
