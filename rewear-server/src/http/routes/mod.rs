//! Route handlers organized by resource

pub mod admin;
pub mod auth;
pub mod health;
pub mod items;
pub mod swaps;
pub mod transactions;
