//! Core types, decision rules and services for KLH Connect.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store is reached only through the traits in [`store`]; the SQLite backend
//! and the JSON API live in their own crates.

// Native `async fn` in traits; the store traits spell out `Send` futures
// explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod event;
pub mod item;
pub mod live;
pub mod service;
pub mod session;
pub mod store;

pub use error::{Error, Result};
