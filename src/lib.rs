// src/lib.rs

//! lotwatch library: polls paginated catalog APIs and reports new
//! listings and price changes against the previous snapshot.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
