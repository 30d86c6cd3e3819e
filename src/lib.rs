// src/lib.rs

//! Depth-limited link graph crawler library

pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
