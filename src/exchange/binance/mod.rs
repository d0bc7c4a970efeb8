//! Binance spot exchange integration.

mod client;
pub mod models;

pub use client::{BinanceClient, DEFAULT_BASE_URL};
