//! Window Stats Library
//!
//! Real-time count/sum/avg/min/max over a trailing window of transactions.
//! The `window` module is the aggregation core; the rest wires it to HTTP.

pub mod admission;
pub mod api;
pub mod config;
pub mod middleware;
pub mod models;
pub mod service;
pub mod window;

pub use config::Config;
pub use service::{StatisticsService, TransactionStatus};
