//! Decision oracle client

pub mod client;
pub mod messages;

pub use client::HttpOracleClient;
