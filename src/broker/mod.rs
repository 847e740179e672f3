//! Brokerage module - REST gateway client implementing `Brokerage`

pub mod messages;
pub mod rest;

pub use rest::BrokerRestClient;
