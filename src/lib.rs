pub mod campaigns;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;
