pub mod aggregate;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod load;
pub mod server;
