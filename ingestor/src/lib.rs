pub mod batching;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod mqtt;
pub mod rest;
pub mod store;
pub mod validate;
