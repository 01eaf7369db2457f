pub mod config;
pub mod engine;
pub mod logging;
pub mod manager;
pub mod model;
pub mod storage;
pub mod store;
