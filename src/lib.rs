pub mod cache;
pub mod checks;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gtfs_static;
pub mod infra;
pub mod metrics;
pub mod parser;
pub mod server;
pub mod services;

pub use error::{Result, WatchdogError};

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
