#![allow(dead_code)]

pub mod bank;
pub mod config;
pub mod logging;
pub mod progress;
pub mod response;
pub mod routes;
pub mod scoring;
pub mod session;
pub mod state;
pub mod sync;
pub mod transport;
pub mod workers;
