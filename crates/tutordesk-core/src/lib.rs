pub mod analytics;
pub mod availability;
pub mod calendar;
pub mod config;
pub mod error;
pub mod grid;
pub mod history;
pub mod model;
pub mod profile;
pub mod remote;
pub mod retry;
pub mod sessions;
pub mod storage;
