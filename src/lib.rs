pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod launch;
pub mod location;
pub mod logging;
pub mod models;
pub mod session;
pub mod tracker;
pub mod ui;
