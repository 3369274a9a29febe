pub mod api;
pub mod app;
pub mod client;
pub mod commands;
pub mod config;
pub mod csrf;
pub mod errors;
pub mod logging;
pub mod markdown;
pub mod models;
pub mod output;
pub mod parse;
pub mod tui;
