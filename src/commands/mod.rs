pub mod chat;
pub mod config;
pub mod threads;
pub mod tui;
