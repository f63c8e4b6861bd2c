pub mod api;
pub mod config;
pub mod content;
pub mod models;
pub mod needs;
pub mod performance;
