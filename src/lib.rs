pub mod api;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod estimation;
pub mod history;
pub mod lightning;
pub mod monitor;
pub mod notify;
pub mod ranking;
pub mod scheduler;
pub mod source;
pub mod state;
