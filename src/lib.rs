// Public API for integration tests and potential library usage

pub mod abuse;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod consensus;
pub mod error;
pub mod protocol;
pub mod room_id;
pub mod state;
pub mod types;
pub mod ws;
