pub mod admin;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod message;
pub mod services;
pub mod session;
pub mod signals;
pub mod store;
pub mod transport;
