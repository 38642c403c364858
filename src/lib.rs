pub mod channel;
pub mod config;
pub mod error;
pub mod host;
pub mod outcome;
pub mod pending;
pub mod platform;
pub mod probe;
pub mod response;
pub mod server;
pub mod session;
pub mod store;
pub mod token;
pub mod tools;
