pub mod config;
pub mod extract;
pub mod relay;
pub mod server;
