pub mod chat;
pub mod config;
pub mod errors;
pub mod knowledge;
pub mod route;
pub mod weather;
