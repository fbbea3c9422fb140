pub mod chat;
pub mod config;
pub mod health;
pub mod meta;
pub mod services;
pub mod sessions;
