pub mod chat;
pub mod core;
pub mod cortex;
pub mod server;
pub mod state;
