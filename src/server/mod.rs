pub mod display;
pub mod handlers;
pub mod router;
