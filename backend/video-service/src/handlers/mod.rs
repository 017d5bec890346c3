pub mod health;
pub mod videos;
pub mod views;
pub mod webhooks;
