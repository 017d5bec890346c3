pub mod engagement;
pub mod events;
pub mod lifecycle;
pub mod symbols;
pub mod throttle;
pub mod view_tracker;
pub mod webhooks;
