//! HTTP route modules

pub mod documents;
pub mod events;
pub mod health;
pub mod posts;
