pub mod auth;
pub mod display;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod stores;
pub mod swagger;
