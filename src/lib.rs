// Shared components
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer
pub mod channel;
pub mod notification;
pub mod store;
pub mod template;

// Application layer
pub mod api;
pub mod scheduler;
pub mod server;
