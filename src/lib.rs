// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod shutdown;
pub mod telemetry;

// Core component
pub mod registry;

// Services
pub mod echo;
pub mod login;
pub mod ws;

// Application layer
pub mod server;
pub mod tasks;
