pub mod auth;
pub mod cli;
pub mod client_factory;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod error;
pub mod github;
pub mod prompt;
pub mod request;
pub mod ruleset;
pub mod token_store;
pub mod ui;

// Make mock_github available for integration testing
pub mod mock_github;

pub use error::Error;
