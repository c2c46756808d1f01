//! Command-line and environment configuration for the LogLens server.
//!
//! Every flag can also be supplied through its environment variable, which is
//! how the service is normally configured in a container.

pub mod cli_args;

pub use cli_args::Cli;
