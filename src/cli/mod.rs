//! # CLI Module
//!
//! ```bash
//! # Run the reference application on the configured address
//! oxrouter serve --config oxrouter.yaml
//!
//! # Show what would be served, router by router
//! oxrouter routes --config oxrouter.yaml
//!
//! # Mint a token for `GET /me`
//! OXR_JWT_SECRET=dev oxrouter token --user-id 1
//! ```
//!
//! Every command reads the same configuration as `serve`, so `routes` and
//! `token` reflect exactly what the server would do.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands};
