//! Library surface behind the `apibox` binary: route wiring, config/CLI
//! plumbing, logging, and shutdown handling, kept in a `lib.rs` so
//! end-to-end tests can build the route tree without starting a real
//! process.

pub mod cli;
pub mod http;
pub mod logging;
pub mod shutdown;
