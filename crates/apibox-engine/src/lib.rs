#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Concurrency core for `apibox`: the single-slot dispatcher, the
//! nonce-space stepper and chained-PoW driver built on it, the rate
//! limiter, the PoW primitive, and the embedded worker and pass-through
//! adapter that round out standalone mode.

pub mod chain;
pub mod dispatcher;
pub mod embedded_worker;
pub mod pow;
pub mod ratelimit;
pub mod transaction;
pub mod upstream;

pub use chain::{attach_to_tangle, AttachRequest, AttachResponse};
pub use dispatcher::{Dispatcher, StatusSnapshot};
pub use pow::PowEngine;
pub use ratelimit::RateLimiter;
