pub mod allowlist;
pub mod config;
pub mod error;
pub mod task;
pub mod trytes;

pub use allowlist::AllowList;
pub use config::Config;
pub use error::{ApiError, ApiErrorBody, DispatchError};
pub use task::Task;
pub use trytes::{Trytes, NONCE_LEN};
