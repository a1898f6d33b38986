//! Background task execution for the query cache.
//!
//! Query executors and deferred evictions do not run on the caller's task:
//! [`OffloadManager`] spawns them on the tokio runtime, tracks their handles
//! so they can be awaited or cancelled, and applies a [`TimeoutPolicy`].
//!
//! ```
//! use valdora::offload::{OffloadManager, TimeoutPolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = OffloadManager::new(TimeoutPolicy::None);
//! manager.spawn("fetch", async {
//!     // executor call
//! });
//! manager.wait_all().await;
//! assert_eq!(manager.total_task_count(), 0);
//! # }
//! ```

mod manager;
mod policy;

pub use manager::{OffloadKey, OffloadManager};
pub use policy::TimeoutPolicy;
