//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports ergonomic helpers for config
//! loading, one-shot gates, and the system routes.
//!
//! ## Config loading
//! ```rust,ignore
//! use lockbox_kernel::config::load_config;
//! let cfg: serde_json::Value = load_config::<serde_json::Value>(Some("server")).unwrap();
//! ```
//!
//! ## One-shot gates
//! ```rust
//! # use lockbox_kernel::gate::gate;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (handle, gate) = gate::<u32>();
//! handle.set(7);
//! assert_eq!(gate.get().await.unwrap(), 7);
//! # }
//! ```

pub mod config;
pub mod gate;
pub mod server;

pub use lockbox_domain as domain;
