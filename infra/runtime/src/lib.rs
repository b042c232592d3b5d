//! # Runtime
//!
//! A thin orchestration layer for the [Tokio](https://tokio.rs) async runtime.
//!
//! This crate provides the runtime configurations (profiles) used across the
//! workspace so that every binary boots with predictable performance and
//! resource usage.
//!
//! ## Profiles
//! * **High Performance**: larger stacks and longer keep-alive for server-side processing.
//! * **Default**: worker threads auto-detected from available parallelism.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[lockbox_runtime::main(high_performance)]
//! async fn main() -> anyhow::Result<()> {
//!     println!("Running on a high-performance runtime!");
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use lockbox_derive::main;

use anyhow::Context;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The default number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
/// The default stack size for threads (3 `MiB`).
const DEFAULT_STACK_SIZE: usize = 3 * 1024 * 1024;
/// Minimum allowed stack size (1 `MiB`).
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// Maximum allowed stack size (16 `MiB`).
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
/// How long an idle thread stays alive.
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// Detects the optimal number of worker threads based on environment variables or hardware.
fn get_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= 1024)
            .unwrap_or_else(|| {
                available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

fn clamp_stack_size(stack_size: usize) -> usize {
    stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE)
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: get_worker_threads(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "thread-worker".to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }
}

impl RuntimeConfig {
    /// Preset for high-throughput server applications.
    #[must_use = "Use this configuration for high-performance server applications"]
    pub fn high_performance() -> Self {
        Self {
            worker_threads: get_worker_threads(),
            stack_size: 4 * 1024 * 1024,
            thread_name: "thread-hp".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    #[must_use = "Customize the number of worker threads for the runtime"]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, 1024);
        self
    }

    #[must_use = "Customize the stack size for worker threads"]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = clamp_stack_size(size);
        self
    }
}

/// Creates a new Tokio runtime with a custom configuration.
///
/// Builds a multithreaded runtime with all features enabled (I/O, timers)
/// and the configuration applied after clamping to safe bounds.
///
/// # Errors
///
/// Returns an [`anyhow::Error`] if the runtime cannot be created, typically
/// due to insufficient system resources or OS-level limitations.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let worker_threads = config.worker_threads.clamp(1, 1024);
    let stack_size = clamp_stack_size(config.stack_size);
    let thread_name = if config.thread_name.trim().is_empty() {
        "thread-worker".to_owned()
    } else {
        config.thread_name.clone()
    };

    debug!(worker_threads, stack_size, %thread_name, "Building Tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_stack_size(stack_size)
        .thread_name(thread_name)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .context("Failed to build the Tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_size_is_clamped() {
        let config = RuntimeConfig::default().with_stack_size(1);
        assert_eq!(config.stack_size, MIN_STACK_SIZE);

        let config = RuntimeConfig::default().with_stack_size(usize::MAX);
        assert_eq!(config.stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn runtime_builds_and_runs() {
        let rt = build_runtime_with_config(&RuntimeConfig::default().with_worker_threads(2))
            .expect("runtime should build");
        let answer = rt.block_on(async { 6 * 7 });
        assert_eq!(answer, 42);
    }
}
