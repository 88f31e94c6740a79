//! Worker pools for parallel replications.
//!
//! By default every run shares one lazily built pool with an enlarged stack,
//! since statistic functions that refit models can recurse deeply. A run
//! that asks for a specific thread count gets a dedicated pool instead.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

use crate::error::BootstrapError;

#[cfg(feature = "parallel")]
const STACK_SIZE: usize = 8 * 1024 * 1024;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Shared pool, or `None` if it could not be built (rayon's global pool is
/// used then).
#[cfg(feature = "parallel")]
fn shared_pool() -> Option<&'static ThreadPool> {
    THREAD_POOL
        .get_or_init(|| {
            rayon::ThreadPoolBuilder::new()
                .stack_size(STACK_SIZE)
                .thread_name(|i| format!("refit-bootstrap-{}", i))
                .build()
                .map_err(|err| log::warn!("falling back to rayon's global pool: {}", err))
                .ok()
        })
        .as_ref()
}

/// Run `op` on a worker pool.
///
/// With `threads: None` the shared pool is used; `Some(n)` builds a
/// dedicated pool of `n` threads for this call.
///
/// # Errors
///
/// `ThreadPool` if a dedicated pool cannot be built.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(threads: Option<usize>, op: OP) -> Result<R, BootstrapError>
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .stack_size(STACK_SIZE)
                .build()
                .map_err(|err| BootstrapError::ThreadPool(err.to_string()))?;
            Ok(pool.install(op))
        }
        None => match shared_pool() {
            Some(pool) => Ok(pool.install(op)),
            None => Ok(op()),
        },
    }
}

/// Without the `parallel` feature work runs on the calling thread.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(_threads: Option<usize>, op: OP) -> Result<R, BootstrapError>
where
    OP: FnOnce() -> R,
{
    Ok(op())
}
