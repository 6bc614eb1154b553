//! Shared rayon pool for model training.
//!
//! Only the forest's `fit` runs here; the reveal loop itself is sequential.
//! Trees are grown recursively, so worker threads get a larger stack than
//! rayon's default.

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
static FIT_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(feature = "parallel")]
const WORKER_STACK_BYTES: usize = 8 * 1024 * 1024;

/// Run `op` inside the shared training pool.
///
/// Falls back to rayon's global pool if the dedicated pool cannot be built.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    let pool = FIT_POOL.get_or_init(|| {
        match rayon::ThreadPoolBuilder::new()
            .stack_size(WORKER_STACK_BYTES)
            .thread_name(|i| format!("akf-fit-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                log::warn!("falling back to global rayon pool: {}", err);
                None
            }
        }
    });
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Run `op` on the calling thread.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}

/// Worker threads in the shared training pool.
///
/// Reads the pool without building it; 1 until a parallel fit has run in
/// this process.
pub fn fit_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        match FIT_POOL.get() {
            Some(Some(pool)) => pool.current_num_threads(),
            Some(None) => rayon::current_num_threads(),
            None => 1,
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
