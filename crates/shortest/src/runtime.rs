//! Single-threaded execution
//!
//! Suites, hooks and tests run as cooperatively scheduled futures on one
//! thread. Nothing here is `Send`; the registry is shared through `Rc`.

use std::future::Future;
use tokio::task::LocalSet;

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// The future runs inside a [`LocalSet`], so it may use
/// `tokio::task::spawn_local` for `!Send` work.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: Future,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local_set = LocalSet::new();
    Ok(runtime.block_on(local_set.run_until(future)))
}
