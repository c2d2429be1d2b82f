//! Graceful shutdown traits for worker components: synchronous for ones
//! that can stop immediately, asynchronous for ones that need to flush or
//! disconnect.

use std::future::Future;

pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}

/// Marker signal that a graceful shutdown has been requested (Ctrl-C or the
/// worker loop's `--max-iterations` bound being reached).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Shutdown;

/// Waits for either a Ctrl-C signal or the given future, whichever completes
/// first. Used by the worker binaries to interleave tick execution with
/// signal handling without a separate supervisor task.
pub async fn wait_for_shutdown_or<F>(work: F) -> Shutdown
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = tokio::signal::ctrl_c() => Shutdown,
        _ = work => Shutdown,
    }
}
