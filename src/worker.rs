//! Off-thread execution for interactive front ends.
//!
//! Engine stages are synchronous. A front end that must stay responsive runs
//! a stage through [`spawn`] and either waits on the returned [`Pending`]
//! handle or receives the result through a callback. Cancellation is
//! cooperative: long-running stages poll the [`CancelFlag`] between row
//! batches.

use std::{
    panic,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use log::debug;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` once the flag is raised.
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct Pending<T> {
    handle: JoinHandle<EngineResult<T>>,
    cancel: CancelFlag,
}

impl<T> Pending<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the job completes. A cancelled job yields
    /// `Err(EngineError::Cancelled)` unless it finished before noticing.
    pub fn wait(self) -> EngineResult<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

pub fn spawn<T, F>(job: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce(&CancelFlag) -> EngineResult<T> + Send + 'static,
{
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    let handle = thread::spawn(move || {
        debug!("Background job started");
        let result = flag.check().and_then(|()| job(&flag));
        debug!("Background job finished (ok: {})", result.is_ok());
        result
    });
    Pending { handle, cancel }
}

/// Runs `job` in the background and hands its result to `on_done` on the
/// worker thread.
pub fn spawn_with_callback<T, F, C>(job: F, on_done: C) -> CancelFlag
where
    T: Send + 'static,
    F: FnOnce(&CancelFlag) -> EngineResult<T> + Send + 'static,
    C: FnOnce(EngineResult<T>) + Send + 'static,
{
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    thread::spawn(move || {
        let result = flag.check().and_then(|()| job(&flag));
        on_done(result);
    });
    cancel
}
