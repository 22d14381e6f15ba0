//! Cancellable handles for asynchronous work on the local executor.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::{AbortHandle, Abortable, Aborted};
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use futures::executor::LocalSpawner;
use thiserror::Error;

use crate::effects::Dispose;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(anyhow::Error),
    #[error("executor is gone: {0}")]
    Spawn(#[from] SpawnError),
}

/// How a task ended, kept after its outcome has been handed out.
#[derive(Clone, Debug, PartialEq)]
enum Settled {
    Succeeded,
    Cancelled,
    Failed(String),
}

impl Settled {
    fn of(outcome: &Result<(), TaskError>) -> Self {
        match outcome {
            Ok(()) => Settled::Succeeded,
            Err(TaskError::Cancelled) => Settled::Cancelled,
            Err(e) => Settled::Failed(format!("{e:#}")),
        }
    }

    fn replay(&self) -> Result<(), TaskError> {
        match self {
            Settled::Succeeded => Ok(()),
            Settled::Cancelled => Err(TaskError::Cancelled),
            Settled::Failed(msg) => Err(TaskError::Failed(anyhow::anyhow!("{msg}"))),
        }
    }
}

struct TaskShared {
    label: &'static str,
    finished: Cell<bool>,
    outcome: RefCell<Option<Result<(), TaskError>>>,
    settled: RefCell<Option<Settled>>,
    waker: RefCell<Option<Waker>>,
    /// False once the last handle is gone.
    held: Cell<bool>,
    abort: AbortHandle,
    rejections: Rc<Cell<u64>>,
}

impl TaskShared {
    fn finish(&self, outcome: Result<(), TaskError>) {
        self.finished.set(true);
        if self.held.get() {
            *self.outcome.borrow_mut() = Some(outcome);
            if let Some(w) = self.waker.borrow_mut().take() {
                w.wake();
            }
        } else {
            report(self.label, &self.rejections, outcome);
        }
    }

    /// The first read hands over the outcome itself; later reads get a
    /// copy rebuilt from how the task settled.
    fn read(&self) -> Option<Result<(), TaskError>> {
        let taken = self.outcome.borrow_mut().take();
        if let Some(outcome) = taken {
            *self.settled.borrow_mut() = Some(Settled::of(&outcome));
            return Some(outcome);
        }
        self.settled.borrow().as_ref().map(Settled::replay)
    }
}

fn report(label: &'static str, rejections: &Cell<u64>, outcome: Result<(), TaskError>) {
    match outcome {
        Ok(()) | Err(TaskError::Cancelled) => {}
        Err(e) => {
            rejections.set(rejections.get() + 1);
            log::error!("unhandled rejection in `{label}`: {e:#}");
        }
    }
}

/// Spawns local futures and counts the failures nobody awaited.
#[derive(Clone)]
pub struct Spawner {
    spawner: LocalSpawner,
    rejections: Rc<Cell<u64>>,
}

impl Spawner {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self {
            spawner,
            rejections: Rc::new(Cell::new(0)),
        }
    }

    pub fn spawn<F>(&self, label: &'static str, fut: F) -> Task
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        let shared = Rc::new(TaskShared {
            label,
            finished: Cell::new(false),
            outcome: RefCell::new(None),
            settled: RefCell::new(None),
            waker: RefCell::new(None),
            held: Cell::new(true),
            abort,
            rejections: self.rejections.clone(),
        });

        let body = Abortable::new(fut, registration);
        let on_done = shared.clone();
        let spawned = self.spawner.spawn_local(async move {
            let outcome = match body.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(TaskError::Failed(e)),
                Err(Aborted) => Err(TaskError::Cancelled),
            };
            log::debug!("task `{}` settled: {:?}", on_done.label, outcome.as_ref().err());
            on_done.finish(outcome);
        });
        if let Err(e) = spawned {
            shared.finish(Err(TaskError::Spawn(e)));
        }

        Task { shared }
    }

    /// Failures that settled with no handle left to observe them.
    pub fn unhandled_rejections(&self) -> u64 {
        self.rejections.get()
    }

    pub fn is_running(&self) -> bool {
        self.spawner.status_local().is_ok()
    }
}

/// A pending operation. Await it for the outcome, `cancel` it, or drop it to
/// let it run unobserved.
pub struct Task {
    shared: Rc<TaskShared>,
}

impl Task {
    pub fn label(&self) -> &'static str {
        self.shared.label
    }

    /// Stops the operation at its next suspension point.
    pub fn cancel(&self) {
        self.shared.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.get()
    }

    /// The outcome without awaiting, if it has settled. Reading it again,
    /// or awaiting afterwards, reports the same result; a failure's error
    /// is then rebuilt from its message.
    pub fn outcome(&mut self) -> Option<Result<(), TaskError>> {
        self.shared.read()
    }

    /// Gives up the handle; a later failure is reported as unhandled.
    pub fn detach(self) {
        drop(self)
    }

    /// Cleanup that cancels this task. The handle itself is detached.
    pub fn cancel_on_dispose(self) -> Dispose {
        let abort = self.shared.abort.clone();
        self.detach();
        Dispose::new(move || abort.abort())
    }
}

impl Future for Task {
    type Output = Result<(), TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.shared.read() {
            return Poll::Ready(outcome);
        }
        *self.shared.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.shared.held.set(false);
        let left = self.shared.outcome.borrow_mut().take();
        if let Some(outcome) = left {
            report(self.shared.label, &self.shared.rejections, outcome);
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.shared.label)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;

    #[test]
    fn awaited_failure_reaches_the_caller() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        let task = spawner.spawn("boom", async { Err(anyhow::anyhow!("404")) });

        let outcome = pool.run_until(task);
        assert!(matches!(outcome, Err(TaskError::Failed(e)) if e.to_string() == "404"));
        assert_eq!(spawner.unhandled_rejections(), 0);
    }

    #[test]
    fn dropped_failure_is_counted_as_unhandled() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        spawner
            .spawn("boom", async { Err(anyhow::anyhow!("offline")) })
            .detach();
        pool.run_until_stalled();
        assert_eq!(spawner.unhandled_rejections(), 1);
    }

    #[test]
    fn failure_left_in_a_dropped_handle_is_reported() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        let task = spawner.spawn("boom", async { Err(anyhow::anyhow!("offline")) });
        pool.run_until_stalled();
        assert!(task.is_finished());
        assert_eq!(spawner.unhandled_rejections(), 0);
        drop(task);
        assert_eq!(spawner.unhandled_rejections(), 1);
    }

    #[test]
    fn a_failure_read_early_is_still_a_failure_when_awaited() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        let mut task = spawner.spawn("boom", async { Err(anyhow::anyhow!("500")) });
        pool.run_until_stalled();

        assert!(matches!(task.outcome(), Some(Err(TaskError::Failed(_)))));
        assert!(matches!(task.outcome(), Some(Err(TaskError::Failed(e))) if e.to_string() == "500"));
        let awaited = pool.run_until(task);
        assert!(matches!(awaited, Err(TaskError::Failed(e)) if e.to_string() == "500"));
        assert_eq!(spawner.unhandled_rejections(), 0);
    }

    #[test]
    fn cancel_stops_a_pending_task() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        let (tx, rx) = oneshot::channel::<u32>();
        let reached = Rc::new(Cell::new(false));
        let task = {
            let reached = reached.clone();
            spawner.spawn("wait", async move {
                rx.await?;
                reached.set(true);
                Ok(())
            })
        };
        pool.run_until_stalled();
        task.cancel();
        let _ = tx.send(7);

        assert!(matches!(pool.run_until(task), Err(TaskError::Cancelled)));
        assert!(!reached.get());
        assert_eq!(spawner.unhandled_rejections(), 0);
    }

    #[test]
    fn cancel_on_dispose_cancels_when_the_cleanup_runs() {
        let mut pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        let (_tx, rx) = oneshot::channel::<u32>();
        let cleanup = spawner
            .spawn("wait", async move {
                rx.await?;
                Ok(())
            })
            .cancel_on_dispose();
        pool.run_until_stalled();
        cleanup.run();
        pool.run_until_stalled();
        assert_eq!(spawner.unhandled_rejections(), 0);
    }
}
