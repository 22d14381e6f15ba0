//! The single entry point for mutations: plain actions apply synchronously,
//! deferred computations run on the local executor and dispatch later.

use std::future::Future;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::store::{Action, Store};
use crate::task::{Spawner, Task};

type Thunk<A> = Box<dyn FnOnce(Dispatcher<A>) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// An asynchronous action: logic that dispatches plain actions when its I/O
/// completes.
pub struct Deferred<A: Action> {
    label: &'static str,
    run: Thunk<A>,
}

pub enum Dispatchable<A: Action> {
    Action(A),
    Deferred(Deferred<A>),
}

impl<A: Action> From<A> for Dispatchable<A> {
    fn from(action: A) -> Self {
        Dispatchable::Action(action)
    }
}

impl<A: Action> From<Deferred<A>> for Dispatchable<A> {
    fn from(deferred: Deferred<A>) -> Self {
        Dispatchable::Deferred(deferred)
    }
}

/// Wraps `f` as a deferred action. `label` names it in logs.
pub fn deferred<A, F, Fut>(label: &'static str, f: F) -> Deferred<A>
where
    A: Action,
    F: FnOnce(Dispatcher<A>) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<()>> + 'static,
{
    Deferred {
        label,
        run: Box::new(move |d| f(d).boxed_local()),
    }
}

/// What `dispatch` did with its argument.
#[derive(Debug)]
pub enum Dispatched {
    Applied,
    Pending(Task),
}

impl Dispatched {
    pub fn task(self) -> Option<Task> {
        match self {
            Dispatched::Applied => None,
            Dispatched::Pending(t) => Some(t),
        }
    }

    /// Resolves once the deferred work (if any) has settled.
    pub async fn settled(self) -> Result<(), crate::task::TaskError> {
        match self {
            Dispatched::Applied => Ok(()),
            Dispatched::Pending(t) => t.await,
        }
    }
}

/// A store plus the executor deferred actions run on.
pub struct Dispatcher<A: Action> {
    store: Store<A>,
    spawner: Spawner,
}

impl<A: Action> Dispatcher<A> {
    pub fn new(store: Store<A>, spawner: Spawner) -> Self {
        Self { store, spawner }
    }

    /// Read access for deferred computations.
    pub fn get_state(&self) -> &Store<A> {
        &self.store
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn dispatch(&self, item: impl Into<Dispatchable<A>>) -> Dispatched {
        match item.into() {
            Dispatchable::Action(action) => {
                self.store.dispatch(action);
                Dispatched::Applied
            }
            Dispatchable::Deferred(Deferred { label, run }) => {
                log::debug!("deferred `{label}` started");
                let fut = run(self.clone());
                Dispatched::Pending(self.spawner.spawn(label, fut))
            }
        }
    }

    pub fn unhandled_rejections(&self) -> u64 {
        self.spawner.unhandled_rejections()
    }
}

impl<A: Action> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<A: Action> PartialEq for Dispatcher<A> {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store
    }
}

impl<A: Action> std::fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .finish()
    }
}
