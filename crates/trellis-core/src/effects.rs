use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::NodeId;
use crate::scope::{DisposerId, Scope};

/// A cleanup. Runs at most once, however many clones exist.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.borrow().is_none()
    }
}

impl std::fmt::Debug for Dispose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispose")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Helper to register cleanup inside an effect.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

/// What an effect body may hand back: nothing, or a cleanup.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Dispose>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Dispose> {
        None
    }
}

impl IntoCleanup for Dispose {
    fn into_cleanup(self) -> Option<Dispose> {
        Some(self)
    }
}

impl IntoCleanup for Option<Dispose> {
    fn into_cleanup(self) -> Option<Dispose> {
        self
    }
}

/// RAII handle for an observer registration. Dropping it detaches.
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription(Option<Dispose>);

impl Subscription {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self(Some(Dispose::new(detach)))
    }

    pub fn unsubscribe(self) {
        drop(self)
    }

    /// Keep the observer attached for the lifetime of its source.
    pub fn forget(mut self) {
        self.0 = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(d) = self.0.take() {
            d.run();
        }
    }
}

/// What one `use_effect` callsite has committed so far.
#[derive(Default)]
pub(crate) struct EffectState {
    ran: bool,
    deps: Option<Box<dyn Any>>,
    cleanup: Option<Dispose>,
}

/// Per-callsite bookkeeping for `use_effect`: the deps captured at the last
/// run and the cleanup that run returned.
pub(crate) struct EffectSlot {
    state: Rc<RefCell<EffectState>>,
    teardown: DisposerId,
}

impl EffectSlot {
    /// Installs a single unmount disposer for this callsite.
    pub(crate) fn new(scope: &Scope) -> Self {
        let state: Rc<RefCell<EffectState>> = Rc::default();
        let on_teardown = state.clone();
        let teardown = scope.add_disposer(move || {
            let d = on_teardown.borrow_mut().cleanup.take();
            if let Some(d) = d {
                d.run();
            }
        });
        Self { state, teardown }
    }

    /// `None` deps means "every render".
    pub(crate) fn is_due<D: PartialEq + 'static>(&self, deps: Option<&D>) -> bool {
        let state = self.state.borrow();
        if !state.ran {
            return true;
        }
        let prev = state.deps.as_deref().and_then(|d| d.downcast_ref::<D>());
        match (deps, prev) {
            (Some(next), Some(prev)) => next != prev,
            _ => true,
        }
    }

    /// Queues `run`; `deps` count as committed only once it fires.
    pub(crate) fn pending<D: 'static>(
        &self,
        node: NodeId,
        deps: Option<D>,
        run: Box<dyn FnOnce() -> Option<Dispose>>,
    ) -> PendingEffect {
        PendingEffect {
            node,
            state: self.state.clone(),
            deps: deps.map(|d| Box::new(d) as Box<dyn Any>),
            run,
        }
    }

    /// Releases the callsite before unmount: the stored cleanup runs now and
    /// the unmount disposer is dropped.
    pub(crate) fn retire(self, scope: &Scope) {
        scope.remove_disposer(self.teardown);
        let d = self.state.borrow_mut().cleanup.take();
        if let Some(d) = d {
            d.run();
        }
    }
}

/// An effect body waiting for its render pass to commit.
pub(crate) struct PendingEffect {
    pub(crate) node: NodeId,
    state: Rc<RefCell<EffectState>>,
    deps: Option<Box<dyn Any>>,
    run: Box<dyn FnOnce() -> Option<Dispose>>,
}

impl PendingEffect {
    /// Previous cleanup first, then the body.
    pub(crate) fn fire(self) {
        let prev = {
            let mut state = self.state.borrow_mut();
            state.ran = true;
            state.deps = self.deps;
            state.cleanup.take()
        };
        if let Some(prev) = prev {
            prev.run();
        }
        let next = (self.run)();
        self.state.borrow_mut().cleanup = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispose_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let d = {
            let hits = hits.clone();
            Dispose::new(move || hits.set(hits.get() + 1))
        };
        let twin = d.clone();
        d.run();
        twin.run();
        assert_eq!(hits.get(), 1);
        assert!(twin.is_spent());
    }

    #[test]
    fn subscription_detaches_on_drop_unless_forgotten() {
        let detached = Rc::new(Cell::new(0));
        {
            let detached = detached.clone();
            let _sub = Subscription::new(move || detached.set(detached.get() + 1));
        }
        assert_eq!(detached.get(), 1);

        let kept = {
            let detached = detached.clone();
            Subscription::new(move || detached.set(detached.get() + 1))
        };
        kept.forget();
        assert_eq!(detached.get(), 1);
    }

    fn fire_with<D: 'static>(slot: &EffectSlot, deps: Option<D>) {
        slot.pending(NodeId::default(), deps, Box::new(|| None)).fire();
    }

    #[test]
    fn slot_compares_deps_elementwise() {
        let scope = Scope::new();
        let slot = EffectSlot::new(&scope);
        assert!(slot.is_due(Some(&(1, "a"))));
        fire_with(&slot, Some((1, "a")));
        assert!(!slot.is_due(Some(&(1, "a"))));
        assert!(slot.is_due(Some(&(1, "b"))));
        assert!(slot.is_due::<()>(None));
    }

    #[test]
    fn empty_deps_are_never_due_again() {
        let scope = Scope::new();
        let slot = EffectSlot::new(&scope);
        fire_with(&slot, Some(()));
        assert!(!slot.is_due(Some(&())));
    }

    #[test]
    fn deps_of_an_effect_that_never_fired_stay_due() {
        let scope = Scope::new();
        let slot = EffectSlot::new(&scope);
        fire_with(&slot, Some(1));

        let dropped = slot.pending(NodeId::default(), Some(2), Box::new(|| None));
        drop(dropped);
        assert!(slot.is_due(Some(&2)));
        assert!(!slot.is_due(Some(&1)));
    }

    #[test]
    fn retiring_a_slot_releases_its_cleanup_once() {
        let released = Rc::new(Cell::new(0));
        let scope = Scope::new();
        let slot = EffectSlot::new(&scope);
        let r = released.clone();
        slot.pending(
            NodeId::default(),
            Some(()),
            Box::new(move || Some(Dispose::new(move || r.set(r.get() + 1)))),
        )
        .fire();

        slot.retire(&scope);
        assert_eq!(released.get(), 1);
        assert!(scope.is_empty());
        scope.dispose();
        assert_eq!(released.get(), 1);
    }
}
