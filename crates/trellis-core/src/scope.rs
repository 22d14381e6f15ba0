use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle to one registered disposer, for removing it early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisposerId(u64);

/// Teardown list owned by a component node (or a navigation entry).
///
/// Disposers run in reverse registration order, once.
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    disposers: RefCell<Vec<(DisposerId, Box<dyn FnOnce()>)>>,
    next: Cell<u64>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                disposers: RefCell::new(Vec::new()),
                next: Cell::new(0),
            }),
        }
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) -> DisposerId {
        let id = DisposerId(self.inner.next.get());
        self.inner.next.set(id.0 + 1);
        self.inner.disposers.borrow_mut().push((id, Box::new(disposer)));
        id
    }

    /// Drops a disposer without running it. False when it already ran or
    /// was removed.
    pub fn remove_disposer(&self, id: DisposerId) -> bool {
        let removed = {
            let mut disposers = self.inner.disposers.borrow_mut();
            disposers
                .iter()
                .position(|(d, _)| *d == id)
                .map(|i| disposers.remove(i))
        };
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.disposers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispose(&self) {
        self.inner.run_disposers();
    }
}

impl ScopeInner {
    fn run_disposers(&self) {
        // Taken out first: a disposer may register on this scope again.
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for (_, disposer) in disposers.into_iter().rev() {
            disposer();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("disposers", &self.len())
            .finish()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.run_disposers();
    }
}
