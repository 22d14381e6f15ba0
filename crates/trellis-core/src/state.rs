use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::runtime::{NodeId, RenderReason, Scheduler};

type Update<T> = Box<dyn FnOnce(&T) -> T>;

/// One local state slot of a component node.
pub(crate) struct StateCell<T> {
    committed: RefCell<T>,
    pending: RefCell<Vec<Update<T>>>,
}

impl<T: Clone + 'static> StateCell<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            committed: RefCell::new(value),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Folds queued updates, in order, into the committed value.
    pub(crate) fn commit(&self) -> T {
        let updates = std::mem::take(&mut *self.pending.borrow_mut());
        if !updates.is_empty() {
            let mut value = self.committed.borrow().clone();
            for update in updates {
                value = update(&value);
            }
            *self.committed.borrow_mut() = value;
        }
        self.committed.borrow().clone()
    }
}

/// Write half of `use_state`. Updates land on the next render of the node.
pub struct Setter<T: 'static> {
    cell: Weak<StateCell<T>>,
    node: NodeId,
    scheduler: Scheduler,
}

impl<T: 'static> Setter<T> {
    pub(crate) fn new(cell: &Rc<StateCell<T>>, node: NodeId, scheduler: Scheduler) -> Self {
        Self {
            cell: Rc::downgrade(cell),
            node,
            scheduler,
        }
    }

    pub fn set(&self, next: T) {
        self.update(move |_| next)
    }

    /// `f` sees the value left by every update queued before it.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        let Some(cell) = self.cell.upgrade() else {
            log::warn!("state update on an unmounted node ignored");
            return;
        };
        cell.pending.borrow_mut().push(Box::new(f));
        self.scheduler.mark_dirty(self.node, RenderReason::STATE);
    }

    pub fn is_live(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl<T: 'static> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            node: self.node,
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: 'static> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl<T: 'static> std::fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter")
            .field("node", &self.node)
            .field("live", &self.is_live())
            .finish()
    }
}
