//! Named state slices, reduced by pure per-slice reducers.
//!
//! A [`Store`] is an explicit handle: build one per application (or per
//! test) and pass it to whatever subtree needs it.
//!
//! ```rust
//! use trellis_core::*;
//!
//! #[derive(Clone, Debug)]
//! enum Counter { Add(i32) }
//!
//! impl Action for Counter {
//!     fn kind(&self) -> &'static str { "ADD" }
//! }
//!
//! fn own(a: &Counter) -> Option<&Counter> { Some(a) }
//!
//! let store = Store::builder()
//!     .slice("count", 0i32, own, |n: &i32, a: &Counter| match a {
//!         Counter::Add(k) => n + k,
//!     })
//!     .build()
//!     .unwrap();
//!
//! store.dispatch(Counter::Add(2));
//! assert_eq!(*store.get_slice::<i32>("count").unwrap(), 2);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::effects::Subscription;
use crate::error::{Error, Result};

/// An intended mutation. Application actions are closed enums.
pub trait Action: Clone + fmt::Debug + 'static {
    /// Short tag for diagnostics.
    fn kind(&self) -> &'static str;
}

/// Pure transition for one slice, over that slice's own action domain.
pub trait Reducer<S, X>: 'static {
    fn reduce(&self, state: &S, action: &X) -> S;
}

impl<S, X, F> Reducer<S, X> for F
where
    F: Fn(&S, &X) -> S + 'static,
{
    fn reduce(&self, state: &S, action: &X) -> S {
        self(state, action)
    }
}

/// Routes an application action to a slice's domain; `None` skips the slice.
pub type Projection<A, X> = fn(&A) -> Option<&X>;

/// Projection for slices whose domain is the whole application action.
pub fn whole<A>(action: &A) -> Option<&A> {
    Some(action)
}

/// Observes plain actions around reduction, in registration order.
pub trait Middleware<A: Action>: 'static {
    fn before(&self, _action: &A, _store: &Store<A>) {}
    fn after(&self, _action: &A, _store: &Store<A>, _changes: &ChangeSet) {}
}

/// Logs every action kind and the slices it changed.
pub struct LoggingMiddleware;

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn after(&self, action: &A, _store: &Store<A>, changes: &ChangeSet) {
        log::debug!("action {} changed {:?}", action.kind(), changes);
    }
}

/// Names of the slices one dispatch changed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    names: SmallVec<[Rc<str>; 4]>,
}

impl ChangeSet {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| &**n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| &**n)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Which slices an observer cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interest {
    All,
    Slices(SmallVec<[Rc<str>; 4]>),
}

impl Interest {
    pub fn slices<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Interest::Slices(names.into_iter().map(|n| Rc::from(n.as_ref())).collect())
    }

    pub fn matches(&self, changes: &ChangeSet) -> bool {
        match self {
            Interest::All => !changes.is_empty(),
            Interest::Slices(names) => names.iter().any(|n| changes.contains(n)),
        }
    }
}

trait AnySlice<A> {
    fn name(&self) -> &Rc<str>;
    fn value(&self) -> Rc<dyn Any>;
    fn version(&self) -> u64;
    fn type_name(&self) -> &'static str;
    /// True when the slice now holds a different value.
    fn apply(&mut self, action: &A) -> bool;
}

struct SliceCell<A, S, X, R> {
    name: Rc<str>,
    value: Rc<S>,
    version: u64,
    project: Projection<A, X>,
    reducer: R,
}

impl<A, S, X, R> AnySlice<A> for SliceCell<A, S, X, R>
where
    A: 'static,
    S: PartialEq + 'static,
    X: 'static,
    R: Reducer<S, X>,
{
    fn name(&self) -> &Rc<str> {
        &self.name
    }

    fn value(&self) -> Rc<dyn Any> {
        self.value.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<S>()
    }

    fn apply(&mut self, action: &A) -> bool {
        let Some(action) = (self.project)(action) else {
            return false;
        };
        let next = self.reducer.reduce(&self.value, action);
        if next == *self.value {
            return false;
        }
        self.value = Rc::new(next);
        self.version += 1;
        true
    }
}

new_key_type! {
    struct ObserverKey;
}

struct Observer {
    interest: Interest,
    callback: Rc<dyn Fn(&ChangeSet)>,
}

struct StoreInner<A: Action> {
    slices: RefCell<Vec<Box<dyn AnySlice<A>>>>,
    index: HashMap<Rc<str>, usize>,
    observers: RefCell<SlotMap<ObserverKey, Observer>>,
    middleware: Vec<Box<dyn Middleware<A>>>,
    queue: RefCell<VecDeque<A>>,
    dispatching: Cell<bool>,
    dispatched: Cell<u64>,
}

/// Shared handle to the application state. Cloning is cheap; equality is
/// identity.
pub struct Store<A: Action> {
    inner: Rc<StoreInner<A>>,
}

pub struct StoreBuilder<A: Action> {
    slices: Vec<Box<dyn AnySlice<A>>>,
    middleware: Vec<Box<dyn Middleware<A>>>,
}

impl<A: Action> StoreBuilder<A> {
    pub fn slice<S, X, R>(
        mut self,
        name: impl AsRef<str>,
        initial: S,
        project: Projection<A, X>,
        reducer: R,
    ) -> Self
    where
        S: PartialEq + 'static,
        X: 'static,
        R: Reducer<S, X>,
    {
        self.slices.push(Box::new(SliceCell {
            name: Rc::from(name.as_ref()),
            value: Rc::new(initial),
            version: 0,
            project,
            reducer,
        }));
        self
    }

    /// A slice no action ever changes.
    pub fn constant<S: PartialEq + 'static>(self, name: impl AsRef<str>, value: S) -> Self {
        fn untouched<A>(_: &A) -> Option<&()> {
            None
        }
        self.slice(name, value, untouched::<A>, |_: &S, _: &()| -> S {
            unreachable!("constant slice of {} was reduced", std::any::type_name::<S>())
        })
    }

    pub fn middleware(mut self, m: impl Middleware<A>) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    pub fn build(self) -> Result<Store<A>> {
        let mut index = HashMap::new();
        for (i, slice) in self.slices.iter().enumerate() {
            if index.insert(slice.name().clone(), i).is_some() {
                return Err(Error::DuplicateSlice(slice.name().to_string()));
            }
        }
        Ok(Store {
            inner: Rc::new(StoreInner {
                slices: RefCell::new(self.slices),
                index,
                observers: RefCell::new(SlotMap::with_key()),
                middleware: self.middleware,
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                dispatched: Cell::new(0),
            }),
        })
    }
}

impl<A: Action> Store<A> {
    pub fn builder() -> StoreBuilder<A> {
        StoreBuilder {
            slices: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// Current value of a slice; `None` when it is missing or of another type.
    pub fn get_slice<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.try_slice(name).ok()
    }

    pub fn try_slice<T: 'static>(&self, name: &str) -> Result<Rc<T>> {
        let i = *self
            .inner
            .index
            .get(name)
            .ok_or_else(|| Error::MissingSlice(name.to_string()))?;
        let value = self.inner.slices.borrow()[i].value();
        value.downcast::<T>().map_err(|_| Error::SliceType {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn version(&self, name: &str) -> Option<u64> {
        let i = *self.inner.index.get(name)?;
        Some(self.inner.slices.borrow()[i].version())
    }

    pub fn slice_names(&self) -> Vec<String> {
        self.inner
            .slices
            .borrow()
            .iter()
            .map(|s| format!("{}: {}", s.name(), s.type_name()))
            .collect()
    }

    /// Number of plain actions applied so far.
    pub fn dispatched(&self) -> u64 {
        self.inner.dispatched.get()
    }

    /// Applies `action` to every slice and notifies interested observers
    /// before returning. Calls made while a dispatch is running are queued
    /// and applied, in order, once it finishes.
    pub fn dispatch(&self, action: A) {
        self.inner.queue.borrow_mut().push_back(action);
        if self.inner.dispatching.replace(true) {
            return;
        }

        // Non-panicking guard (ensures the flag resets on unwind)
        struct Guard<'a>(&'a Cell<bool>);
        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _guard = Guard(&self.inner.dispatching);

        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(action) = next else { break };
            self.apply(action);
        }
    }

    fn apply(&self, action: A) {
        for m in &self.inner.middleware {
            m.before(&action, self);
        }

        let mut changes = ChangeSet::default();
        for slice in self.inner.slices.borrow_mut().iter_mut() {
            if slice.apply(&action) {
                changes.names.push(slice.name().clone());
            }
        }
        self.inner.dispatched.set(self.inner.dispatched.get() + 1);
        log::debug!("dispatch {} -> {:?}", action.kind(), changes);

        for m in &self.inner.middleware {
            m.after(&action, self, &changes);
        }

        if !changes.is_empty() {
            self.notify(&changes);
        }
    }

    fn notify(&self, changes: &ChangeSet) {
        let targets: Vec<Rc<dyn Fn(&ChangeSet)>> = self
            .inner
            .observers
            .borrow()
            .values()
            .filter(|o| o.interest.matches(changes))
            .map(|o| o.callback.clone())
            .collect();
        for callback in targets {
            callback(changes);
        }
    }

    pub fn subscribe(
        &self,
        interest: Interest,
        callback: impl Fn(&ChangeSet) + 'static,
    ) -> Subscription {
        let key = self.inner.observers.borrow_mut().insert(Observer {
            interest,
            callback: Rc::new(callback),
        });
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().remove(key);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Identity of the store, for subscription bookkeeping.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<A: Action> Clone for Store<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Action> PartialEq for Store<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: Action> fmt::Debug for Store<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("slices", &self.slice_names())
            .field("dispatched", &self.dispatched())
            .finish()
    }
}
