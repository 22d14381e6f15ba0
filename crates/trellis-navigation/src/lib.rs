#![allow(non_snake_case)]
//! Path history for Trellis apps, and a `Router` component that re-renders
//! its page when the current entry changes.
//!
//! Matching paths to pages is left to the application: the router hands the
//! current [`Route`] to a render closure.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis_core::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TransitionDir {
    None,
    Push,
    Pop,
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("invalid history snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history snapshot has no entries")]
    Empty,
}

struct Entry {
    id: u64,
    path: String,
    /// Disposed when the entry leaves the history.
    scope: Scope,
}

struct HistoryState {
    entries: Vec<Entry>,
    next_id: u64,
    last_dir: TransitionDir,
}

impl HistoryState {
    fn entry(&mut self, path: String) -> Entry {
        let id = self.next_id;
        self.next_id += 1;
        Entry {
            id,
            path,
            scope: Scope::new(),
        }
    }
}

/// The entry currently on top of the history.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: u64,
    pub path: String,
    /// Lives as long as the entry does.
    pub scope: Scope,
}

impl Route {
    /// Path split on `/`, without empty segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Shared path history. Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct History {
    inner: Rc<RefCell<HistoryState>>,
    version: Signal<u64>,
}

impl History {
    pub fn new(start: impl Into<String>) -> Self {
        let mut state = HistoryState {
            entries: Vec::new(),
            next_id: 1,
            last_dir: TransitionDir::None,
        };
        let first = state.entry(start.into());
        state.entries.push(first);
        Self {
            inner: Rc::new(RefCell::new(state)),
            version: signal(0),
        }
    }

    pub fn current(&self) -> String {
        self.route().path
    }

    pub fn route(&self) -> Route {
        let s = self.inner.borrow();
        // never empty: `back` keeps the first entry
        let e = &s.entries[s.entries.len() - 1];
        Route {
            id: e.id,
            path: e.path.clone(),
            scope: e.scope.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn last_dir(&self) -> TransitionDir {
        self.inner.borrow().last_dir
    }

    /// Bumped on every change.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    fn bump(&self) {
        log::debug!("history -> {}", self.current());
        self.version.update(|v| *v = v.wrapping_add(1));
    }

    pub fn push(&self, path: impl Into<String>) {
        {
            let mut s = self.inner.borrow_mut();
            let e = s.entry(path.into());
            s.entries.push(e);
            s.last_dir = TransitionDir::Push;
        }
        self.bump();
    }

    /// Swaps the top entry for a new one; the old entry's scope is disposed.
    pub fn replace(&self, path: impl Into<String>) {
        let old = {
            let mut s = self.inner.borrow_mut();
            let e = s.entry(path.into());
            s.last_dir = TransitionDir::Push;
            let old = s.entries.pop();
            s.entries.push(e);
            old
        };
        if let Some(old) = old {
            old.scope.dispose();
        }
        self.bump();
    }

    /// Pops the top entry. Refuses to pop the last one.
    pub fn back(&self) -> bool {
        let popped = {
            let mut s = self.inner.borrow_mut();
            if s.entries.len() <= 1 {
                return false;
            }
            s.last_dir = TransitionDir::Pop;
            s.entries.pop()
        };
        if let Some(e) = popped {
            e.scope.dispose();
        }
        self.bump();
        true
    }

    pub fn clear_and_push(&self, path: impl Into<String>) {
        let old = {
            let mut s = self.inner.borrow_mut();
            let old = std::mem::take(&mut s.entries);
            let e = s.entry(path.into());
            s.entries.push(e);
            s.last_dir = TransitionDir::Push;
            old
        };
        for e in old.into_iter().rev() {
            e.scope.dispose();
        }
        self.bump();
    }

    /// Pops back to the newest entry matching `pred`; `inclusive` pops it too
    /// (but never the last remaining entry).
    pub fn pop_to(&self, pred: impl Fn(&str) -> bool, inclusive: bool) {
        let count = {
            let s = self.inner.borrow();
            match s.entries.iter().rposition(|e| pred(&e.path)) {
                Some(idx) => {
                    let n = s.entries.len() - idx - usize::from(!inclusive);
                    n.min(s.entries.len() - 1)
                }
                None => 0,
            }
        };
        if count == 0 {
            return;
        }
        let popped: Vec<Entry> = {
            let mut s = self.inner.borrow_mut();
            s.last_dir = TransitionDir::Pop;
            let keep = s.entries.len() - count;
            s.entries.drain(keep..).collect()
        };
        for e in popped.into_iter().rev() {
            e.scope.dispose();
        }
        self.bump();
    }

    pub fn subscribe(&self, f: impl Fn(u64) + 'static) -> Subscription {
        self.version.subscribe(move |v| f(*v))
    }

    /// Identity, for subscription bookkeeping.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn to_json(&self) -> String {
        let s = self.inner.borrow();
        let paths: Vec<&str> = s.entries.iter().map(|e| e.path.as_str()).collect();
        serde_json::to_string(&paths).unwrap_or_else(|_| "[]".into())
    }

    /// Replaces every entry with the paths in `json`. Existing scopes are
    /// disposed; on error the history is left untouched.
    pub fn restore_json(&self, json: &str) -> Result<(), NavError> {
        let paths: Vec<String> = serde_json::from_str(json)?;
        if paths.is_empty() {
            return Err(NavError::Empty);
        }
        let old = {
            let mut s = self.inner.borrow_mut();
            let old = std::mem::take(&mut s.entries);
            for p in paths {
                let e = s.entry(p);
                s.entries.push(e);
            }
            s.last_dir = TransitionDir::None;
            old
        };
        for e in old.into_iter().rev() {
            e.scope.dispose();
        }
        self.bump();
        Ok(())
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.inner.borrow();
        f.debug_list()
            .entries(s.entries.iter().map(|e| &e.path))
            .finish()
    }
}

pub type PageRenderer = Rc<dyn Fn(&Route) -> View>;

/// Renders the current route through `pages`. Props: the history to follow.
///
/// The page is keyed by entry id, so navigating to a new entry unmounts the
/// previous page and runs its cleanups.
#[derive(Clone)]
pub struct Router {
    pages: PageRenderer,
}

impl Router {
    pub fn new(pages: impl Fn(&Route) -> View + 'static) -> Self {
        Self {
            pages: Rc::new(pages),
        }
    }
}

impl Component for Router {
    type Props = History;

    fn name(&self) -> &'static str {
        "Router"
    }

    fn render(&self, cx: &mut RenderCx<'_>, history: &History) -> View {
        cx.use_subscription(history.addr(), |rerender| {
            history.subscribe(move |_| rerender.request())
        });
        let route = history.route();
        let key = route.id.to_string();
        View::component(
            Page {
                pages: self.pages.clone(),
            },
            route,
        )
        .key(key)
    }
}

struct Page {
    pages: PageRenderer,
}

impl Component for Page {
    type Props = Route;

    fn name(&self) -> &'static str {
        "Page"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, route: &Route) -> View {
        (self.pages)(route)
    }
}

/// An anchor that pushes `to` when clicked.
pub fn Link(history: &History, to: impl Into<String>, label: impl Into<String>) -> View {
    let to = to.into();
    let history = history.clone();
    El("a")
        .attr("href", to.clone())
        .child(Text(label))
        .on("click", move |_| history.push(to.clone()))
}
