//! The component tree: nodes, hook slots, render passes and effect commits.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use bitflags::bitflags;
use futures::executor::LocalPool;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use web_time::Instant;

use crate::component::{AnyComponent, Component, ComponentView};
use crate::dispatch::Dispatcher;
use crate::effects::{EffectSlot, IntoCleanup, PendingEffect, Subscription};
use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::state::{Setter, StateCell};
use crate::store::{Action, Interest, Store};
use crate::task::{Spawner, Task};
use crate::view::{Element, Markup, View};

new_key_type! {
    pub struct NodeId;
}

bitflags! {
    /// Why a node was scheduled for rendering.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct RenderReason: u8 {
        const MOUNT = 1;
        const PROPS = 1 << 1;
        const STATE = 1 << 2;
        const STORE = 1 << 3;
        const EXTERNAL = 1 << 4;
    }
}

/// Dirty-node queue shared by setters, store observers and rerender handles.
#[derive(Clone, Default)]
pub(crate) struct Scheduler {
    dirty: Rc<RefCell<Vec<(NodeId, RenderReason)>>>,
}

impl Scheduler {
    pub(crate) fn mark_dirty(&self, node: NodeId, reason: RenderReason) {
        let mut dirty = self.dirty.borrow_mut();
        if let Some(entry) = dirty.iter_mut().find(|(n, _)| *n == node) {
            entry.1 |= reason;
        } else {
            dirty.push((node, reason));
        }
    }

    fn take(&self) -> Vec<(NodeId, RenderReason)> {
        std::mem::take(&mut *self.dirty.borrow_mut())
    }

    fn is_idle(&self) -> bool {
        self.dirty.borrow().is_empty()
    }

    fn is_pending(&self, node: NodeId) -> bool {
        self.dirty.borrow().iter().any(|(n, _)| *n == node)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Render passes one flush may take before giving up.
    pub max_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_passes: 64 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted,
    /// Scheduled for a re-render that has not been flushed yet.
    Updating,
    Unmounted,
}

/// What one flush did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub passes: usize,
    pub renders: usize,
    pub effects: usize,
    pub elapsed: Duration,
}

impl Frame {
    fn absorb(&mut self, other: &Frame) {
        self.passes += other.passes;
        self.renders += other.renders;
        self.effects += other.effects;
        self.elapsed += other.elapsed;
    }
}

/// Handle that schedules a re-render of one node from outside a render.
#[derive(Clone)]
pub struct Rerender {
    node: NodeId,
    scheduler: Scheduler,
    reason: RenderReason,
}

impl Rerender {
    pub fn request(&self) {
        self.scheduler.mark_dirty(self.node, self.reason);
    }
}

enum Hook {
    State(Rc<dyn Any>),
    Memo(Rc<dyn Any>),
    Effect(EffectSlot),
    Subscribed { source: usize, _sub: Subscription },
}

impl Hook {
    fn label(&self) -> &'static str {
        match self {
            Hook::State(_) => "state",
            Hook::Memo(_) => "memo",
            Hook::Effect(_) => "effect",
            Hook::Subscribed { .. } => "subscription",
        }
    }
}

struct MemoCell<D, T> {
    deps: RefCell<D>,
    value: RefCell<Rc<T>>,
}

/// Reconciliation identity of a child: component kind plus key or position.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SlotKey {
    kind: TypeId,
    key: ChildKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ChildKey {
    Keyed(String),
    Indexed(usize),
}

/// Render output with child components replaced by their nodes.
enum Template {
    Text(String),
    Element(Element<Template>),
    Child(NodeId),
}

struct NodeData {
    component: Rc<dyn AnyComponent>,
    props: Rc<dyn Any>,
    depth: usize,
    hooks: Vec<Hook>,
    children: Vec<(SlotKey, NodeId)>,
    template: Vec<Template>,
    scope: Scope,
    renders: u64,
}

impl NodeData {
    fn new(cv: ComponentView, depth: usize) -> Self {
        Self {
            component: cv.component,
            props: cv.props,
            depth,
            hooks: Vec::new(),
            children: Vec::new(),
            template: Vec::new(),
            scope: Scope::new(),
            renders: 0,
        }
    }
}

/// Hook access for one render of one node.
pub struct RenderCx<'a> {
    node: NodeId,
    hooks: &'a mut Vec<Hook>,
    cursor: usize,
    scope: &'a Scope,
    scheduler: &'a Scheduler,
    spawner: &'a Spawner,
    effects: &'a mut Vec<PendingEffect>,
    first: bool,
}

impl RenderCx<'_> {
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn is_first_render(&self) -> bool {
        self.first
    }

    pub fn spawner(&self) -> &Spawner {
        self.spawner
    }

    pub fn spawn<F>(&self, label: &'static str, fut: F) -> Task
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.spawner.spawn(label, fut)
    }

    pub fn rerender_handle(&self) -> Rerender {
        Rerender {
            node: self.node,
            scheduler: self.scheduler.clone(),
            reason: RenderReason::EXTERNAL,
        }
    }

    fn next_slot(&mut self) -> usize {
        let i = self.cursor;
        self.cursor += 1;
        i
    }

    fn install(&mut self, i: usize, hook: Hook) {
        if let Some(old) = self.hooks.get_mut(i) {
            log::warn!(
                "hook slot {i} was a {} and is now a {}; re-initialising. \
                 Hooks must be called unconditionally and in the same order.",
                old.label(),
                hook.label()
            );
            let old = std::mem::replace(old, hook);
            if let Hook::Effect(slot) = old {
                slot.retire(self.scope);
            }
        } else {
            self.hooks.push(hook);
        }
    }

    /// Value created on the first render and kept for the node's lifetime.
    pub fn remember<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<T> {
        let i = self.next_slot();
        if let Some(Hook::Memo(any)) = self.hooks.get(i)
            && let Ok(rc) = any.clone().downcast::<T>()
        {
            return rc;
        }
        let rc = Rc::new(init());
        self.install(i, Hook::Memo(rc.clone()));
        rc
    }

    /// Recomputes only when `deps` changes.
    pub fn use_memo<D, T>(&mut self, deps: D, compute: impl FnOnce(&D) -> T) -> Rc<T>
    where
        D: PartialEq + 'static,
        T: 'static,
    {
        let i = self.next_slot();
        if let Some(Hook::Memo(any)) = self.hooks.get(i)
            && let Ok(cell) = any.clone().downcast::<MemoCell<D, T>>()
        {
            if *cell.deps.borrow() != deps {
                let value = Rc::new(compute(&deps));
                *cell.value.borrow_mut() = value;
                *cell.deps.borrow_mut() = deps;
            }
            return cell.value.borrow().clone();
        }
        let value = Rc::new(compute(&deps));
        let cell = MemoCell {
            deps: RefCell::new(deps),
            value: RefCell::new(value.clone()),
        };
        self.install(i, Hook::Memo(Rc::new(cell)));
        value
    }

    /// One local state cell. Returns the committed value and its setter.
    pub fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>) {
        let i = self.next_slot();
        let existing = match self.hooks.get(i) {
            Some(Hook::State(any)) => any.clone().downcast::<StateCell<T>>().ok(),
            _ => None,
        };
        let cell = match existing {
            Some(cell) => cell,
            None => {
                let cell = Rc::new(StateCell::new(init()));
                self.install(i, Hook::State(cell.clone()));
                cell
            }
        };
        let value = cell.commit();
        (value, Setter::new(&cell, self.node, self.scheduler.clone()))
    }

    fn effect_slot(&mut self) -> usize {
        let i = self.next_slot();
        if !matches!(self.hooks.get(i), Some(Hook::Effect(_))) {
            let slot = EffectSlot::new(self.scope);
            self.install(i, Hook::Effect(slot));
        }
        i
    }

    /// Runs `run` after the first commit and after any commit where `deps`
    /// differs from the value captured at its last run. The previous
    /// cleanup runs first.
    pub fn use_effect<D, R>(&mut self, deps: D, run: impl FnOnce() -> R + 'static)
    where
        D: PartialEq + 'static,
        R: IntoCleanup,
    {
        let i = self.effect_slot();
        let Some(Hook::Effect(slot)) = self.hooks.get(i) else {
            return;
        };
        if slot.is_due(Some(&deps)) {
            let effect = slot.pending(self.node, Some(deps), Box::new(move || run().into_cleanup()));
            self.effects.push(effect);
        }
    }

    /// Runs `run` after every commit of this node.
    pub fn use_effect_always<R: IntoCleanup>(&mut self, run: impl FnOnce() -> R + 'static) {
        let i = self.effect_slot();
        let Some(Hook::Effect(slot)) = self.hooks.get(i) else {
            return;
        };
        let effect = slot.pending::<()>(self.node, None, Box::new(move || run().into_cleanup()));
        self.effects.push(effect);
    }

    /// Keeps one subscription per `source`. `attach` runs again only when
    /// the source identity changes; the old subscription is dropped.
    pub fn use_subscription(
        &mut self,
        source: usize,
        attach: impl FnOnce(Rerender) -> Subscription,
    ) {
        let i = self.next_slot();
        let current = match self.hooks.get(i) {
            Some(Hook::Subscribed { source: s, .. }) => Some(*s),
            _ => None,
        };
        if current == Some(source) {
            return;
        }
        let sub = attach(self.rerender_handle());
        let hook = Hook::Subscribed { source, _sub: sub };
        if current.is_some() {
            self.hooks[i] = hook;
        } else {
            self.install(i, hook);
        }
    }

    /// Re-renders this node whenever a slice matching `interest` changes.
    /// The interest given on the first render is kept for the store.
    pub fn use_store<A: Action>(&mut self, store: &Store<A>, interest: Interest) {
        self.use_subscription(store.addr(), |rerender| {
            let rerender = Rerender {
                reason: RenderReason::STORE,
                ..rerender
            };
            store.subscribe(interest, move |_| rerender.request())
        });
    }
}

/// Owns the component tree and the local executor deferred work runs on.
pub struct Runtime {
    config: RuntimeConfig,
    pool: LocalPool,
    spawner: Spawner,
    scheduler: Scheduler,
    nodes: SlotMap<NodeId, NodeData>,
    root: Option<NodeId>,
    frames: u64,
    last_frame: Frame,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        Self {
            config,
            pool,
            spawner,
            scheduler: Scheduler::default(),
            nodes: SlotMap::with_key(),
            root: None,
            frames: 0,
            last_frame: Frame::default(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// A dispatcher whose deferred actions run on this runtime's executor.
    pub fn dispatcher<A: Action>(&self, store: Store<A>) -> Dispatcher<A> {
        Dispatcher::new(store, self.spawner.clone())
    }

    /// Mounts `component` as the root, replacing any previous root, and
    /// flushes the first render.
    pub fn mount<C: Component>(&mut self, component: C, props: C::Props) -> Result<NodeId> {
        self.unmount();
        let id = self
            .nodes
            .insert(NodeData::new(ComponentView::new(component, props), 0));
        self.root = Some(id);
        self.scheduler.mark_dirty(id, RenderReason::MOUNT);
        self.flush()?;
        Ok(id)
    }

    /// Replaces the root's props; re-renders only when they differ.
    pub fn set_root_props<P: PartialEq + 'static>(&mut self, props: P) -> Result<Frame> {
        let root = self.root.ok_or(Error::NoRoot)?;
        let node = self.nodes.get_mut(root).ok_or(Error::NoRoot)?;
        if !node.component.accepts(&props) {
            return Err(Error::PropsType(node.component.name()));
        }
        if !node.component.props_eq(&*node.props, &props) {
            node.props = Rc::new(props);
            self.scheduler.mark_dirty(root, RenderReason::PROPS);
        }
        self.flush()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Renders every dirty node, parents before children, then commits
    /// effects. Repeats while effects schedule more work.
    pub fn flush(&mut self) -> Result<Frame> {
        let started = Instant::now();
        let mut frame = Frame::default();

        loop {
            let dirty = self.scheduler.take();
            if dirty.is_empty() {
                break;
            }
            frame.passes += 1;
            if frame.passes > self.config.max_passes {
                log::error!(
                    "render loop: {} nodes still dirty after {} passes",
                    dirty.len(),
                    self.config.max_passes
                );
                return Err(Error::UpdateLoop(self.config.max_passes));
            }

            let mut queue: Vec<(usize, NodeId, RenderReason)> = dirty
                .into_iter()
                .filter_map(|(id, reason)| self.nodes.get(id).map(|n| (n.depth, id, reason)))
                .collect();
            queue.sort_by_key(|(depth, _, _)| *depth);

            let mut rendered = HashSet::new();
            let mut effects = Vec::new();
            for (_, id, reason) in queue {
                if rendered.contains(&id) || !self.nodes.contains_key(id) {
                    continue;
                }
                self.render_node(id, reason, &mut rendered, &mut effects, &mut frame)?;
            }

            log::debug!(
                "pass {}: {} renders, {} effects",
                frame.passes,
                rendered.len(),
                effects.len()
            );
            frame.effects += effects.len();
            for effect in effects {
                log::trace!("effect on {:?}", effect.node);
                effect.fire();
            }
        }

        frame.elapsed = started.elapsed();
        if frame.passes > 0 {
            self.frames += 1;
            self.last_frame = frame.clone();
        }
        Ok(frame)
    }

    /// Alternates the executor and `flush` until neither has work left.
    pub fn run_until_stalled(&mut self) -> Result<Frame> {
        let mut total = Frame::default();
        loop {
            self.pool.run_until_stalled();
            if self.scheduler.is_idle() {
                break;
            }
            let frame = self.flush()?;
            total.absorb(&frame);
        }
        Ok(total)
    }

    /// Drives the executor until `fut` resolves, then flushes.
    pub fn block_on<F: Future>(&mut self, fut: F) -> Result<F::Output> {
        let out = self.pool.run_until(fut);
        self.run_until_stalled()?;
        Ok(out)
    }

    /// Tears the tree down: children first, cleanups in reverse order.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            self.destroy(root);
        }
    }

    pub fn lifecycle(&self, id: NodeId) -> Lifecycle {
        if !self.nodes.contains_key(id) {
            Lifecycle::Unmounted
        } else if self.scheduler.is_pending(id) {
            Lifecycle::Updating
        } else {
            Lifecycle::Mounted
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn render_count(&self, id: NodeId) -> Option<u64> {
        self.nodes.get(id).map(|n| n.renders)
    }

    /// First node, in tree order, whose component has this name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        fn walk(nodes: &SlotMap<NodeId, NodeData>, id: NodeId, name: &str) -> Option<NodeId> {
            let node = nodes.get(id)?;
            if node.component.name() == name {
                return Some(id);
            }
            node.children
                .iter()
                .find_map(|(_, child)| walk(nodes, *child, name))
        }
        walk(&self.nodes, self.root?, name)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> &Frame {
        &self.last_frame
    }

    pub fn markup(&self) -> Result<Vec<Markup>> {
        let root = self.root.ok_or(Error::NoRoot)?;
        let mut out = Vec::new();
        self.resolve_node(root, &mut out);
        Ok(out)
    }

    pub fn html(&self) -> Result<String> {
        Ok(crate::view::to_html(&self.markup()?))
    }

    /// Invokes the `event` handler of the element whose `id` attribute is
    /// `target`, then runs until stalled.
    pub fn trigger(&mut self, target: &str, event: &str, value: &str) -> Result<Frame> {
        let handler = self
            .markup()?
            .iter()
            .find_map(|m| m.find_by_id(target))
            .and_then(|e| e.handler(event).cloned())
            .ok_or_else(|| Error::UnknownTarget {
                id: target.to_string(),
                event: event.to_string(),
            })?;
        log::debug!("trigger {event} on #{target}");
        handler(value);
        self.run_until_stalled()
    }

    fn render_node(
        &mut self,
        id: NodeId,
        reason: RenderReason,
        rendered: &mut HashSet<NodeId>,
        effects: &mut Vec<PendingEffect>,
        frame: &mut Frame,
    ) -> Result<()> {
        let Some(node) = self.nodes.get_mut(id) else {
            return Ok(());
        };
        let component = node.component.clone();
        let props = node.props.clone();
        let scope = node.scope.clone();
        let depth = node.depth;
        let first = node.renders == 0;
        let mut hooks = std::mem::take(&mut node.hooks);

        let mut own_effects = Vec::new();
        let view = {
            let mut cx = RenderCx {
                node: id,
                hooks: &mut hooks,
                cursor: 0,
                scope: &scope,
                scheduler: &self.scheduler,
                spawner: &self.spawner,
                effects: &mut own_effects,
                first,
            };
            component.render_any(&mut cx, &*props)
        };

        let Some(node) = self.nodes.get_mut(id) else {
            return Ok(());
        };
        node.hooks = hooks;
        node.renders += 1;
        let view = view?;
        log::debug!("render {} {:?} ({:?})", component.name(), id, reason);
        rendered.insert(id);
        frame.renders += 1;

        let mut old = std::mem::take(&mut node.children);
        let mut next = Vec::new();
        let mut to_render = Vec::new();
        let mut template = Vec::new();
        let mut position = 0;
        self.reconcile(
            view,
            depth + 1,
            &mut Reconcile {
                old: &mut old,
                next: &mut next,
                to_render: &mut to_render,
                position: &mut position,
            },
            &mut template,
        );

        // Stale children go before new ones mount.
        for (_, stale) in old {
            self.destroy(stale);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.children = next;
            node.template = template;
        }

        for (child, why) in to_render {
            self.render_node(child, why, rendered, effects, frame)?;
        }
        effects.extend(own_effects);
        Ok(())
    }

    fn reconcile(&mut self, view: View, depth: usize, rc: &mut Reconcile<'_>, out: &mut Vec<Template>) {
        match view {
            View::Empty => {}
            View::Text(t) => out.push(Template::Text(t)),
            View::Fragment(items) => {
                for item in items {
                    self.reconcile(item, depth, rc, out);
                }
            }
            View::Element(e) => {
                let mut kids = Vec::new();
                let shell = e.map_children(Vec::new());
                for child in e.children {
                    self.reconcile(child, depth, rc, &mut kids);
                }
                out.push(Template::Element(Element {
                    children: kids,
                    ..shell
                }));
            }
            View::Component(cv) => {
                let key = SlotKey {
                    kind: cv.component.kind(),
                    key: match &cv.key {
                        Some(k) => ChildKey::Keyed(k.clone()),
                        None => ChildKey::Indexed(*rc.position),
                    },
                };
                *rc.position += 1;
                if rc.next.iter().any(|(k, _)| *k == key) {
                    log::warn!("duplicate child key {:?} under one parent", key.key);
                }

                let reused = rc
                    .old
                    .iter()
                    .position(|(k, _)| *k == key)
                    .map(|i| rc.old.remove(i).1)
                    .filter(|id| self.nodes.contains_key(*id));
                let child = if let Some(id) = reused {
                    let node = &mut self.nodes[id];
                    node.component = cv.component;
                    if !node.component.props_eq(&*node.props, &*cv.props) {
                        node.props = cv.props;
                        rc.to_render.push((id, RenderReason::PROPS));
                    }
                    id
                } else {
                    let id = self.nodes.insert(NodeData::new(cv, depth));
                    rc.to_render.push((id, RenderReason::MOUNT));
                    id
                };
                rc.next.push((key, child));
                out.push(Template::Child(child));
            }
        }
    }

    fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        let scope = node.scope.clone();
        for (_, child) in children {
            self.destroy(child);
        }
        scope.dispose();
        if let Some(node) = self.nodes.remove(id) {
            log::debug!("unmount {} {:?}", node.component.name(), id);
        }
    }

    fn resolve_node(&self, id: NodeId, out: &mut Vec<Markup>) {
        if let Some(node) = self.nodes.get(id) {
            for t in &node.template {
                self.resolve(t, out);
            }
        }
    }

    fn resolve(&self, template: &Template, out: &mut Vec<Markup>) {
        match template {
            Template::Text(t) => out.push(Markup::Text(t.clone())),
            Template::Child(id) => self.resolve_node(*id, out),
            Template::Element(e) => {
                let mut kids = Vec::new();
                for c in &e.children {
                    self.resolve(c, &mut kids);
                }
                out.push(Markup::Element(e.map_children(kids)));
            }
        }
    }
}

struct Reconcile<'a> {
    old: &'a mut Vec<(SlotKey, NodeId)>,
    next: &'a mut Vec<(SlotKey, NodeId)>,
    to_render: &'a mut Vec<(NodeId, RenderReason)>,
    position: &'a mut usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.nodes.len())
            .field("frames", &self.frames)
            .field("config", &self.config)
            .finish()
    }
}
