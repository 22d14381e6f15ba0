//! # Stores, Components, and Effects
//!
//! Trellis is a small single-threaded runtime for deriving UI output from
//! state. There are three main pieces:
//!
//! - [`Store`]: named slices of application state, changed only by
//!   dispatching actions through pure reducers.
//! - [`Component`]: a node in a tree that renders a [`View`] from its props,
//!   local state cells and the store slices it reads.
//! - Effects: side-effects keyed by dependencies, with cleanups that run
//!   before each re-run and when the node goes away.
//!
//! ## Local state
//!
//! Hooks are called on the [`RenderCx`] in a fixed order. The Nth call always
//! refers to the Nth slot of the node:
//!
//! ```rust
//! use trellis_core::prelude::*;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     type Props = ();
//!
//!     fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
//!         let (count, set_count) = cx.use_state(|| 0);
//!         Div().child(Text(format!("Count = {count}"))).child(
//!             Button("+1", move || set_count.update(|n| n + 1)).id("inc"),
//!         )
//!     }
//! }
//!
//! let mut rt = Runtime::new();
//! rt.mount(Counter, ()).unwrap();
//! rt.trigger("inc", "click", "").unwrap();
//! assert_eq!(
//!     rt.html().unwrap(),
//!     r#"<div>Count = 1<button id="inc">+1</button></div>"#
//! );
//! ```
//!
//! Setters never change the value mid-render: updates queue up and apply,
//! in order, at the start of the node's next render.
//!
//! ## Effects and cleanup
//!
//! `use_effect(deps, run)` runs after the render pass commits, and again
//! only when `deps` changes. Returning a [`Dispose`] registers the cleanup:
//!
//! ```rust
//! use trellis_core::prelude::*;
//!
//! fn Ticker(cx: &mut RenderCx<'_>, id: &u32) -> View {
//!     let id = *id;
//!     cx.use_effect(id, move || {
//!         log::info!("watching {id}");
//!         on_unmount(move || log::info!("stopped watching {id}"))
//!     });
//!     Text(format!("#{id}"))
//! }
//! # let _ = component("Ticker", Ticker);
//! ```
//!
//! - `()` deps run once after mount.
//! - `use_effect_always` runs after every render.
//! - Cleanups run in reverse registration order when a node is destroyed,
//!   children before their parents.
//!
//! ## Deferred actions
//!
//! A [`Dispatcher`] applies plain actions synchronously and spawns
//! [`deferred`] computations on the runtime's local executor. The returned
//! [`Task`] can be awaited, cancelled, or turned into an effect cleanup with
//! [`Task::cancel_on_dispose`].

pub mod collab;
pub mod component;
pub mod connect;
pub mod dispatch;
pub mod effects;
pub mod error;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod state;
pub mod store;
pub mod task;
pub mod view;

#[cfg(test)]
mod tests;

pub use component::*;
pub use connect::*;
pub use dispatch::*;
pub use effects::*;
pub use error::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use state::*;
pub use store::*;
pub use task::*;
pub use view::*;
