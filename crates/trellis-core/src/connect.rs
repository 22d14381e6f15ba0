//! Binds a component to store slices through a selector.

use std::rc::Rc;

use crate::component::{AnyComponent, Component, ComponentView};
use crate::dispatch::Dispatcher;
use crate::runtime::RenderCx;
use crate::store::{Action, Interest, Store};
use crate::view::View;

type Select<A, P, Q> = Rc<dyn Fn(&Store<A>, &P, &Dispatcher<A>) -> Q>;

/// A component whose props are the *own props* `P` of the binding.
///
/// Each render merges store data, own props and the dispatcher into the
/// inner component's props. The inner component is reconciled like any
/// child, so it re-renders only when the merged props change.
pub struct Connect<A: Action, P, C: Component> {
    dispatcher: Dispatcher<A>,
    interest: Interest,
    select: Select<A, P, C::Props>,
    inner: Rc<C>,
}

impl<A, P, C> Connect<A, P, C>
where
    A: Action,
    P: Clone + PartialEq + 'static,
    C: Component,
{
    pub fn new(
        dispatcher: Dispatcher<A>,
        interest: Interest,
        select: impl Fn(&Store<A>, &P, &Dispatcher<A>) -> C::Props + 'static,
        inner: C,
    ) -> Self {
        Self {
            dispatcher,
            interest,
            select: Rc::new(select),
            inner: Rc::new(inner),
        }
    }

    pub fn interest(&self) -> &Interest {
        &self.interest
    }
}

impl<A: Action, P, C: Component> Clone for Connect<A, P, C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            interest: self.interest.clone(),
            select: self.select.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<A, P, C> Component for Connect<A, P, C>
where
    A: Action,
    P: Clone + PartialEq + 'static,
    C: Component,
{
    type Props = P;

    fn name(&self) -> &'static str {
        "Connect"
    }

    fn render(&self, cx: &mut RenderCx<'_>, own: &P) -> View {
        let store = self.dispatcher.get_state();
        cx.use_store(store, self.interest.clone());
        let merged = (self.select)(store, own, &self.dispatcher);
        let inner: Rc<dyn AnyComponent> = self.inner.clone();
        View::Component(ComponentView {
            component: inner,
            props: Rc::new(merged),
            key: None,
        })
    }
}

/// Shorthand for [`Connect::new`].
pub fn connect<A, P, C>(
    dispatcher: &Dispatcher<A>,
    interest: Interest,
    select: impl Fn(&Store<A>, &P, &Dispatcher<A>) -> C::Props + 'static,
    inner: C,
) -> Connect<A, P, C>
where
    A: Action,
    P: Clone + PartialEq + 'static,
    C: Component,
{
    Connect::new(dispatcher.clone(), interest, select, inner)
}
