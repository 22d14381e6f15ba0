use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::RenderCx;
use crate::view::View;

/// A node kind in the component tree.
///
/// `render` must call its hooks unconditionally and in the same order on
/// every pass. Its output is a pure function of props, hook state and the
/// store slices it reads.
pub trait Component: 'static {
    type Props: Clone + PartialEq + 'static;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &Self::Props) -> View;
}

pub(crate) trait AnyComponent {
    fn kind(&self) -> TypeId;
    fn name(&self) -> &'static str;
    fn render_any(&self, cx: &mut RenderCx<'_>, props: &dyn Any) -> Result<View>;
    fn props_eq(&self, a: &dyn Any, b: &dyn Any) -> bool;
    fn accepts(&self, props: &dyn Any) -> bool;
}

impl<C: Component> AnyComponent for C {
    fn kind(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn name(&self) -> &'static str {
        Component::name(self)
    }

    fn render_any(&self, cx: &mut RenderCx<'_>, props: &dyn Any) -> Result<View> {
        let props = props
            .downcast_ref::<C::Props>()
            .ok_or(Error::PropsType(Component::name(self)))?;
        Ok(self.render(cx, props))
    }

    fn props_eq(&self, a: &dyn Any, b: &dyn Any) -> bool {
        match (a.downcast_ref::<C::Props>(), b.downcast_ref::<C::Props>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn accepts(&self, props: &dyn Any) -> bool {
        props.is::<C::Props>()
    }
}

/// A component placed in a view, with the props it was given.
#[derive(Clone)]
pub struct ComponentView {
    pub(crate) component: Rc<dyn AnyComponent>,
    pub(crate) props: Rc<dyn Any>,
    pub(crate) key: Option<String>,
}

impl ComponentView {
    pub fn new<C: Component>(component: C, props: C::Props) -> Self {
        Self {
            component: Rc::new(component),
            props: Rc::new(props),
            key: None,
        }
    }

    pub(crate) fn with_key(mut self, key: String) -> Self {
        self.key = Some(key);
        self
    }

    pub fn name(&self) -> &'static str {
        self.component.name()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// A component written as a closure.
pub struct FnComponent<P, F> {
    name: &'static str,
    render: F,
    _props: PhantomData<fn(P)>,
}

impl<P, F: Clone> Clone for FnComponent<P, F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            render: self.render.clone(),
            _props: PhantomData,
        }
    }
}

/// ```
/// use trellis_core::prelude::*;
///
/// let greet = component("Greet", |_cx: &mut RenderCx<'_>, who: &String| {
///     Text(format!("hello {who}"))
/// });
/// let _view = View::component(greet, "ada".to_string());
/// ```
pub fn component<P, F>(name: &'static str, render: F) -> FnComponent<P, F>
where
    P: Clone + PartialEq + 'static,
    F: Fn(&mut RenderCx<'_>, &P) -> View + 'static,
{
    FnComponent {
        name,
        render,
        _props: PhantomData,
    }
}

impl<P, F> Component for FnComponent<P, F>
where
    P: Clone + PartialEq + 'static,
    F: Fn(&mut RenderCx<'_>, &P) -> View + 'static,
{
    type Props = P;

    fn name(&self) -> &'static str {
        self.name
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &P) -> View {
        (self.render)(cx, props)
    }
}
