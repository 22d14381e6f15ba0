#![allow(non_snake_case)]

use std::fmt;
use std::rc::Rc;

use crate::component::{Component, ComponentView};

/// Event handler. Receives the event value (input text; empty for clicks).
pub type Handler = Rc<dyn Fn(&str)>;

/// Prop-friendly callback: equality is identity, so a memoised callback
/// does not force a re-render.
pub struct Callback<T = ()>(Rc<dyn Fn(T)>);

impl<T> Callback<T> {
    pub fn new(f: impl Fn(T) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, value: T) {
        (self.0)(value)
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(<fn>)")
    }
}

/// A tag with attributes, handlers and children of type `C`.
#[derive(Clone)]
pub struct Element<C> {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub handlers: Vec<(&'static str, Handler)>,
    pub children: Vec<C>,
}

impl<C> Element<C> {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            handlers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn handler(&self, event: &str) -> Option<&Handler> {
        self.handlers
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, h)| h)
    }

    pub(crate) fn map_children<D>(&self, children: Vec<D>) -> Element<D> {
        Element {
            tag: self.tag,
            attrs: self.attrs.clone(),
            handlers: self.handlers.clone(),
            children,
        }
    }
}

/// What a component's render returns: markup mixed with child components.
#[derive(Clone, Default)]
pub enum View {
    #[default]
    Empty,
    Text(String),
    Element(Element<View>),
    Component(ComponentView),
    Fragment(Vec<View>),
}

impl View {
    pub fn component<C: Component>(component: C, props: C::Props) -> View {
        View::Component(ComponentView::new(component, props))
    }

    /// Keys a component view; other views are returned unchanged.
    pub fn key(self, key: impl Into<String>) -> View {
        match self {
            View::Component(cv) => View::Component(cv.with_key(key.into())),
            other => other,
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> View {
        match &mut self {
            View::Element(e) => {
                let value = value.into();
                if let Some(slot) = e.attrs.iter_mut().find(|(k, _)| *k == name) {
                    slot.1 = value;
                } else {
                    e.attrs.push((name, value));
                }
            }
            _ => log::warn!("attr `{name}` set on a non-element view; ignored"),
        }
        self
    }

    pub fn id(self, id: impl Into<String>) -> View {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> View {
        self.attr("class", class)
    }

    pub fn on(mut self, event: &'static str, handler: impl Fn(&str) + 'static) -> View {
        match &mut self {
            View::Element(e) => e.handlers.push((event, Rc::new(handler))),
            _ => log::warn!("handler `{event}` set on a non-element view; ignored"),
        }
        self
    }

    pub fn child(mut self, child: View) -> View {
        match &mut self {
            View::Element(e) => e.children.push(child),
            View::Fragment(items) => items.push(child),
            _ => log::warn!("child added to a leaf view; ignored"),
        }
        self
    }

    pub fn with_children(mut self, kids: Vec<View>) -> View {
        match &mut self {
            View::Element(e) => e.children = kids,
            View::Fragment(items) => *items = kids,
            _ => log::warn!("children set on a leaf view; ignored"),
        }
        self
    }
}

impl From<&str> for View {
    fn from(s: &str) -> Self {
        View::Text(s.to_string())
    }
}

impl From<String> for View {
    fn from(s: String) -> Self {
        View::Text(s)
    }
}

pub fn El(tag: &'static str) -> View {
    View::Element(Element::new(tag))
}

pub fn Div() -> View {
    El("div")
}

pub fn Text(text: impl Into<String>) -> View {
    View::Text(text.into())
}

pub fn Fragment(items: Vec<View>) -> View {
    View::Fragment(items)
}

pub fn Button(label: impl Into<String>, on_click: impl Fn() + 'static) -> View {
    El("button")
        .child(Text(label))
        .on("click", move |_| on_click())
}

/// Controlled text input: shows `value`, reports edits through `on_input`.
pub fn Input(value: impl Into<String>, on_input: impl Fn(String) + 'static) -> View {
    El("input")
        .attr("value", value)
        .on("input", move |v| on_input(v.to_string()))
}

/// Resolved output: the component tree flattened into tags and text.
#[derive(Clone)]
pub enum Markup {
    Text(String),
    Element(Element<Markup>),
}

impl Markup {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Markup::Text(t) => escape_into(t, out),
            Markup::Element(e) => {
                out.push('<');
                out.push_str(e.tag);
                for (k, v) in &e.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_into(v, out);
                    out.push('"');
                }
                out.push('>');
                for c in &e.children {
                    c.write_html(out);
                }
                out.push_str("</");
                out.push_str(e.tag);
                out.push('>');
            }
        }
    }

    /// Concatenated text content.
    pub fn text(&self) -> String {
        match self {
            Markup::Text(t) => t.clone(),
            Markup::Element(e) => e.children.iter().map(Markup::text).collect(),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element<Markup>> {
        match self {
            Markup::Text(_) => None,
            Markup::Element(e) => {
                if e.attr("id") == Some(id) {
                    return Some(e);
                }
                e.children.iter().find_map(|c| c.find_by_id(id))
            }
        }
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

fn escape_into(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

pub fn to_html(items: &[Markup]) -> String {
    items.iter().map(Markup::to_html).collect()
}
