#![allow(non_snake_case)]
//! Season from the visitor's latitude and the month, through a custom
//! location hook.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    fn class(self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Winter => "winter",
        }
    }

    fn text(self) -> &'static str {
        match self {
            Season::Summer => "Let's hit the beach!",
            Season::Winter => "Burr, it is chilly!",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Season::Summer => "sun",
            Season::Winter => "snowflake",
        }
    }
}

/// `month` is zero-based: April through September is summer in the north.
pub fn season(latitude: f64, month: u32) -> Season {
    let northern = latitude > 0.0;
    if (3..=8).contains(&month) == northern {
        Season::Summer
    } else {
        Season::Winter
    }
}

/// Asks for the position once, after the first commit. Returns the latitude
/// once known and the error message, empty until something fails.
pub fn use_location(cx: &mut RenderCx<'_>, geo: &Service<dyn Geolocation>) -> (Option<f64>, String) {
    let (latitude, set_latitude) = cx.use_state(|| None::<f64>);
    let (error, set_error) = cx.use_state(String::new);
    let geo = geo.clone();
    cx.use_effect((), move || {
        geo.get_current_position(
            Box::new(move |pos: Position| set_latitude.set(Some(pos.latitude))),
            Box::new(move |err: GeoError| set_error.set(err.message)),
        );
    });
    (latitude, error)
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeasonProps {
    pub latitude: f64,
    pub month: u32,
}

pub struct SeasonDisplay;

impl Component for SeasonDisplay {
    type Props = SeasonProps;

    fn name(&self) -> &'static str {
        "SeasonDisplay"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, p: &SeasonProps) -> View {
        let s = season(p.latitude, p.month);
        let icon = || El("i").class(format!("massive {} icon", s.icon()));
        Div()
            .class(format!("season-display {}", s.class()))
            .child(icon())
            .child(El("h1").child(Text(s.text())))
            .child(icon())
    }
}

pub fn Spinner(message: &str) -> View {
    Div()
        .class("ui active dimmer")
        .child(Div().class("ui big text loader").child(Text(message)))
}

/// Props: the current month, zero-based.
pub struct SeasonsApp {
    geo: Service<dyn Geolocation>,
}

impl SeasonsApp {
    pub fn new(geo: Service<dyn Geolocation>) -> Self {
        Self { geo }
    }
}

impl Component for SeasonsApp {
    type Props = u32;

    fn name(&self) -> &'static str {
        "SeasonsApp"
    }

    fn render(&self, cx: &mut RenderCx<'_>, month: &u32) -> View {
        let (latitude, error) = use_location(cx, &self.geo);
        if !error.is_empty() {
            return Div().child(Text(format!("Error: {error}")));
        }
        match latitude {
            Some(latitude) => View::component(
                SeasonDisplay,
                SeasonProps {
                    latitude,
                    month: *month,
                },
            ),
            None => Spinner("Please accept location request"),
        }
    }
}

type Pending = (Box<dyn FnOnce(Position)>, Box<dyn FnOnce(GeoError)>);

/// Geolocation that holds each request until it is answered, like a
/// permission prompt.
#[derive(Default)]
pub struct PromptedLocation {
    pending: RefCell<Option<Pending>>,
    asked: Cell<u32>,
}

impl PromptedLocation {
    pub fn service(self: &Rc<Self>) -> Service<dyn Geolocation> {
        Service::from_rc(self.clone() as Rc<dyn Geolocation>)
    }

    pub fn asked(&self) -> u32 {
        self.asked.get()
    }

    /// Answers the open request; false when nothing was asked.
    pub fn resolve(&self, position: Position) -> bool {
        let pending = self.pending.borrow_mut().take();
        match pending {
            Some((ok, _)) => {
                ok(position);
                true
            }
            None => false,
        }
    }

    pub fn reject(&self, message: &str) -> bool {
        let pending = self.pending.borrow_mut().take();
        match pending {
            Some((_, err)) => {
                err(GeoError::new(message));
                true
            }
            None => false,
        }
    }
}

impl Geolocation for PromptedLocation {
    fn get_current_position(
        &self,
        on_success: Box<dyn FnOnce(Position)>,
        on_error: Box<dyn FnOnce(GeoError)>,
    ) {
        self.asked.set(self.asked.get() + 1);
        *self.pending.borrow_mut() = Some((on_success, on_error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(latitude: f64) -> Position {
        Position {
            latitude,
            longitude: 4.9,
        }
    }

    #[test]
    fn season_flips_across_the_equator() {
        assert_eq!(season(52.3, 6), Season::Summer);
        assert_eq!(season(-33.9, 6), Season::Winter);
        assert_eq!(season(52.3, 0), Season::Winter);
        assert_eq!(season(-33.9, 11), Season::Summer);
        assert_eq!(season(10.0, 2), Season::Winter);
        assert_eq!(season(10.0, 3), Season::Summer);
        assert_eq!(season(10.0, 8), Season::Summer);
        assert_eq!(season(10.0, 9), Season::Winter);
    }

    #[test]
    fn spinner_until_the_position_arrives() {
        let geo = Rc::new(PromptedLocation::default());
        let mut rt = Runtime::new();
        rt.mount(SeasonsApp::new(geo.service()), 6).unwrap();
        assert!(rt.html().unwrap().contains("Please accept location request"));

        assert!(geo.resolve(at(52.3)));
        rt.flush().unwrap();
        insta::assert_snapshot!(
            rt.html().unwrap(),
            @r#"<div class="season-display summer"><i class="massive sun icon"></i><h1>Let's hit the beach!</h1><i class="massive sun icon"></i></div>"#
        );
    }

    #[test]
    fn location_is_requested_once_across_renders() {
        let geo = Rc::new(PromptedLocation::default());
        let mut rt = Runtime::new();
        rt.mount(SeasonsApp::new(geo.service()), 6).unwrap();
        geo.resolve(at(-33.9));
        rt.flush().unwrap();
        assert!(rt.html().unwrap().contains("season-display winter"));

        rt.set_root_props(0u32).unwrap();
        assert!(rt.html().unwrap().contains("season-display summer"));
        assert_eq!(geo.asked(), 1);
    }

    #[test]
    fn denied_permission_shows_the_error() {
        let geo = Rc::new(PromptedLocation::default());
        let mut rt = Runtime::new();
        rt.mount(SeasonsApp::new(geo.service()), 6).unwrap();
        geo.reject("User denied Geolocation");
        rt.flush().unwrap();
        assert_eq!(rt.html().unwrap(), "<div>Error: User denied Geolocation</div>");
    }

    #[test]
    fn an_answer_after_unmount_is_ignored() {
        let geo = Rc::new(PromptedLocation::default());
        let mut rt = Runtime::new();
        rt.mount(SeasonsApp::new(geo.service()), 6).unwrap();
        rt.unmount();
        assert!(geo.resolve(at(1.0)));
        assert_eq!(rt.node_count(), 0);
    }
}
