//! A form whose labels follow the selected language. The language is handed
//! down as a prop to every component that shows text.

use trellis_core::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Dutch,
}

impl Language {
    fn flag(self) -> &'static str {
        match self {
            Language::English => "us",
            Language::Dutch => "nl",
        }
    }

    fn id(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Dutch => "dutch",
        }
    }

    fn name_label(self) -> &'static str {
        match self {
            Language::English => "Name",
            Language::Dutch => "Naam",
        }
    }

    fn submit_label(self) -> &'static str {
        match self {
            Language::English => "Submit",
            Language::Dutch => "Voorleggen",
        }
    }
}

pub struct Field;

impl Component for Field {
    type Props = Language;

    fn name(&self) -> &'static str {
        "Field"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, language: &Language) -> View {
        Div()
            .class("ui field")
            .child(El("label").child(Text(language.name_label())))
            .child(El("input"))
    }
}

pub struct SubmitButton;

impl Component for SubmitButton {
    type Props = Language;

    fn name(&self) -> &'static str {
        "SubmitButton"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, language: &Language) -> View {
        El("button")
            .class("ui button primary")
            .child(Text(language.submit_label()))
    }
}

pub struct UserCreate;

impl Component for UserCreate {
    type Props = Language;

    fn name(&self) -> &'static str {
        "UserCreate"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, language: &Language) -> View {
        El("form")
            .class("ui form")
            .child(View::component(Field, *language))
            .child(View::component(SubmitButton, *language))
    }
}

pub struct TranslateApp;

impl Component for TranslateApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "TranslateApp"
    }

    fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
        let (language, set_language) = cx.use_state(Language::default);
        let flag = |lang: Language| {
            let set = set_language.clone();
            El("i")
                .class(format!("flag {}", lang.flag()))
                .id(lang.id())
                .on("click", move |_| set.set(lang))
        };
        Div()
            .class("ui container")
            .child(
                Div()
                    .child(Text("Select a language: "))
                    .child(flag(Language::English))
                    .child(flag(Language::Dutch)),
            )
            .child(View::component(UserCreate, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_the_selected_language() {
        let mut rt = Runtime::new();
        rt.mount(TranslateApp, ()).unwrap();
        let html = rt.html().unwrap();
        assert!(html.contains("<label>Name</label>"));
        assert!(html.contains(">Submit</button>"));

        rt.trigger("dutch", "click", "").unwrap();
        let form = rt.find("UserCreate").unwrap();
        assert_eq!(rt.render_count(form), Some(2));
        let html = rt.html().unwrap();
        let start = html.find("<form").unwrap();
        insta::assert_snapshot!(
            &html[start..html.len() - "</div>".len()],
            @r#"<form class="ui form"><div class="ui field"><label>Naam</label><input></input></div><button class="ui button primary">Voorleggen</button></form>"#
        );
    }

    #[test]
    fn picking_the_current_language_leaves_children_alone() {
        let mut rt = Runtime::new();
        rt.mount(TranslateApp, ()).unwrap();
        rt.trigger("english", "click", "").unwrap();
        let field = rt.find("Field").unwrap();
        assert_eq!(rt.render_count(field), Some(1));
        assert_eq!(rt.render_count(rt.root().unwrap()), Some(2));
    }
}
