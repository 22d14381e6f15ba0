//! Image search against an Unsplash-style API. The client carries its
//! access key in an `Authorization` header; results render as a keyed list.

use serde::Deserialize;
use trellis_core::prelude::*;

use crate::videos::SearchBar;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Urls {
    pub regular: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub urls: Urls,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    results: Vec<Image>,
}

pub fn unsplash_config(access_key: &str) -> ClientConfig {
    ClientConfig::new("https://api.unsplash.com")
        .header("Authorization", format!("Client-ID {access_key}"))
}

pub struct ImageCard;

impl Component for ImageCard {
    type Props = Image;

    fn name(&self) -> &'static str {
        "ImageCard"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, image: &Image) -> View {
        Div().child(
            El("img")
                .attr("src", image.urls.regular.clone())
                .attr("alt", image.description.clone().unwrap_or_default()),
        )
    }
}

pub struct ImageList;

impl Component for ImageList {
    type Props = Vec<Image>;

    fn name(&self) -> &'static str {
        "ImageList"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, images: &Vec<Image>) -> View {
        let cards = images
            .iter()
            .map(|image| View::component(ImageCard, image.clone()).key(image.id.clone()))
            .collect();
        Div().class("image-list").with_children(cards)
    }
}

pub struct PicsApp {
    api: Service<dyn Http>,
}

impl PicsApp {
    pub fn new(api: Service<dyn Http>) -> Self {
        Self { api }
    }
}

impl Component for PicsApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "PicsApp"
    }

    fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
        let (images, set_images) = cx.use_state(Vec::<Image>::new);
        let on_submit = {
            let api = self.api.clone();
            let spawner = cx.spawner().clone();
            cx.remember(move || {
                Callback::new(move |term: String| {
                    let api = api.clone();
                    let set_images = set_images.clone();
                    spawner
                        .spawn("search_images", async move {
                            let path = with_query("/search/photos", &[("query", term.as_str())]);
                            let found: SearchResults = api.get(&path).await?.json()?;
                            log::info!("found {} images for {term:?}", found.results.len());
                            set_images.set(found.results);
                            Ok(())
                        })
                        .detach();
                })
            })
        };

        Div()
            .class("ui container")
            .child(Div().class("ui segment").child(View::component(
                SearchBar {
                    label: "Image Search",
                },
                (*on_submit).clone(),
            )))
            .child(Text(format!("Found: {} images", images.len())))
            .child(View::component(ImageList, images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_api::FakeApi;
    use serde_json::{Value, json};

    fn photos() -> Vec<Value> {
        vec![
            json!({"id": "a1", "description": "Red car", "urls": {"regular": "https://img.test/a1"}}),
            json!({"id": "b2", "description": "Blue car", "urls": {"regular": "https://img.test/b2"}}),
            json!({"id": "c3", "description": null, "urls": {"regular": "https://img.test/c3"}}),
        ]
    }

    fn api(config: ClientConfig) -> FakeApi {
        FakeApi::new(config)
            .with("search/photos", photos())
            .enveloped("search/photos", "results")
            .require_header("Authorization", "Client-ID secret")
    }

    #[test]
    fn authorised_search_lists_matching_images() {
        let api = api(unsplash_config("secret"));
        let mut rt = Runtime::new();
        rt.mount(PicsApp::new(api.service()), ()).unwrap();
        assert!(rt.html().unwrap().contains("Found: 0 images"));

        rt.trigger("search", "input", "car").unwrap();
        rt.trigger("search-form", "submit", "").unwrap();
        let html = rt.html().unwrap();
        assert!(html.contains("Found: 2 images"));
        assert!(html.contains(r#"<img src="https://img.test/a1" alt="Red car">"#));
        assert!(!html.contains("img.test/c3"));
        assert_eq!(api.requests(), vec!["Get /search/photos?query=car"]);
    }

    #[test]
    fn narrowing_the_search_keeps_surviving_cards() {
        let api = api(unsplash_config("secret"));
        let mut rt = Runtime::new();
        rt.mount(PicsApp::new(api.service()), ()).unwrap();
        rt.trigger("search", "input", "car").unwrap();
        rt.trigger("search-form", "submit", "").unwrap();
        assert!(rt.html().unwrap().contains("Found: 2 images"));

        rt.trigger("search", "input", "blue car").unwrap();
        rt.trigger("search-form", "submit", "").unwrap();
        let card = rt.find("ImageCard").unwrap();
        assert_eq!(rt.render_count(card), Some(1));
        assert!(rt.html().unwrap().contains("Found: 1 images"));
        assert_eq!(
            api.requests().last().map(String::as_str),
            Some("Get /search/photos?query=blue%20car")
        );
    }

    #[test]
    fn a_wrong_key_is_rejected() {
        let api = api(unsplash_config("guess"));
        let mut rt = Runtime::new();
        let spawner = rt.spawner();
        rt.mount(PicsApp::new(api.service()), ()).unwrap();
        rt.trigger("search", "input", "car").unwrap();
        rt.trigger("search-form", "submit", "").unwrap();
        assert!(rt.html().unwrap().contains("Found: 0 images"));
        assert_eq!(spawner.unhandled_rejections(), 1);
    }
}
