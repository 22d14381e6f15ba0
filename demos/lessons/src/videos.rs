//! Video search: a controlled search box, a result list and the selected
//! video. A default search runs on mount.

use serde::Deserialize;
use trellis_core::prelude::*;

pub const DEFAULT_SEARCH: &str = "buildings";

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Video {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Client settings for the search endpoint; every request carries these
/// query params.
pub fn search_config(key: &str) -> ClientConfig {
    ClientConfig::new("https://www.googleapis.com/youtube/v3")
        .param("part", "snippet")
        .param("maxResults", "5")
        .param("key", key)
}

/// Controlled search box; submitting hands the term to the callback.
pub struct SearchBar {
    pub label: &'static str,
}

impl Component for SearchBar {
    type Props = Callback<String>;

    fn name(&self) -> &'static str {
        "SearchBar"
    }

    fn render(&self, cx: &mut RenderCx<'_>, on_submit: &Callback<String>) -> View {
        let (term, set_term) = cx.use_state(String::new);
        let submit = on_submit.clone();
        let current = term.clone();
        El("form")
            .class("ui form")
            .id("search-form")
            .on("submit", move |_| submit.call(current.clone()))
            .child(
                Div()
                    .class("field")
                    .child(El("label").child(Text(self.label)))
                    .child(Input(term, move |v| set_term.set(v)).id("search")),
            )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VideoItemProps {
    pub video: Video,
    pub on_select: Callback<Video>,
}

pub struct VideoItem;

impl Component for VideoItem {
    type Props = VideoItemProps;

    fn name(&self) -> &'static str {
        "VideoItem"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, p: &VideoItemProps) -> View {
        let on_select = p.on_select.clone();
        let video = p.video.clone();
        Div()
            .class("video-item item")
            .id(format!("video-{}", p.video.id))
            .on("click", move |_| on_select.call(video.clone()))
            .child(Div().class("header").child(Text(p.video.title.clone())))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VideoListProps {
    pub videos: Vec<Video>,
    pub on_select: Callback<Video>,
}

pub struct VideoList;

impl Component for VideoList {
    type Props = VideoListProps;

    fn name(&self) -> &'static str {
        "VideoList"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, p: &VideoListProps) -> View {
        let items = p
            .videos
            .iter()
            .map(|video| {
                View::component(
                    VideoItem,
                    VideoItemProps {
                        video: video.clone(),
                        on_select: p.on_select.clone(),
                    },
                )
                .key(video.id.to_string())
            })
            .collect();
        Div().class("ui relaxed divided list").with_children(items)
    }
}

pub struct VideoDetail;

impl Component for VideoDetail {
    type Props = Option<Video>;

    fn name(&self) -> &'static str {
        "VideoDetail"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, video: &Option<Video>) -> View {
        match video {
            None => Div().child(Text("Loading...")),
            Some(v) => Div()
                .class("ui segment")
                .child(El("h4").class("ui header").child(Text(v.title.clone())))
                .child(El("p").child(Text(v.description.clone()))),
        }
    }
}

pub struct VideosApp {
    api: Service<dyn Http>,
}

impl VideosApp {
    pub fn new(api: Service<dyn Http>) -> Self {
        Self { api }
    }
}

impl Component for VideosApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "VideosApp"
    }

    fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
        let (videos, set_videos) = cx.use_state(Vec::<Video>::new);
        let (selected, set_selected) = cx.use_state(|| None::<Video>);

        let search = {
            let api = self.api.clone();
            let spawner = cx.spawner().clone();
            let set_selected = set_selected.clone();
            cx.remember(move || {
                Callback::new(move |term: String| {
                    let api = api.clone();
                    let set_videos = set_videos.clone();
                    let set_selected = set_selected.clone();
                    spawner
                        .spawn("search_videos", async move {
                            let path = with_query("/search", &[("q", term.as_str())]);
                            let found: Vec<Video> = api.get(&path).await?.json()?;
                            set_selected.set(found.first().cloned());
                            set_videos.set(found);
                            Ok(())
                        })
                        .detach();
                })
            })
        };
        let on_select = cx.remember(move || Callback::new(move |v: Video| set_selected.set(Some(v))));

        let initial = (*search).clone();
        cx.use_effect((), move || initial.call(DEFAULT_SEARCH.to_string()));

        Div()
            .class("ui container")
            .child(View::component(
                SearchBar {
                    label: "Video Search",
                },
                (*search).clone(),
            ))
            .child(
                Div()
                    .class("ui grid")
                    .child(
                        Div()
                            .class("eleven wide column")
                            .child(View::component(VideoDetail, selected)),
                    )
                    .child(Div().class("five wide column").child(View::component(
                        VideoList,
                        VideoListProps {
                            videos,
                            on_select: (*on_select).clone(),
                        },
                    ))),
            )
    }
}
