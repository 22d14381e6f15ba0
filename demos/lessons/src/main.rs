use std::rc::Rc;

use serde_json::json;
use trellis_core::prelude::*;
use trellis_devtools::{ActionLog, Inspector};
use trellis_navigation::History;

use lessons::fake_api::FakeApi;
use lessons::{blog, comments, pics, resources, seasons, songs, streams, translate, videos};

fn show(name: &str, rt: &Runtime, inspector: &mut Inspector) -> anyhow::Result<()> {
    log::info!("[{name}] {}", rt.html()?);
    if let Some(line) = inspector.frame(rt) {
        log::info!("[{name}] {line}");
    }
    Ok(())
}

fn run_songs(inspector: &mut Inspector) -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    let d = rt.dispatcher(songs::store()?);
    rt.mount(songs::SongsApp::new(&d), ())?;
    rt.trigger("select-2", "click", "")?;
    show("songs", &rt, inspector)
}

fn run_blog(inspector: &mut Inspector) -> anyhow::Result<()> {
    let api = FakeApi::new(ClientConfig::new("https://jsonplaceholder.typicode.com"))
        .with(
            "posts",
            vec![
                json!({"id": 1, "userId": 1, "title": "sunt aut facere", "body": "quia et suscipit"}),
                json!({"id": 2, "userId": 2, "title": "qui est esse", "body": "est rerum tempore"}),
            ],
        )
        .with(
            "users",
            vec![
                json!({"id": 1, "name": "Leanne Graham"}),
                json!({"id": 2, "name": "Ervin Howell"}),
            ],
        );
    let mut rt = Runtime::new();
    let d = rt.dispatcher(blog::store()?);
    rt.mount(blog::post_list(&d), api.service())?;
    rt.run_until_stalled()?;
    show("blog", &rt, inspector)
}

fn run_streams(inspector: &mut Inspector) -> anyhow::Result<()> {
    let api = FakeApi::new(ClientConfig::new("http://localhost:3001")).with(
        "streams",
        vec![json!({"id": 1, "title": "Rust live", "description": "borrowck", "userId": "me"})],
    );
    let actions = ActionLog::new(16);
    let mut rt = Runtime::new();
    let env = streams::Env {
        dispatcher: rt.dispatcher(streams::store(actions.clone())?),
        api: api.service(),
        history: History::new("/"),
    };
    rt.mount(streams::StreamsApp::new(env.clone(), "me"), ())?;
    rt.run_until_stalled()?;
    rt.trigger("sign-in", "click", "")?;
    rt.trigger("create", "click", "")?;
    rt.trigger("title", "input", "Chess")?;
    rt.trigger("description", "input", "Openings")?;
    rt.trigger("submit", "click", "")?;
    show("streams", &rt, inspector)?;

    let saved = env.history.to_json();
    log::info!("[streams] history {saved}; actions {:?}", actions.kinds());
    Ok(())
}

fn run_seasons(inspector: &mut Inspector) -> anyhow::Result<()> {
    let geo = Rc::new(seasons::PromptedLocation::default());
    let mut rt = Runtime::new();
    rt.mount(seasons::SeasonsApp::new(geo.service()), 6)?;
    geo.resolve(Position {
        latitude: 52.37,
        longitude: 4.89,
    });
    rt.flush()?;
    show("seasons", &rt, inspector)
}

fn run_resources(inspector: &mut Inspector) -> anyhow::Result<()> {
    let api = FakeApi::new(ClientConfig::new("https://jsonplaceholder.typicode.com"))
        .with("posts", vec![json!({"id": 1, "title": "a post"})])
        .with("todos", vec![json!({"id": 1, "title": "a todo"})]);
    let mut rt = Runtime::new();
    rt.mount(resources::ResourcesApp::new(api.service()), ())?;
    rt.run_until_stalled()?;
    rt.trigger("todos", "click", "")?;
    show("resources", &rt, inspector)
}

fn run_translate(inspector: &mut Inspector) -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    rt.mount(translate::TranslateApp, ())?;
    rt.trigger("dutch", "click", "")?;
    show("translate", &rt, inspector)
}

fn run_videos(inspector: &mut Inspector) -> anyhow::Result<()> {
    let key = std::env::var("YOUTUBE_KEY").unwrap_or_else(|_| "demo".into());
    let api = FakeApi::new(videos::search_config(&key)).with(
        "search",
        vec![
            json!({"id": 1, "title": "Tall buildings", "description": "skyline"}),
            json!({"id": 2, "title": "Surfing", "description": "waves"}),
        ],
    );
    let mut rt = Runtime::new();
    rt.mount(videos::VideosApp::new(api.service()), ())?;
    rt.run_until_stalled()?;
    rt.trigger("search", "input", "surf")?;
    rt.trigger("search-form", "submit", "")?;
    show("videos", &rt, inspector)
}

fn run_comments(inspector: &mut Inspector) -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    rt.mount(comments::CommentsApp, comments::sample_comments())?;
    rt.trigger("approve-sam", "click", "")?;
    show("comments", &rt, inspector)
}

fn run_pics(inspector: &mut Inspector) -> anyhow::Result<()> {
    let key = std::env::var("UNSPLASH_ACCESS_KEY").unwrap_or_else(|_| "demo".into());
    let api = FakeApi::new(pics::unsplash_config(&key))
        .with(
            "search/photos",
            vec![
                json!({"id": "x1", "description": "Mountain lake", "urls": {"regular": "https://images.unsplash.com/x1"}}),
                json!({"id": "x2", "description": "City at night", "urls": {"regular": "https://images.unsplash.com/x2"}}),
            ],
        )
        .enveloped("search/photos", "results")
        .require_header("Authorization", &format!("Client-ID {key}"));
    let mut rt = Runtime::new();
    rt.mount(pics::PicsApp::new(api.service()), ())?;
    rt.trigger("search", "input", "mountain")?;
    rt.trigger("search-form", "submit", "")?;
    show("pics", &rt, inspector)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut inspector = Inspector::new();
    run_comments(&mut inspector)?;
    run_songs(&mut inspector)?;
    run_pics(&mut inspector)?;
    run_blog(&mut inspector)?;
    run_streams(&mut inspector)?;
    run_seasons(&mut inspector)?;
    run_resources(&mut inspector)?;
    run_translate(&mut inspector)?;
    run_videos(&mut inspector)?;
    Ok(())
}
