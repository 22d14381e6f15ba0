//! A fixed playlist and a selection, each in its own slice. Both panels are
//! connected components.

use std::rc::Rc;

use trellis_core::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    pub title: &'static str,
    pub duration: &'static str,
}

pub fn playlist() -> Vec<Song> {
    vec![
        Song {
            title: "No Scrubs",
            duration: "4:05",
        },
        Song {
            title: "Macarena",
            duration: "2:30",
        },
        Song {
            title: "All Star",
            duration: "3:15",
        },
        Song {
            title: "I Want it That Way",
            duration: "1:45",
        },
    ]
}

#[derive(Clone, Debug)]
pub enum SongAction {
    Selected(Song),
}

impl Action for SongAction {
    fn kind(&self) -> &'static str {
        match self {
            SongAction::Selected(_) => "SONG_SELECTED",
        }
    }
}

fn selected_song(_: &Option<Song>, action: &SongAction) -> Option<Song> {
    match action {
        SongAction::Selected(song) => Some(song.clone()),
    }
}

pub fn store() -> anyhow::Result<Store<SongAction>> {
    let store = Store::builder()
        .constant("songs", playlist())
        .slice("selected_song", None, whole, selected_song)
        .build()?;
    Ok(store)
}

#[derive(Clone, PartialEq)]
pub struct SongListProps {
    pub songs: Rc<Vec<Song>>,
    pub dispatcher: Dispatcher<SongAction>,
}

pub struct SongList;

impl Component for SongList {
    type Props = SongListProps;

    fn name(&self) -> &'static str {
        "SongList"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, props: &SongListProps) -> View {
        let rows = props
            .songs
            .iter()
            .enumerate()
            .map(|(i, song)| {
                let d = props.dispatcher.clone();
                let picked = song.clone();
                Div()
                    .class("item")
                    .child(
                        Button("Select", move || {
                            d.dispatch(SongAction::Selected(picked.clone()));
                        })
                        .id(format!("select-{i}")),
                    )
                    .child(Text(song.title))
            })
            .collect();
        Div().class("ui divided list").with_children(rows)
    }
}

pub struct SongDetail;

impl Component for SongDetail {
    type Props = Option<Song>;

    fn name(&self) -> &'static str {
        "SongDetail"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, song: &Option<Song>) -> View {
        match song {
            None => Div().child(Text("Please select a song")),
            Some(song) => Div()
                .child(El("h3").child(Text("Details for:")))
                .child(El("p").child(Text(format!("Title: {}", song.title))))
                .child(El("p").child(Text(format!("Duration: {}", song.duration)))),
        }
    }
}

pub fn song_list(d: &Dispatcher<SongAction>) -> Connect<SongAction, (), SongList> {
    connect(
        d,
        Interest::slices(["songs"]),
        |store: &Store<SongAction>, _: &(), d: &Dispatcher<SongAction>| SongListProps {
            songs: store.get_slice::<Vec<Song>>("songs").unwrap_or_default(),
            dispatcher: d.clone(),
        },
        SongList,
    )
}

pub fn song_detail(d: &Dispatcher<SongAction>) -> Connect<SongAction, (), SongDetail> {
    connect(
        d,
        Interest::slices(["selected_song"]),
        |store: &Store<SongAction>, _: &(), _: &Dispatcher<SongAction>| {
            store
                .get_slice::<Option<Song>>("selected_song")
                .and_then(|s| (*s).clone())
        },
        SongDetail,
    )
}

pub struct SongsApp {
    list: Connect<SongAction, (), SongList>,
    detail: Connect<SongAction, (), SongDetail>,
}

impl SongsApp {
    pub fn new(d: &Dispatcher<SongAction>) -> Self {
        Self {
            list: song_list(d),
            detail: song_detail(d),
        }
    }
}

impl Component for SongsApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "SongsApp"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, _: &()) -> View {
        Div()
            .class("ui container grid")
            .child(View::component(self.list.clone(), ()))
            .child(View::component(self.detail.clone(), ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Runtime, Dispatcher<SongAction>) {
        let rt = Runtime::new();
        let d = rt.dispatcher(store().unwrap());
        (rt, d)
    }

    #[test]
    fn detail_asks_for_a_selection_first() {
        let (mut rt, d) = setup();
        rt.mount(song_detail(&d), ()).unwrap();
        insta::assert_snapshot!(rt.html().unwrap(), @"<div>Please select a song</div>");
    }

    #[test]
    fn selecting_a_song_renders_only_the_detail() {
        let (mut rt, d) = setup();
        rt.mount(SongsApp::new(&d), ()).unwrap();
        let list = rt.find("SongList").unwrap();
        let detail = rt.find("SongDetail").unwrap();

        rt.trigger("select-1", "click", "").unwrap();
        let html = rt.html().unwrap();
        assert!(html.contains("<p>Title: Macarena</p><p>Duration: 2:30</p>"));
        assert_eq!(rt.render_count(list), Some(1));
        assert_eq!(rt.render_count(detail), Some(2));

        // same song again: slice value unchanged, nothing re-renders
        rt.trigger("select-1", "click", "").unwrap();
        assert_eq!(rt.render_count(detail), Some(2));
        assert_eq!(d.get_state().version("selected_song"), Some(1));
    }

    #[test]
    fn list_offers_every_song() {
        let (mut rt, d) = setup();
        rt.mount(song_list(&d), ()).unwrap();
        let markup = rt.markup().unwrap();
        let text: String = markup.iter().map(Markup::text).collect();
        assert_eq!(
            text,
            "SelectNo ScrubsSelectMacarenaSelectAll StarSelectI Want it That Way"
        );
    }
}
