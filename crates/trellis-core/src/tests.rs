#![allow(non_snake_case)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;

use crate::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Item {
    id: u32,
    title: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
enum Pick {
    SelectItem(Item),
    Noop,
}

impl Action for Pick {
    fn kind(&self) -> &'static str {
        match self {
            Pick::SelectItem(_) => "SELECT_ITEM",
            Pick::Noop => "NOOP",
        }
    }
}

fn selected(s: &Option<Item>, a: &Pick) -> Option<Item> {
    match a {
        Pick::SelectItem(item) => Some(item.clone()),
        Pick::Noop => s.clone(),
    }
}

fn pick_store() -> Store<Pick> {
    Store::builder()
        .slice("selected", None::<Item>, whole, selected)
        .build()
        .unwrap()
}

#[test]
fn select_item_then_noop() {
    let store = pick_store();
    store.dispatch(Pick::SelectItem(Item { id: 1, title: "A" }));
    let after_select = store.get_slice::<Option<Item>>("selected").unwrap();
    assert_eq!(*after_select, Some(Item { id: 1, title: "A" }));

    store.dispatch(Pick::Noop);
    let after_noop = store.get_slice::<Option<Item>>("selected").unwrap();
    assert_eq!(*after_noop, Some(Item { id: 1, title: "A" }));
    assert_eq!(store.version("selected"), Some(1));
}

#[test]
fn sequential_updates_each_see_the_committed_value() {
    let renders = Rc::new(Cell::new(0));
    let counter = {
        let renders = renders.clone();
        component("Counter", move |cx: &mut RenderCx<'_>, _: &()| {
            renders.set(renders.get() + 1);
            let (count, set) = cx.use_state(|| 0);
            Div().child(Text(count.to_string())).child(
                Button("+", move || set.update(|v| v + 1)).id("inc"),
            )
        })
    };

    let mut rt = Runtime::new();
    rt.mount(counter, ()).unwrap();
    for _ in 0..3 {
        rt.trigger("inc", "click", "").unwrap();
    }
    assert_eq!(rt.markup().unwrap()[0].text(), "3+");
    assert_eq!(renders.get(), 1 + 3);
}

#[test]
fn updates_queued_in_one_handler_fold_into_one_render() {
    let renders = Rc::new(Cell::new(0));
    let counter = {
        let renders = renders.clone();
        component("Counter", move |cx: &mut RenderCx<'_>, _: &()| {
            renders.set(renders.get() + 1);
            let (count, set) = cx.use_state(|| 0);
            Button(count.to_string(), move || {
                set.update(|v| v + 1);
                set.update(|v| v + 1);
                set.update(|v| v + 1);
            })
            .id("inc")
        })
    };

    let mut rt = Runtime::new();
    rt.mount(counter, ()).unwrap();
    rt.trigger("inc", "click", "").unwrap();
    assert_eq!(rt.html().unwrap(), r#"<button id="inc">3</button>"#);
    assert_eq!(renders.get(), 2);
}

#[derive(Default)]
struct Tally {
    runs: Cell<u32>,
    cleanups: Cell<u32>,
    log: RefCell<Vec<String>>,
}

fn watcher(tally: Rc<Tally>) -> impl Component<Props = u32> {
    component("Watcher", move |cx: &mut RenderCx<'_>, user_id: &u32| {
        let user_id = *user_id;
        let tally = tally.clone();
        let (_, bump) = cx.use_state(|| 0u32);
        cx.use_effect(user_id, move || {
            tally.runs.set(tally.runs.get() + 1);
            tally.log.borrow_mut().push(format!("run {user_id}"));
            on_unmount(move || {
                tally.cleanups.set(tally.cleanups.get() + 1);
                tally.log.borrow_mut().push(format!("cleanup {user_id}"));
            })
        });
        Button(format!("user {user_id}"), move || bump.update(|n| n + 1)).id("bump")
    })
}

#[test]
fn changed_deps_clean_up_then_rerun_once() {
    let tally = Rc::new(Tally::default());
    let mut rt = Runtime::new();
    rt.mount(watcher(tally.clone()), 1).unwrap();
    assert_eq!(*tally.log.borrow(), vec!["run 1"]);

    rt.set_root_props(2u32).unwrap();
    assert_eq!(*tally.log.borrow(), vec!["run 1", "cleanup 1", "run 2"]);
    assert_eq!(tally.runs.get(), tally.cleanups.get() + 1);

    rt.unmount();
    assert_eq!(tally.runs.get(), tally.cleanups.get());
}

#[test]
fn equal_deps_do_not_rerun() {
    let tally = Rc::new(Tally::default());
    let mut rt = Runtime::new();
    let root = rt.mount(watcher(tally.clone()), 1).unwrap();

    // same props: no re-render at all
    rt.set_root_props(1u32).unwrap();
    assert_eq!(rt.render_count(root), Some(1));

    // state changes re-render with the same deps
    rt.trigger("bump", "click", "").unwrap();
    rt.trigger("bump", "click", "").unwrap();
    assert_eq!(rt.render_count(root), Some(3));
    assert_eq!(*tally.log.borrow(), vec!["run 1"]);
    assert_eq!(tally.cleanups.get(), 0);
}

#[test]
fn empty_deps_run_once_across_rerenders() {
    let runs = Rc::new(Cell::new(0));
    let app = {
        let runs = runs.clone();
        component("Once", move |cx: &mut RenderCx<'_>, _: &()| {
            let (n, set) = cx.use_state(|| 0u32);
            let runs = runs.clone();
            cx.use_effect((), move || runs.set(runs.get() + 1));
            Button(n.to_string(), move || set.update(|v| v + 1)).id("bump")
        })
    };

    let mut rt = Runtime::new();
    rt.mount(app, ()).unwrap();
    for _ in 0..5 {
        rt.trigger("bump", "click", "").unwrap();
    }
    assert_eq!(rt.html().unwrap(), r#"<button id="bump">5</button>"#);
    assert_eq!(runs.get(), 1);
}

#[test]
fn destroy_runs_only_the_registered_cleanup() {
    let cleanups = Rc::new(Cell::new(0));
    let child = {
        let cleanups = cleanups.clone();
        component("Child", move |cx: &mut RenderCx<'_>, _: &()| {
            let cleanups = cleanups.clone();
            cx.use_effect((), move || on_unmount(move || cleanups.set(cleanups.get() + 1)));
            cx.use_effect((), || ());
            Text("child")
        })
    };
    let parent = component("Parent", move |_cx: &mut RenderCx<'_>, show: &bool| {
        if *show {
            View::component(child.clone(), ())
        } else {
            View::Empty
        }
    });

    let mut rt = Runtime::new();
    rt.mount(parent, true).unwrap();
    let node = rt.find("Child").unwrap();
    assert_eq!(rt.lifecycle(node), Lifecycle::Mounted);

    rt.set_root_props(false).unwrap();
    assert_eq!(cleanups.get(), 1);
    assert_eq!(rt.lifecycle(node), Lifecycle::Unmounted);
    assert_eq!(rt.node_count(), 1);
}

#[test]
fn effects_commit_children_first_and_clean_up_children_first() {
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let leaf = {
        let log = log.clone();
        component("Leaf", move |cx: &mut RenderCx<'_>, name: &&'static str| {
            let name = *name;
            let log = log.clone();
            cx.use_effect((), move || {
                log.borrow_mut().push(format!("mount {name}"));
                on_unmount(move || log.borrow_mut().push(format!("unmount {name}")))
            });
            Text(name)
        })
    };
    let tree = {
        let log = log.clone();
        component("Tree", move |cx: &mut RenderCx<'_>, _: &()| {
            let log = log.clone();
            cx.use_effect((), move || {
                log.borrow_mut().push("mount tree".into());
                on_unmount(move || log.borrow_mut().push("unmount tree".into()))
            });
            Div().with_children(vec![
                View::component(leaf.clone(), "a"),
                View::component(leaf.clone(), "b"),
            ])
        })
    };

    let mut rt = Runtime::new();
    rt.mount(tree, ()).unwrap();
    assert_eq!(rt.html().unwrap(), "<div>ab</div>");
    rt.unmount();
    assert_eq!(
        *log.borrow(),
        vec![
            "mount a",
            "mount b",
            "mount tree",
            "unmount a",
            "unmount b",
            "unmount tree"
        ]
    );
}

#[test]
fn keyed_children_keep_their_state_when_reordered() {
    let row = component("Row", |cx: &mut RenderCx<'_>, label: &&'static str| {
        let (clicks, set) = cx.use_state(|| 0);
        Button(format!("{label}:{clicks}"), move || set.update(|n| n + 1)).id(*label)
    });
    let list = component("List", move |_cx: &mut RenderCx<'_>, order: &Vec<&'static str>| {
        Fragment(
            order
                .iter()
                .map(|l| View::component(row.clone(), *l).key(*l))
                .collect(),
        )
    });

    let mut rt = Runtime::new();
    rt.mount(list, vec!["x", "y"]).unwrap();
    rt.trigger("y", "click", "").unwrap();
    rt.set_root_props(vec!["y", "x"]).unwrap();
    let texts: Vec<String> = rt.markup().unwrap().iter().map(Markup::text).collect();
    assert_eq!(texts, vec!["y:1", "x:0"]);
}

#[test]
fn setter_after_unmount_is_a_no_op() {
    let leaked: Rc<RefCell<Option<Setter<u32>>>> = Rc::default();
    let app = {
        let leaked = leaked.clone();
        component("Leak", move |cx: &mut RenderCx<'_>, _: &()| {
            let (n, set) = cx.use_state(|| 7u32);
            *leaked.borrow_mut() = Some(set);
            Text(n.to_string())
        })
    };
    let mut rt = Runtime::new();
    rt.mount(app, ()).unwrap();
    rt.unmount();

    let set = leaked.borrow_mut().take().unwrap();
    assert!(!set.is_live());
    set.set(8);
    assert_eq!(rt.flush().unwrap().renders, 0);
}

#[test]
fn effect_that_always_sets_state_hits_the_pass_limit() {
    let app = component("Spin", |cx: &mut RenderCx<'_>, _: &()| {
        let (n, set) = cx.use_state(|| 0u64);
        cx.use_effect_always(move || set.set(n + 1));
        Text(n.to_string())
    });
    let mut rt = Runtime::with_config(RuntimeConfig { max_passes: 8 });
    assert!(matches!(rt.mount(app, ()), Err(Error::UpdateLoop(8))));
}

#[test]
fn hook_order_change_reinitialises_the_slot() {
    let app = component("Fickle", |cx: &mut RenderCx<'_>, flip: &bool| {
        if *flip {
            let label = cx.remember(|| "remembered".to_string());
            Text((*label).clone())
        } else {
            let (n, _) = cx.use_state(|| 1u8);
            Text(n.to_string())
        }
    });
    let mut rt = Runtime::new();
    rt.mount(app, false).unwrap();
    rt.set_root_props(true).unwrap();
    assert_eq!(rt.html().unwrap(), "remembered");
}

#[test]
fn an_effect_slot_taken_over_by_state_releases_its_cleanup() {
    let tally = Rc::new(Tally::default());
    let app = {
        let tally = tally.clone();
        component("Flipper", move |cx: &mut RenderCx<'_>, effect: &bool| {
            if *effect {
                let tally = tally.clone();
                cx.use_effect((), move || {
                    tally.runs.set(tally.runs.get() + 1);
                    on_unmount(move || tally.cleanups.set(tally.cleanups.get() + 1))
                });
            } else {
                let _ = cx.use_state(|| 0u8);
            }
            Text("flip")
        })
    };

    let mut rt = Runtime::new();
    rt.mount(app, true).unwrap();
    rt.set_root_props(false).unwrap();
    assert_eq!((tally.runs.get(), tally.cleanups.get()), (1, 1));

    rt.set_root_props(true).unwrap();
    rt.set_root_props(false).unwrap();
    assert_eq!((tally.runs.get(), tally.cleanups.get()), (2, 2));

    rt.unmount();
    assert_eq!(tally.cleanups.get(), 2);
}

// Connector

#[derive(Clone, Debug, PartialEq)]
enum Songs {
    Select(&'static str),
    Rename(&'static str),
}

impl Action for Songs {
    fn kind(&self) -> &'static str {
        match self {
            Songs::Select(_) => "SONG_SELECTED",
            Songs::Rename(_) => "PLAYLIST_RENAMED",
        }
    }
}

fn select_song(s: &Option<&'static str>, a: &Songs) -> Option<&'static str> {
    match a {
        Songs::Select(t) => Some(*t),
        Songs::Rename(_) => *s,
    }
}

fn rename(s: &&'static str, a: &Songs) -> &'static str {
    match a {
        Songs::Rename(n) => *n,
        Songs::Select(_) => *s,
    }
}

#[derive(Clone, PartialEq)]
struct DetailProps {
    title: Option<&'static str>,
    caption: &'static str,
}

#[test]
fn connector_rerenders_inner_only_for_changed_merged_props() {
    let mut rt = Runtime::new();
    let store = Store::builder()
        .slice("selected", None, whole, select_song)
        .slice("playlist", "mix", whole, rename)
        .build()
        .unwrap();
    let dispatcher = rt.dispatcher(store.clone());

    let inner_renders = Rc::new(Cell::new(0));
    let detail = {
        let inner_renders = inner_renders.clone();
        component("SongDetail", move |_cx: &mut RenderCx<'_>, p: &DetailProps| {
            inner_renders.set(inner_renders.get() + 1);
            Text(format!("{}: {}", p.caption, p.title.unwrap_or("none")))
        })
    };
    let bound = connect(
        &dispatcher,
        Interest::slices(["selected"]),
        |store: &Store<Songs>, caption: &&'static str, _d: &Dispatcher<Songs>| DetailProps {
            title: store
                .get_slice::<Option<&'static str>>("selected")
                .and_then(|s| *s),
            caption: *caption,
        },
        detail,
    );

    rt.mount(bound, "Now playing").unwrap();
    assert_eq!(rt.html().unwrap(), "Now playing: none");

    dispatcher.dispatch(Songs::Select("Macarena"));
    assert_eq!(rt.lifecycle(rt.root().unwrap()), Lifecycle::Updating);
    rt.flush().unwrap();
    assert_eq!(rt.html().unwrap(), "Now playing: Macarena");
    assert_eq!(inner_renders.get(), 2);

    // not in the connector's interest
    dispatcher.dispatch(Songs::Rename("party"));
    assert_eq!(rt.flush().unwrap().renders, 0);

    // same selection again: slice unchanged, nobody notified
    dispatcher.dispatch(Songs::Select("Macarena"));
    assert_eq!(rt.flush().unwrap().renders, 0);

    rt.set_root_props("Up next").unwrap();
    assert_eq!(rt.html().unwrap(), "Up next: Macarena");
    assert_eq!(inner_renders.get(), 3);

    rt.unmount();
    assert_eq!(store.observer_count(), 0);
}

#[test]
fn effect_cleanup_cancels_in_flight_work() {
    let (tx, rx) = oneshot::channel::<&'static str>();
    let rx = Rc::new(RefCell::new(Some(rx)));
    let applied = Rc::new(Cell::new(false));

    let app = {
        let applied = applied.clone();
        component("Fetcher", move |cx: &mut RenderCx<'_>, _: &()| {
            let spawner = cx.spawner().clone();
            let rx = rx.clone();
            let applied = applied.clone();
            cx.use_effect((), move || {
                let Some(rx) = rx.borrow_mut().take() else {
                    return None;
                };
                let task = spawner.spawn("fetch", async move {
                    rx.await?;
                    applied.set(true);
                    Ok(())
                });
                Some(task.cancel_on_dispose())
            });
            Text("loading")
        })
    };

    let mut rt = Runtime::new();
    let spawner = rt.spawner();
    rt.mount(app, ()).unwrap();
    rt.run_until_stalled().unwrap();
    rt.unmount();
    let _ = tx.send("late");
    rt.run_until_stalled().unwrap();
    assert!(!applied.get());
    assert_eq!(spawner.unhandled_rejections(), 0);
}

#[test]
fn rerender_handle_marks_external_reason() {
    let source = signal(1u32);
    let app = {
        let source = source.clone();
        component("Mirror", move |cx: &mut RenderCx<'_>, _: &()| {
            let s = source.clone();
            cx.use_subscription(source.addr(), move |rerender| {
                s.subscribe(move |_| rerender.request())
            });
            Text(source.get().to_string())
        })
    };
    let mut rt = Runtime::new();
    rt.mount(app, ()).unwrap();
    source.set(5);
    assert_eq!(rt.flush().unwrap().renders, 1);
    assert_eq!(rt.html().unwrap(), "5");
    rt.unmount();
    assert_eq!(source.observer_count(), 0);
}
