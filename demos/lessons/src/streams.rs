//! Stream CRUD behind a router. Two slices, `auth` and `streams`, each
//! reduced from its own action family; the app action wraps both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use trellis_core::prelude::*;
use trellis_core::{Deferred, Dispatchable};
use trellis_navigation::{History, Link, Route, Router};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StreamForm {
    pub title: String,
    pub description: String,
}

impl StreamForm {
    /// Field name and message for every missing field.
    pub fn validate(&self) -> Vec<(&'static str, &'static str)> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(("title", "You must enter a title"));
        }
        if self.description.trim().is_empty() {
            errors.push(("description", "You must enter a description"));
        }
        errors
    }
}

#[derive(Clone, Debug)]
pub enum AuthAction {
    SignIn(String),
    SignOut,
}

#[derive(Clone, Debug)]
pub enum StreamAction {
    FetchedAll(Vec<Stream>),
    Fetched(Stream),
    Created(Stream),
    Edited(Stream),
    Deleted(u32),
}

#[derive(Clone, Debug)]
pub enum AppAction {
    Auth(AuthAction),
    Streams(StreamAction),
}

impl Action for AppAction {
    fn kind(&self) -> &'static str {
        match self {
            AppAction::Auth(AuthAction::SignIn(_)) => "SIGN_IN",
            AppAction::Auth(AuthAction::SignOut) => "SIGN_OUT",
            AppAction::Streams(StreamAction::FetchedAll(_)) => "FETCH_STREAMS",
            AppAction::Streams(StreamAction::Fetched(_)) => "FETCH_STREAM",
            AppAction::Streams(StreamAction::Created(_)) => "CREATE_STREAM",
            AppAction::Streams(StreamAction::Edited(_)) => "EDIT_STREAM",
            AppAction::Streams(StreamAction::Deleted(_)) => "DELETE_STREAM",
        }
    }
}

fn auth_actions(action: &AppAction) -> Option<&AuthAction> {
    match action {
        AppAction::Auth(a) => Some(a),
        AppAction::Streams(_) => None,
    }
}

fn stream_actions(action: &AppAction) -> Option<&StreamAction> {
    match action {
        AppAction::Streams(a) => Some(a),
        AppAction::Auth(_) => None,
    }
}

/// `is_signed_in` is `None` until the auth provider has answered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub is_signed_in: Option<bool>,
    pub user_id: Option<String>,
}

fn auth(_: &AuthState, action: &AuthAction) -> AuthState {
    match action {
        AuthAction::SignIn(id) => AuthState {
            is_signed_in: Some(true),
            user_id: Some(id.clone()),
        },
        AuthAction::SignOut => AuthState {
            is_signed_in: Some(false),
            user_id: None,
        },
    }
}

pub type Streams = BTreeMap<u32, Stream>;

fn streams(state: &Streams, action: &StreamAction) -> Streams {
    let mut next = state.clone();
    match action {
        StreamAction::FetchedAll(list) => {
            next.extend(list.iter().map(|s| (s.id, s.clone())));
        }
        StreamAction::Fetched(s) | StreamAction::Created(s) | StreamAction::Edited(s) => {
            next.insert(s.id, s.clone());
        }
        StreamAction::Deleted(id) => {
            next.remove(id);
        }
    }
    next
}

pub fn store(middleware: impl Middleware<AppAction>) -> anyhow::Result<Store<AppAction>> {
    let store = Store::builder()
        .slice("auth", AuthState::default(), auth_actions, auth)
        .slice("streams", Streams::new(), stream_actions, streams)
        .middleware(middleware)
        .build()?;
    Ok(store)
}

/// What every page needs, handed down explicitly.
#[derive(Clone, PartialEq)]
pub struct Env {
    pub dispatcher: Dispatcher<AppAction>,
    pub api: Service<dyn Http>,
    pub history: History,
}

impl Env {
    fn dispatch(&self, item: impl Into<Dispatchable<AppAction>>) {
        self.dispatcher.dispatch(item);
    }
}

pub fn fetch_streams(env: &Env) -> Deferred<AppAction> {
    let api = env.api.clone();
    deferred("fetch_streams", move |d: Dispatcher<AppAction>| async move {
        let list: Vec<Stream> = api.get("/streams").await?.json()?;
        d.dispatch(AppAction::Streams(StreamAction::FetchedAll(list)));
        Ok(())
    })
}

pub fn fetch_stream(env: &Env, id: u32) -> Deferred<AppAction> {
    let api = env.api.clone();
    deferred("fetch_stream", move |d: Dispatcher<AppAction>| async move {
        let stream: Stream = api.get(&format!("/streams/{id}")).await?.json()?;
        d.dispatch(AppAction::Streams(StreamAction::Fetched(stream)));
        Ok(())
    })
}

/// Posts the form as the signed-in user, then returns to the list.
pub fn create_stream(env: &Env, form: StreamForm) -> Deferred<AppAction> {
    let api = env.api.clone();
    let history = env.history.clone();
    deferred("create_stream", move |d: Dispatcher<AppAction>| async move {
        let user_id = d.get_state().try_slice::<AuthState>("auth")?.user_id.clone();
        let body = json!({
            "title": form.title,
            "description": form.description,
            "userId": user_id,
        });
        let stream: Stream = api.post("/streams", body).await?.json()?;
        d.dispatch(AppAction::Streams(StreamAction::Created(stream)));
        history.push("/");
        Ok(())
    })
}

pub fn edit_stream(env: &Env, id: u32, form: StreamForm) -> Deferred<AppAction> {
    let api = env.api.clone();
    let history = env.history.clone();
    deferred("edit_stream", move |d: Dispatcher<AppAction>| async move {
        let body = serde_json::to_value(&form)?;
        let stream: Stream = api.patch(&format!("/streams/{id}"), body).await?.json()?;
        d.dispatch(AppAction::Streams(StreamAction::Edited(stream)));
        history.push("/");
        Ok(())
    })
}

/// Deletes on the server, then drops the stream from the map. Stays on the
/// current page.
pub fn delete_stream(env: &Env, id: u32) -> Deferred<AppAction> {
    let api = env.api.clone();
    deferred("delete_stream", move |d: Dispatcher<AppAction>| async move {
        api.delete(&format!("/streams/{id}")).await?;
        d.dispatch(AppAction::Streams(StreamAction::Deleted(id)));
        Ok(())
    })
}

/// Sign-in toggle. Signs in as `account`; the first mount reports the
/// provider's initial signed-out state.
pub struct AuthButton {
    dispatcher: Dispatcher<AppAction>,
    account: String,
}

impl Component for AuthButton {
    type Props = Option<bool>;

    fn name(&self) -> &'static str {
        "AuthButton"
    }

    fn render(&self, cx: &mut RenderCx<'_>, signed_in: &Option<bool>) -> View {
        let unknown = signed_in.is_none();
        let d = self.dispatcher.clone();
        cx.use_effect((), move || {
            if unknown {
                d.dispatch(AppAction::Auth(AuthAction::SignOut));
            }
        });

        let d = self.dispatcher.clone();
        match signed_in {
            None => View::Empty,
            Some(true) => Button("Sign Out", move || {
                d.dispatch(AppAction::Auth(AuthAction::SignOut));
            })
            .id("sign-out")
            .class("ui red google button"),
            Some(false) => {
                let account = self.account.clone();
                Button("Sign In with Google", move || {
                    d.dispatch(AppAction::Auth(AuthAction::SignIn(account.clone())));
                })
                .id("sign-in")
                .class("ui red google button")
            }
        }
    }
}

#[derive(Clone)]
pub struct Header {
    history: History,
    auth: Connect<AppAction, (), AuthButton>,
}

impl Header {
    pub fn new(env: &Env, account: impl Into<String>) -> Self {
        let button = AuthButton {
            dispatcher: env.dispatcher.clone(),
            account: account.into(),
        };
        Self {
            history: env.history.clone(),
            auth: connect(
                &env.dispatcher,
                Interest::slices(["auth"]),
                |store: &Store<AppAction>, _: &(), _: &Dispatcher<AppAction>| {
                    store
                        .get_slice::<AuthState>("auth")
                        .and_then(|a| a.is_signed_in)
                },
                button,
            ),
        }
    }
}

impl Component for Header {
    type Props = ();

    fn name(&self) -> &'static str {
        "Header"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, _: &()) -> View {
        Div()
            .class("ui secondary pointing menu")
            .child(Link(&self.history, "/", "Streamy").id("home"))
            .child(Link(&self.history, "/", "All Streams").id("all-streams"))
            .child(View::component(self.auth.clone(), ()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StreamListProps {
    pub streams: Vec<Stream>,
    pub current_user: Option<String>,
    pub signed_in: bool,
}

pub struct StreamList {
    env: Env,
}

impl Component for StreamList {
    type Props = StreamListProps;

    fn name(&self) -> &'static str {
        "StreamList"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &StreamListProps) -> View {
        let env = self.env.clone();
        cx.use_effect((), move || env.dispatch(fetch_streams(&env)));

        let h = &self.env.history;
        let rows = props
            .streams
            .iter()
            .map(|s| {
                let mut row = Div().class("item");
                if props.current_user.is_some() && s.user_id == props.current_user {
                    row = row.child(
                        Div()
                            .class("right floated content")
                            .child(
                                Link(h, format!("/streams/edit/{}", s.id), "Edit")
                                    .id(format!("edit-{}", s.id)),
                            )
                            .child(
                                Link(h, format!("/streams/delete/{}", s.id), "Delete")
                                    .id(format!("delete-{}", s.id)),
                            ),
                    );
                }
                row.child(Link(h, format!("/streams/{}", s.id), s.title.clone()).id(format!("show-{}", s.id)))
                    .child(Div().class("description").child(Text(s.description.clone())))
            })
            .collect();

        let mut view = Div()
            .child(El("h2").child(Text("Streams")))
            .child(Div().class("ui celled list").with_children(rows));
        if props.signed_in {
            view = view.child(Link(h, "/streams/new", "Create Stream").id("create"));
        }
        view
    }
}

pub fn stream_list(env: &Env) -> Connect<AppAction, (), StreamList> {
    connect(
        &env.dispatcher,
        Interest::slices(["streams", "auth"]),
        |store: &Store<AppAction>, _: &(), _: &Dispatcher<AppAction>| {
            let auth = store.get_slice::<AuthState>("auth").unwrap_or_default();
            StreamListProps {
                streams: store
                    .get_slice::<Streams>("streams")
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default(),
                current_user: auth.user_id.clone(),
                signed_in: auth.is_signed_in == Some(true),
            }
        },
        StreamList { env: env.clone() },
    )
}

#[derive(Clone, PartialEq)]
pub struct FormProps {
    pub initial: StreamForm,
    pub on_submit: Callback<StreamForm>,
}

/// Title and description inputs. Errors show after the first failed submit.
pub struct StreamFormView;

impl Component for StreamFormView {
    type Props = FormProps;

    fn name(&self) -> &'static str {
        "StreamForm"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &FormProps) -> View {
        let (form, set_form) = cx.use_state(|| props.initial.clone());
        let (show_errors, set_show_errors) = cx.use_state(|| false);
        let errors = if show_errors { form.validate() } else { Vec::new() };

        let error_for = |field: &'static str| match errors.iter().find(|(f, _)| *f == field) {
            Some((_, msg)) => Div()
                .class("ui error message")
                .child(Div().class("header").child(Text(*msg))),
            None => View::Empty,
        };

        let title_input = {
            let set = set_form.clone();
            Input(form.title.clone(), move |v| {
                set.update(move |f| StreamForm {
                    title: v,
                    ..f.clone()
                })
            })
            .id("title")
        };
        let description_input = {
            let set = set_form.clone();
            Input(form.description.clone(), move |v| {
                set.update(move |f| StreamForm {
                    description: v,
                    ..f.clone()
                })
            })
            .id("description")
        };
        let submit = {
            let form = form.clone();
            let on_submit = props.on_submit.clone();
            Button("Submit", move || {
                if form.validate().is_empty() {
                    on_submit.call(form.clone());
                } else {
                    set_show_errors.set(true);
                }
            })
            .id("submit")
            .class("ui button primary")
        };

        El("form")
            .class("ui form error")
            .child(
                Div()
                    .class("field")
                    .child(El("label").child(Text("Enter Title")))
                    .child(title_input)
                    .child(error_for("title")),
            )
            .child(
                Div()
                    .class("field")
                    .child(El("label").child(Text("Enter Description")))
                    .child(description_input)
                    .child(error_for("description")),
            )
            .child(submit)
    }
}

pub struct StreamCreate {
    env: Env,
}

impl Component for StreamCreate {
    type Props = ();

    fn name(&self) -> &'static str {
        "StreamCreate"
    }

    fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
        let on_submit = cx.remember(|| {
            let env = self.env.clone();
            Callback::new(move |form| env.dispatch(create_stream(&env, form)))
        });
        Div()
            .child(El("h3").child(Text("Create a Stream")))
            .child(View::component(
                StreamFormView,
                FormProps {
                    initial: StreamForm::default(),
                    on_submit: (*on_submit).clone(),
                },
            ))
    }
}

/// Props of the pages that show one stream: the id from the path and the
/// stream, once it is in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamById {
    pub id: u32,
    pub stream: Option<Stream>,
}

fn select_by_id(store: &Store<AppAction>, id: &u32, _: &Dispatcher<AppAction>) -> StreamById {
    StreamById {
        id: *id,
        stream: store
            .get_slice::<Streams>("streams")
            .and_then(|m| m.get(id).cloned()),
    }
}

fn by_id<C: Component<Props = StreamById>>(env: &Env, inner: C) -> Connect<AppAction, u32, C> {
    connect(
        &env.dispatcher,
        Interest::slices(["streams"]),
        select_by_id,
        inner,
    )
}

/// Fetches the stream whenever the id changes.
fn use_stream(cx: &mut RenderCx<'_>, env: &Env, id: u32) {
    let env = env.clone();
    cx.use_effect(id, move || env.dispatch(fetch_stream(&env, id)));
}

pub struct StreamEdit {
    env: Env,
}

impl Component for StreamEdit {
    type Props = StreamById;

    fn name(&self) -> &'static str {
        "StreamEdit"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &StreamById) -> View {
        use_stream(cx, &self.env, props.id);
        let on_submit = cx.use_memo(props.id, |&id| {
            let env = self.env.clone();
            Callback::new(move |form| env.dispatch(edit_stream(&env, id, form)))
        });

        let Some(stream) = &props.stream else {
            return Div().child(Text("Loading..."));
        };
        Div()
            .child(El("h3").child(Text("Edit a Stream")))
            .child(View::component(
                StreamFormView,
                FormProps {
                    initial: StreamForm {
                        title: stream.title.clone(),
                        description: stream.description.clone(),
                    },
                    on_submit: (*on_submit).clone(),
                },
            ))
    }
}

pub struct StreamShow {
    env: Env,
}

impl Component for StreamShow {
    type Props = StreamById;

    fn name(&self) -> &'static str {
        "StreamShow"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &StreamById) -> View {
        use_stream(cx, &self.env, props.id);
        match &props.stream {
            None => Div().child(Text("Loading...")),
            Some(stream) => Div()
                .child(El("h1").child(Text(stream.title.clone())))
                .child(El("h5").child(Text(stream.description.clone()))),
        }
    }
}

pub struct StreamDelete {
    env: Env,
}

impl Component for StreamDelete {
    type Props = StreamById;

    fn name(&self) -> &'static str {
        "StreamDelete"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &StreamById) -> View {
        use_stream(cx, &self.env, props.id);
        let content = match &props.stream {
            Some(stream) => format!(
                "Are you sure you want to delete the stream with title: \"{}\"",
                stream.title
            ),
            None => "Are you sure you want to delete this stream?".to_string(),
        };
        let env = self.env.clone();
        let id = props.id;
        Div()
            .class("ui modal")
            .child(Div().class("header").child(Text("Delete Stream")))
            .child(Div().class("content").child(Text(content)))
            .child(
                Div()
                    .class("actions")
                    .child(
                        Button("Delete", move || env.dispatch(delete_stream(&env, id)))
                            .id("confirm-delete")
                            .class("ui button negative"),
                    )
                    .child(Link(&self.env.history, "/", "Cancel").id("cancel")),
            )
    }
}

/// Maps a route to its page.
pub fn page(env: &Env, route: &Route) -> View {
    let segments = route.segments();
    let id = segments.last().and_then(|s| s.parse::<u32>().ok());
    match (segments.as_slice(), id) {
        ([], _) => View::component(stream_list(env), ()),
        (["streams", "new"], _) => View::component(StreamCreate { env: env.clone() }, ()),
        (["streams", "edit", _], Some(id)) => {
            View::component(by_id(env, StreamEdit { env: env.clone() }), id)
        }
        (["streams", "delete", _], Some(id)) => {
            View::component(by_id(env, StreamDelete { env: env.clone() }), id)
        }
        (["streams", _], Some(id)) => {
            View::component(by_id(env, StreamShow { env: env.clone() }), id)
        }
        _ => Div().child(Text(format!("No page at {}", route.path))),
    }
}

pub struct StreamsApp {
    history: History,
    header: Header,
    router: Router,
}

impl StreamsApp {
    pub fn new(env: Env, account: impl Into<String>) -> Self {
        let header = Header::new(&env, account);
        let history = env.history.clone();
        let router = Router::new(move |route| page(&env, route));
        Self {
            history,
            header,
            router,
        }
    }
}

impl Component for StreamsApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "StreamsApp"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, _: &()) -> View {
        Div()
            .class("ui container")
            .child(View::component(self.header.clone(), ()))
            .child(View::component(self.router.clone(), self.history.clone()))
    }
}
