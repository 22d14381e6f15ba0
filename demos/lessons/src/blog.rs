//! Posts with their authors. The list fetches posts, then each distinct
//! author, and every header reads its user out of the store by id.

use std::rc::Rc;

use serde::Deserialize;
use trellis_core::Deferred;
use trellis_core::prelude::*;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u32,
    pub user_id: u32,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug)]
pub enum BlogAction {
    PostsFetched(Vec<Post>),
    UserFetched(User),
}

impl Action for BlogAction {
    fn kind(&self) -> &'static str {
        match self {
            BlogAction::PostsFetched(_) => "FETCH_POSTS",
            BlogAction::UserFetched(_) => "FETCH_USER",
        }
    }
}

fn posts(state: &Vec<Post>, action: &BlogAction) -> Vec<Post> {
    match action {
        BlogAction::PostsFetched(posts) => posts.clone(),
        BlogAction::UserFetched(_) => state.clone(),
    }
}

/// Upserts by id, so user responses may land in any order.
fn users(state: &Vec<User>, action: &BlogAction) -> Vec<User> {
    match action {
        BlogAction::UserFetched(user) => {
            let mut next = state.clone();
            match next.iter().position(|u| u.id == user.id) {
                Some(i) => next[i] = user.clone(),
                None => next.push(user.clone()),
            }
            next
        }
        BlogAction::PostsFetched(_) => state.clone(),
    }
}

pub fn store() -> anyhow::Result<Store<BlogAction>> {
    let store = Store::builder()
        .slice("posts", Vec::new(), whole, posts)
        .slice("users", Vec::new(), whole, users)
        .middleware(LoggingMiddleware)
        .build()?;
    Ok(store)
}

pub fn fetch_posts(api: Service<dyn Http>) -> Deferred<BlogAction> {
    deferred("fetch_posts", move |d: Dispatcher<BlogAction>| async move {
        let posts: Vec<Post> = api.get("/posts").await?.json()?;
        d.dispatch(BlogAction::PostsFetched(posts));
        Ok(())
    })
}

pub fn fetch_user(api: Service<dyn Http>, id: u32) -> Deferred<BlogAction> {
    deferred("fetch_user", move |d: Dispatcher<BlogAction>| async move {
        let user: User = api.get(&format!("/users/{id}")).await?.json()?;
        d.dispatch(BlogAction::UserFetched(user));
        Ok(())
    })
}

/// Waits for the posts, then starts one user fetch per distinct author
/// without waiting on them.
pub fn fetch_posts_and_users(api: Service<dyn Http>) -> Deferred<BlogAction> {
    deferred("fetch_posts_and_users", move |d: Dispatcher<BlogAction>| async move {
        d.dispatch(fetch_posts(api.clone())).settled().await?;

        let posts = d.get_state().try_slice::<Vec<Post>>("posts")?;
        let mut authors: Vec<u32> = Vec::new();
        for post in posts.iter() {
            if !authors.contains(&post.user_id) {
                authors.push(post.user_id);
            }
        }
        for id in authors {
            d.dispatch(fetch_user(api.clone(), id));
        }
        Ok(())
    })
}

pub struct UserHeader;

impl Component for UserHeader {
    type Props = Option<User>;

    fn name(&self) -> &'static str {
        "UserHeader"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, user: &Option<User>) -> View {
        match user {
            Some(user) => Div().class("header").child(Text(user.name.clone())),
            None => View::Empty,
        }
    }
}

/// Header bound to the users slice. Own props: the author's id.
pub fn user_header(d: &Dispatcher<BlogAction>) -> Connect<BlogAction, u32, UserHeader> {
    connect(
        d,
        Interest::slices(["users"]),
        |store: &Store<BlogAction>, user_id: &u32, _: &Dispatcher<BlogAction>| {
            store
                .get_slice::<Vec<User>>("users")
                .and_then(|users| users.iter().find(|u| u.id == *user_id).cloned())
        },
        UserHeader,
    )
}

#[derive(Clone, PartialEq)]
pub struct PostListProps {
    pub posts: Rc<Vec<Post>>,
    pub api: Service<dyn Http>,
    pub dispatcher: Dispatcher<BlogAction>,
}

pub struct PostList {
    header: Connect<BlogAction, u32, UserHeader>,
}

impl Component for PostList {
    type Props = PostListProps;

    fn name(&self) -> &'static str {
        "PostList"
    }

    fn render(&self, cx: &mut RenderCx<'_>, props: &PostListProps) -> View {
        let d = props.dispatcher.clone();
        let api = props.api.clone();
        cx.use_effect((), move || {
            d.dispatch(fetch_posts_and_users(api));
        });

        let items = props
            .posts
            .iter()
            .map(|post| {
                Div()
                    .class("item")
                    .child(El("h2").child(Text(post.title.clone())))
                    .child(El("p").child(Text(post.body.clone())))
                    .child(View::component(self.header.clone(), post.user_id))
            })
            .collect();
        Div().class("ui relaxed divided list").with_children(items)
    }
}

/// The connected post list. Own props: the network collaborator.
pub fn post_list(d: &Dispatcher<BlogAction>) -> Connect<BlogAction, Service<dyn Http>, PostList> {
    connect(
        d,
        Interest::slices(["posts"]),
        |store: &Store<BlogAction>, api: &Service<dyn Http>, d: &Dispatcher<BlogAction>| {
            PostListProps {
                posts: store.get_slice::<Vec<Post>>("posts").unwrap_or_default(),
                api: api.clone(),
                dispatcher: d.clone(),
            }
        },
        PostList {
            header: user_header(d),
        },
    )
}
