//! A list of whichever resource is picked, fetched through a custom hook.

use serde_json::Value;
use trellis_core::prelude::*;

/// Items of `/{resource}`, refetched whenever `resource` changes. A fetch
/// still running for the previous resource is cancelled.
pub fn use_resources(cx: &mut RenderCx<'_>, api: &Service<dyn Http>, resource: &str) -> Vec<Value> {
    let (items, set_items) = cx.use_state(Vec::<Value>::new);
    let api = api.clone();
    let spawner = cx.spawner().clone();
    let path = format!("/{resource}");
    cx.use_effect(resource.to_string(), move || {
        spawner
            .spawn("use_resources", async move {
                let list: Vec<Value> = api.get(&path).await?.json()?;
                set_items.set(list);
                Ok(())
            })
            .cancel_on_dispose()
    });
    items
}

pub struct ResourceList {
    api: Service<dyn Http>,
}

impl Component for ResourceList {
    type Props = String;

    fn name(&self) -> &'static str {
        "ResourceList"
    }

    fn render(&self, cx: &mut RenderCx<'_>, resource: &String) -> View {
        let items = use_resources(cx, &self.api, resource);
        let rows = items
            .iter()
            .map(|item| {
                let title = item.get("title").and_then(Value::as_str).unwrap_or_default();
                El("li").child(Text(title))
            })
            .collect();
        El("ul").with_children(rows)
    }
}

pub struct ResourcesApp {
    api: Service<dyn Http>,
}

impl ResourcesApp {
    pub fn new(api: Service<dyn Http>) -> Self {
        Self { api }
    }
}

impl Component for ResourcesApp {
    type Props = ();

    fn name(&self) -> &'static str {
        "ResourcesApp"
    }

    fn render(&self, cx: &mut RenderCx<'_>, _: &()) -> View {
        let (resource, set_resource) = cx.use_state(|| "posts".to_string());
        let pick = |name: &'static str, label: &'static str| {
            let set = set_resource.clone();
            Button(label, move || set.set(name.to_string())).id(name)
        };
        Div()
            .child(Div().child(pick("posts", "Posts")).child(pick("todos", "Todos")))
            .child(View::component(
                ResourceList {
                    api: self.api.clone(),
                },
                resource,
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_api::FakeApi;
    use futures::FutureExt;
    use futures::channel::oneshot;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Reply = oneshot::Sender<Result<Response, HttpError>>;

    /// Holds every request until the test answers it.
    struct Slow {
        config: ClientConfig,
        waiting: RefCell<Vec<(String, Reply)>>,
    }

    impl Slow {
        fn answer(&self, path: &str, data: Value) {
            let i = self
                .waiting
                .borrow()
                .iter()
                .position(|(p, _)| p == path)
                .unwrap();
            let (_, tx) = self.waiting.borrow_mut().remove(i);
            let _ = tx.send(Ok(Response::ok(data)));
        }
    }

    impl Http for Slow {
        fn config(&self) -> &ClientConfig {
            &self.config
        }

        fn request(&self, _method: Method, path: &str, _body: Option<Value>) -> HttpFuture {
            let (tx, rx) = oneshot::channel();
            self.waiting.borrow_mut().push((path.to_string(), tx));
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(HttpError::Transport("dropped".into())))
            }
            .boxed_local()
        }
    }

    #[test]
    fn switching_resource_refetches() {
        let api = FakeApi::new(ClientConfig::new("https://jsonplaceholder.typicode.com"))
            .with("posts", vec![json!({"id": 1, "title": "p1"}), json!({"id": 2, "title": "p2"})])
            .with(
                "todos",
                vec![
                    json!({"id": 1, "title": "t1"}),
                    json!({"id": 2, "title": "t2"}),
                    json!({"id": 3, "title": "t3"}),
                ],
            );
        let mut rt = Runtime::new();
        rt.mount(ResourcesApp::new(api.service()), ()).unwrap();
        rt.run_until_stalled().unwrap();
        assert!(rt.html().unwrap().contains("<ul><li>p1</li><li>p2</li></ul>"));

        rt.trigger("todos", "click", "").unwrap();
        assert_eq!(rt.html().unwrap().matches("<li>").count(), 3);

        // same resource again: re-render, but no new fetch
        rt.trigger("todos", "click", "").unwrap();
        assert_eq!(api.requests(), vec!["Get /posts", "Get /todos"]);
    }

    #[test]
    fn a_stale_fetch_is_cancelled() {
        let slow = Rc::new(Slow {
            config: ClientConfig::default(),
            waiting: RefCell::new(Vec::new()),
        });
        let mut rt = Runtime::new();
        let spawner = rt.spawner();
        rt.mount(
            ResourcesApp::new(Service::from_rc(slow.clone() as Rc<dyn Http>)),
            (),
        )
        .unwrap();
        rt.run_until_stalled().unwrap();

        rt.trigger("todos", "click", "").unwrap();
        slow.answer("/posts", json!([{"id": 1, "title": "late post"}]));
        slow.answer("/todos", json!([{"id": 1, "title": "t1"}]));
        rt.run_until_stalled().unwrap();

        let html = rt.html().unwrap();
        assert!(!html.contains("late post"));
        assert!(html.contains("<li>t1</li>"));
        assert_eq!(spawner.unhandled_rejections(), 0);
    }
}
