//! Composition: an approval card that wraps whatever content it is given,
//! here a comment.

use trellis_core::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub author: String,
    pub time_ago: String,
    pub body: String,
}

impl Comment {
    pub fn new(author: &str, time_ago: &str, body: &str) -> Self {
        Self {
            author: author.into(),
            time_ago: time_ago.into(),
            body: body.into(),
        }
    }

    /// Stable placeholder avatar per author.
    pub fn avatar_url(&self) -> String {
        with_query("https://i.pravatar.cc/64", &[("u", self.author.as_str())])
    }
}

pub struct CommentDetail;

impl Component for CommentDetail {
    type Props = Comment;

    fn name(&self) -> &'static str {
        "CommentDetail"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, c: &Comment) -> View {
        Div()
            .class("comment")
            .child(
                El("a")
                    .class("avatar")
                    .attr("href", "/")
                    .child(El("img").attr("alt", "avatar").attr("src", c.avatar_url())),
            )
            .child(
                Div()
                    .class("content")
                    .child(El("a").class("author").attr("href", "/").child(Text(c.author.clone())))
                    .child(
                        Div()
                            .class("metadata")
                            .child(El("span").class("date").child(Text(c.time_ago.clone()))),
                    )
                    .child(Div().class("text").child(Text(c.body.clone()))),
            )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

/// Card with approve and reject buttons around arbitrary content. The
/// content is fixed at construction; props name the card so its buttons
/// get distinct ids.
pub struct ApprovalCard {
    content: View,
}

impl ApprovalCard {
    pub fn new(content: View) -> Self {
        Self { content }
    }
}

impl Component for ApprovalCard {
    type Props = String;

    fn name(&self) -> &'static str {
        "ApprovalCard"
    }

    fn render(&self, cx: &mut RenderCx<'_>, card: &String) -> View {
        let (verdict, set_verdict) = cx.use_state(|| None::<Verdict>);
        let button = |label: &str, class: &str, id: String, choice: Verdict| {
            let set = set_verdict.clone();
            Button(label, move || set.set(Some(choice)))
                .class(format!("ui basic {class} button"))
                .id(id)
        };
        let extra = match verdict {
            None => Div()
                .class("ui two buttons")
                .child(button("Approve", "green", format!("approve-{card}"), Verdict::Approved))
                .child(button("Reject", "red", format!("reject-{card}"), Verdict::Rejected)),
            Some(Verdict::Approved) => Div().class("ui green label").child(Text("Approved")),
            Some(Verdict::Rejected) => Div().class("ui red label").child(Text("Rejected")),
        };
        Div()
            .class("ui card")
            .child(Div().class("content").child(self.content.clone()))
            .child(Div().class("extra content").child(extra))
    }
}

pub fn sample_comments() -> Vec<Comment> {
    vec![
        Comment::new("Sam", "Today at 4:45pm", "This is comment 1"),
        Comment::new("Bob", "Today at 10:00 am", "This is comment 2"),
        Comment::new("Sean", "Yesterday at 6:45pm", "This is comment 3"),
    ]
}

pub struct CommentsApp;

impl Component for CommentsApp {
    type Props = Vec<Comment>;

    fn name(&self) -> &'static str {
        "CommentsApp"
    }

    fn render(&self, _cx: &mut RenderCx<'_>, comments: &Vec<Comment>) -> View {
        let cards = comments
            .iter()
            .map(|c| {
                let detail = View::component(CommentDetail, c.clone());
                View::component(ApprovalCard::new(detail), c.author.to_lowercase())
                    .key(c.author.clone())
            })
            .collect();
        Div().class("ui container comments").with_children(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_card_wraps_its_comment() {
        let mut rt = Runtime::new();
        rt.mount(CommentsApp, sample_comments()).unwrap();
        let html = rt.html().unwrap();
        assert_eq!(html.matches(r#"<div class="ui card">"#).count(), 3);
        assert!(html.contains(r#"<div class="text">This is comment 2</div>"#));
        assert!(html.contains(r#"src="https://i.pravatar.cc/64?u=Sean""#));
        assert_eq!(rt.node_count(), 7);
    }

    #[test]
    fn a_verdict_only_touches_its_own_card() {
        let mut rt = Runtime::new();
        rt.mount(CommentsApp, sample_comments()).unwrap();
        rt.trigger("approve-bob", "click", "").unwrap();
        rt.trigger("reject-sam", "click", "").unwrap();

        let html = rt.html().unwrap();
        assert!(html.contains(r#"<div class="ui green label">Approved</div>"#));
        assert!(html.contains(r#"<div class="ui red label">Rejected</div>"#));
        assert!(html.contains(r#"id="approve-sean""#));
        assert!(rt.trigger("approve-bob", "click", "").is_err());

        let detail = rt.find("CommentDetail").unwrap();
        assert_eq!(rt.render_count(detail), Some(1));
    }

    #[test]
    fn card_markup() {
        let mut rt = Runtime::new();
        rt.mount(CommentsApp, vec![Comment::new("Ana", "now", "Hi")]).unwrap();
        insta::assert_snapshot!(
            rt.html().unwrap(),
            @r#"<div class="ui container comments"><div class="ui card"><div class="content"><div class="comment"><a class="avatar" href="/"><img alt="avatar" src="https://i.pravatar.cc/64?u=Ana"></img></a><div class="content"><a class="author" href="/">Ana</a><div class="metadata"><span class="date">now</span></div><div class="text">Hi</div></div></div></div><div class="extra content"><div class="ui two buttons"><button class="ui basic green button" id="approve-ana">Approve</button><button class="ui basic red button" id="reject-ana">Reject</button></div></div></div></div>"#
        );
    }
}
