//! # Comment Threads
//!
//! Comments of a post form a forest keyed by `parent_comment`. The thread
//! is rendered to at most [`MAX_DEPTH`] levels (0, 1 and 2); deeper
//! comments stay in the store but are not shown under their ancestors.
//! Replies are appended in place, under the same depth cap, so the view
//! matches what a reload would show; the thread is never re-fetched.

use std::collections::HashMap;

use serde_json::json;
use vee_core::{
    records, validation, AppError, Comment, Expand, Filter, ListQuery, NotificationKind, Result, Sort,
};
use vee_ui::{render_inline, time_ago, CommentCardView, ReplyFormView, TemplateRegistry};

use crate::notify::NotificationDraft;
use crate::Context;

/// Number of rendered nesting levels.
pub const MAX_DEPTH: usize = 3;

/// Comments grouped by parent; `None` is the root group. Each group keeps
/// the order of the input list.
#[derive(Debug, Default)]
pub struct CommentIndex {
    groups: HashMap<Option<String>, Vec<Comment>>,
}

impl CommentIndex {
    pub fn group(comments: Vec<Comment>) -> Self {
        let mut groups: HashMap<Option<String>, Vec<Comment>> = HashMap::new();
        for comment in comments {
            groups.entry(comment.parent_comment.clone()).or_default().push(comment);
        }
        Self { groups }
    }

    pub fn roots(&self) -> &[Comment] {
        self.groups.get(&None).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn children(&self, comment_id: &str) -> &[Comment] {
        self.groups
            .get(&Some(comment_id.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyForm {
    pub text: String,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentCard {
    pub comment: Comment,
    pub depth: usize,
    pub replies: Vec<CommentCard>,
    /// Present while the reply form is open
    pub reply_form: Option<ReplyForm>,
}

impl CommentCard {
    fn leaf(comment: Comment, depth: usize) -> Self {
        Self { comment, depth, replies: Vec::new(), reply_form: None }
    }

    fn find_mut(&mut self, comment_id: &str) -> Option<&mut CommentCard> {
        if self.comment.id == comment_id {
            return Some(self);
        }
        self.replies.iter_mut().find_map(|reply| reply.find_mut(comment_id))
    }

    fn author_username(&self) -> &str {
        self.comment.expand.user.as_ref().map(|user| user.username.as_str()).unwrap_or_default()
    }

    pub fn html(&self, templates: &TemplateRegistry) -> Result<String> {
        let (author_name, author_handle, profile_href) = match &self.comment.expand.user {
            Some(user) => (user.display_name().to_string(), user.handle(), templates.profile_href(&user.username)),
            None => ("No Name".to_string(), String::new(), "#".to_string()),
        };

        let reply_form_html = match &self.reply_form {
            Some(form) => Some(templates.render(&ReplyFormView {
                placeholder: format!("Replying to @{}...", self.author_username()),
                text: form.text.clone(),
                error: form.error.clone(),
                submitting: form.submitting,
            })?),
            None => None,
        };

        let replies_html = self
            .replies
            .iter()
            .map(|reply| reply.html(templates))
            .collect::<Result<Vec<_>>>()?;

        templates.render(&CommentCardView {
            comment_id: self.comment.id.clone(),
            depth: self.depth,
            author_name,
            author_handle,
            profile_href,
            timestamp: time_ago(self.comment.created),
            content_html: render_inline(Some(self.comment.content.as_str())),
            replies_html,
            reply_form_html,
        })
    }
}

fn build_card(index: &CommentIndex, comment: &Comment, depth: usize) -> CommentCard {
    let mut card = CommentCard::leaf(comment.clone(), depth);
    if depth + 1 < MAX_DEPTH {
        card.replies = index
            .children(&comment.id)
            .iter()
            .map(|child| build_card(index, child, depth + 1))
            .collect();
    }
    card
}

pub struct CommentThreadBuilder {
    ctx: Context,
}

impl CommentThreadBuilder {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Builds the thread from an already fetched list.
    pub fn build(&self, post_id: &str, comments: Vec<Comment>) -> CommentThread {
        let index = CommentIndex::group(comments);
        let roots = index.roots().iter().map(|root| build_card(&index, root, 0)).collect();
        CommentThread {
            ctx: self.ctx.clone(),
            post_id: post_id.to_string(),
            post_author: None,
            roots,
            load_failed: false,
        }
    }

    /// Fetches every comment of the post, oldest first.
    pub async fn load(&self, post_id: &str) -> CommentThread {
        let query = ListQuery::new()
            .filter(Filter::eq("post", post_id))
            .sort(Sort::asc("created"))
            .expand(Expand::paths(["user"]));

        match records::<Comment>(self.ctx.store()).full_list(query).await {
            Ok(comments) => self.build(post_id, comments),
            Err(err) => {
                tracing::error!(error = %err, post = %post_id, "failed to load comments");
                let mut thread = self.build(post_id, Vec::new());
                thread.load_failed = true;
                thread
            }
        }
    }
}

pub struct CommentThread {
    ctx: Context,
    post_id: String,
    post_author: Option<String>,
    roots: Vec<CommentCard>,
    load_failed: bool,
}

impl CommentThread {
    /// Author of the commented post; when known, new comments notify them.
    pub fn with_post_author(mut self, author: impl Into<String>) -> Self {
        self.post_author = Some(author.into());
        self
    }

    pub fn roots(&self) -> &[CommentCard] {
        &self.roots
    }

    pub fn card(&self, comment_id: &str) -> Option<&CommentCard> {
        fn find<'a>(cards: &'a [CommentCard], id: &str) -> Option<&'a CommentCard> {
            cards.iter().find_map(|card| {
                if card.comment.id == id {
                    Some(card)
                } else {
                    find(&card.replies, id)
                }
            })
        }
        find(&self.roots, comment_id)
    }

    fn card_mut(&mut self, comment_id: &str) -> Result<&mut CommentCard> {
        self.roots
            .iter_mut()
            .find_map(|card| card.find_mut(comment_id))
            .ok_or_else(|| AppError::not_found("comment", comment_id))
    }

    /// Opens the reply form under a comment, or closes it if already open.
    /// Returns whether the form is now open.
    pub fn toggle_reply_form(&mut self, comment_id: &str) -> Result<bool> {
        let card = self.card_mut(comment_id)?;
        card.reply_form = match card.reply_form.take() {
            Some(_) => None,
            None => Some(ReplyForm::default()),
        };
        Ok(card.reply_form.is_some())
    }

    pub fn set_reply_text(&mut self, comment_id: &str, text: &str) -> Result<()> {
        let card = self.card_mut(comment_id)?;
        let form = card.reply_form.get_or_insert_with(ReplyForm::default);
        form.text = text.to_string();
        Ok(())
    }

    /// Posts the open reply form's text as a child of `comment_id`.
    ///
    /// Blank text is a no-op (`Ok(None)`). On failure the form stays open
    /// with an inline error. A reply below the last rendered level is
    /// stored but not shown.
    pub async fn submit_reply(&mut self, comment_id: &str) -> Result<Option<Comment>> {
        let card = self.card_mut(comment_id)?;
        let Some(form) = card.reply_form.as_mut() else {
            return Ok(None);
        };
        let text = form.text.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        if let Err(err) = validation::content(&text) {
            form.error = Some(err.user_message());
            return Err(err);
        }
        form.submitting = true;
        form.error = None;
        let post_id = card.comment.post.clone();
        let depth = card.depth;

        let fields = json!({
            "user": self.ctx.session.user_id(),
            "post": post_id,
            "content": text,
            "parent_comment": comment_id,
        });
        let created = records::<Comment>(self.ctx.store()).create(fields, &Expand::paths(["user"])).await;

        let card = self.card_mut(comment_id)?;
        match created {
            Ok(reply) => {
                if depth + 1 < MAX_DEPTH {
                    card.replies.push(CommentCard::leaf(reply.clone(), depth + 1));
                }
                card.reply_form = None;
                self.notify_post_author();
                Ok(Some(reply))
            }
            Err(err) => {
                tracing::warn!(error = %err, parent = %comment_id, "failed to post reply");
                if let Some(form) = card.reply_form.as_mut() {
                    form.submitting = false;
                    form.error = Some("Failed to post reply.".to_string());
                }
                Err(err)
            }
        }
    }

    /// Posts a top-level comment and puts it first.
    pub async fn submit_comment(&mut self, text: &str) -> Result<Option<Comment>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let text = validation::content(text)?;

        let fields = json!({
            "user": self.ctx.session.user_id(),
            "post": self.post_id,
            "content": text,
        });
        match records::<Comment>(self.ctx.store()).create(fields, &Expand::paths(["user"])).await {
            Ok(comment) => {
                self.roots.insert(0, CommentCard::leaf(comment.clone(), 0));
                self.load_failed = false;
                self.notify_post_author();
                Ok(Some(comment))
            }
            Err(err) => {
                tracing::warn!(error = %err, post = %self.post_id, "failed to post comment");
                Err(err)
            }
        }
    }

    fn notify_post_author(&self) {
        if let Some(author) = &self.post_author {
            self.ctx.notifier.dispatch(NotificationDraft {
                recipient: author.clone(),
                kind: NotificationKind::Comment,
                source_user: self.ctx.session.user_id(),
                post: Some(self.post_id.clone()),
            });
        }
    }

    pub fn html(&self) -> Result<String> {
        let templates = &self.ctx.templates;
        if self.load_failed {
            return templates.placeholder("Could not load comments.");
        }
        let cards = self
            .roots
            .iter()
            .map(|card| card.html(templates))
            .collect::<Result<Vec<_>>>()?;
        templates.list("comments-list", cards)
    }
}
