//! # Post Cards
//!
//! `PostCardBuilder::build(post, mode)` is the only way to obtain a card.
//! A repost built in `Standard` mode becomes a composite around exactly one
//! `Embedded` card for its original; an `Embedded` build never looks at
//! `original_post`, which bounds the recursion to one level.

use std::sync::Arc;

use vee_core::{InteractionKind, Post, Result, User};
use vee_ui::{render_inline, time_ago, ActionRowView, PostCardView, RepostCardView, TemplateRegistry};

use crate::interaction::InteractionToggle;
use crate::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMode {
    /// Interactive card in a feed or detail view
    Standard,
    /// Non-interactive card nested in a repost or a preview
    Embedded,
}

/// What a click on a card landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Body,
    Button,
    Link,
}

/// The controls of a standard card.
pub struct CardControls {
    pub like: Arc<InteractionToggle>,
    pub bookmark: Arc<InteractionToggle>,
}

enum CardBody {
    Plain { controls: Option<CardControls> },
    Repost { embedded: Box<PostCard> },
}

pub struct PostCard {
    post: Post,
    mode: CardMode,
    body: CardBody,
    templates: Arc<TemplateRegistry>,
    navigation_suppressed: bool,
}

impl PostCard {
    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn mode(&self) -> CardMode {
        self.mode
    }

    /// True for the "<user> reposted" composite.
    pub fn is_repost_composite(&self) -> bool {
        matches!(self.body, CardBody::Repost { .. })
    }

    pub fn embedded(&self) -> Option<&PostCard> {
        match &self.body {
            CardBody::Repost { embedded } => Some(embedded.as_ref()),
            CardBody::Plain { .. } => None,
        }
    }

    pub fn controls(&self) -> Option<&CardControls> {
        match &self.body {
            CardBody::Plain { controls } => controls.as_ref(),
            CardBody::Repost { .. } => None,
        }
    }

    pub fn like(&self) -> Option<&Arc<InteractionToggle>> {
        self.controls().map(|controls| &controls.like)
    }

    pub fn bookmark(&self) -> Option<&Arc<InteractionToggle>> {
        self.controls().map(|controls| &controls.bookmark)
    }

    /// Keeps body clicks from navigating; used by the detail view, where
    /// the card would link to itself.
    pub fn suppress_navigation(&mut self) {
        self.navigation_suppressed = true;
    }

    /// Where a click navigates, if anywhere.
    pub fn click(&self, target: ClickTarget) -> Option<String> {
        let detail = self.templates.post_href(&self.post.id);
        match (self.mode, target) {
            (CardMode::Embedded, _) => Some(detail),
            (CardMode::Standard, ClickTarget::Button | ClickTarget::Link) => None,
            (CardMode::Standard, ClickTarget::Body) if self.navigation_suppressed => None,
            (CardMode::Standard, ClickTarget::Body) => Some(detail),
        }
    }

    /// Renders the card with the current toggle state.
    pub fn html(&self) -> Result<String> {
        match &self.body {
            CardBody::Repost { embedded } => {
                let reposter = Author::of(self.post.author_record(), &self.templates);
                let comment = self.post.content.trim();
                self.templates.render(&RepostCardView {
                    post_id: self.post.id.clone(),
                    reposter_name: reposter.name,
                    profile_href: reposter.href,
                    timestamp: time_ago(self.post.created),
                    comment_html: (!comment.is_empty()).then(|| render_inline(Some(self.post.content.as_str()))),
                    embedded_html: embedded.html()?,
                })
            }
            CardBody::Plain { controls } => {
                let author = Author::of(self.post.author_record(), &self.templates);
                let actions = controls.as_ref().map(|controls| {
                    let like = controls.like.state();
                    ActionRowView {
                        liked: like.active(),
                        like_count: like.count.unwrap_or_default(),
                        bookmarked: controls.bookmark.state().active(),
                    }
                });
                self.templates.render(&PostCardView {
                    post_id: self.post.id.clone(),
                    author_name: author.name,
                    author_handle: author.handle,
                    profile_href: author.href,
                    timestamp: time_ago(self.post.created),
                    content_html: render_inline(Some(self.post.content.as_str())),
                    detail_href: self.templates.post_href(&self.post.id),
                    embedded: self.mode == CardMode::Embedded,
                    actions,
                })
            }
        }
    }
}

/// Author fields, with placeholders when the relation was not expanded.
struct Author {
    name: String,
    handle: String,
    href: String,
}

impl Author {
    fn of(user: Option<&User>, templates: &TemplateRegistry) -> Self {
        match user {
            Some(user) => Self {
                name: user.display_name().to_string(),
                handle: user.handle(),
                href: templates.profile_href(&user.username),
            },
            None => Self { name: "No Name".to_string(), handle: String::new(), href: "#".to_string() },
        }
    }
}

#[derive(Clone)]
pub struct PostCardBuilder {
    ctx: Context,
}

impl PostCardBuilder {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Builds a card, loading toggle state for standard cards.
    pub async fn build(&self, post: &Post, mode: CardMode) -> PostCard {
        if mode == CardMode::Embedded {
            return self.build_embedded(post);
        }
        if let Some(composite) = self.repost_composite(post) {
            return composite;
        }

        let (like, bookmark) = tokio::join!(
            InteractionToggle::load(&self.ctx, post, InteractionKind::Like),
            InteractionToggle::load(&self.ctx, post, InteractionKind::Bookmark),
        );
        self.plain(post, CardMode::Standard, Some(CardControls { like: Arc::new(like), bookmark: Arc::new(bookmark) }))
    }

    /// Standard card for a post that was just created, without any store
    /// calls.
    pub fn build_fresh(&self, post: &Post) -> PostCard {
        if let Some(composite) = self.repost_composite(post) {
            return composite;
        }
        let controls = CardControls {
            like: Arc::new(InteractionToggle::fresh(&self.ctx, post, InteractionKind::Like)),
            bookmark: Arc::new(InteractionToggle::fresh(&self.ctx, post, InteractionKind::Bookmark)),
        };
        self.plain(post, CardMode::Standard, Some(controls))
    }

    /// Non-interactive card. A repost shows its own record here; it is
    /// never unrolled further.
    pub fn build_embedded(&self, post: &Post) -> PostCard {
        self.plain(post, CardMode::Embedded, None)
    }

    fn repost_composite(&self, post: &Post) -> Option<PostCard> {
        let original = post.original()?;
        Some(PostCard {
            post: post.clone(),
            mode: CardMode::Standard,
            body: CardBody::Repost { embedded: Box::new(self.build_embedded(original)) },
            templates: self.ctx.templates.clone(),
            navigation_suppressed: false,
        })
    }

    fn plain(&self, post: &Post, mode: CardMode, controls: Option<CardControls>) -> PostCard {
        PostCard {
            post: post.clone(),
            mode,
            body: CardBody::Plain { controls },
            templates: self.ctx.templates.clone(),
            navigation_suppressed: false,
        }
    }
}
