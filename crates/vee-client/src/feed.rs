//! # Feed Assembly
//!
//! A feed is one filtered, newest-first list of posts rendered through the
//! card builder. It is loaded in full once; afterwards new posts only ever
//! arrive through the new-post signal and are prepended.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use vee_core::{records, Community, Expand, Filter, ListQuery, Post, Result, Sort};
use vee_ui::TemplateRegistry;

use crate::events::Subscription;
use crate::post_card::{CardMode, PostCard, PostCardBuilder};
use crate::Context;

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedContext {
    /// Followed users and joined communities of the viewer
    Home,
    Profile { user_id: String },
    Community { community_id: String },
    Search { query: String },
}

/// Home feed of a viewer who follows no one and joined nothing.
const NOTHING_TO_SHOW: &str = "Follow users or join communities to see posts here!";

impl FeedContext {
    fn empty_message(&self) -> &'static str {
        match self {
            Self::Home => "No posts from your followed users or communities yet.",
            Self::Profile { .. } => "This user hasn't posted anything yet.",
            Self::Community { .. } => "No posts in this community yet.",
            Self::Search { .. } => "No posts found.",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Self::Home => "Could not load your feed. Please try again later.",
            _ => "Could not load posts.",
        }
    }
}

/// The home filter: posts by followed users or in joined communities.
///
/// `None` when both sets are empty; there is nothing to query then.
pub fn home_filter(following: &[String], communities: &[String]) -> Option<Filter> {
    let group = |field: &str, ids: &[String]| {
        (!ids.is_empty()).then(|| Filter::any(ids.iter().map(|id| Filter::eq(field, id)).collect()))
    };

    match (group("author", following), group("community", communities)) {
        (Some(authors), Some(communities)) => Some(Filter::Or(vec![authors, communities])),
        (authors, communities) => authors.or(communities),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Home and profile feeds show the first page of this size.
    pub page_size: u32,
    /// Post results of a search.
    pub search_limit: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self { page_size: 50, search_limit: 15 }
    }
}

pub struct Feed {
    context: FeedContext,
    cards: VecDeque<PostCard>,
    placeholder: Option<&'static str>,
    templates: Arc<TemplateRegistry>,
}

impl Feed {
    fn new(context: FeedContext, templates: Arc<TemplateRegistry>) -> Self {
        Self { context, cards: VecDeque::new(), placeholder: None, templates }
    }

    fn with_placeholder(mut self, message: &'static str) -> Self {
        self.placeholder = Some(message);
        self
    }

    pub fn context(&self) -> &FeedContext {
        &self.context
    }

    pub fn cards(&self) -> impl Iterator<Item = &PostCard> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.cards.iter().any(|card| card.post().id == post_id)
    }

    /// Puts a card first. Other cards are left alone; a post that is
    /// already shown is not added again.
    pub fn prepend(&mut self, card: PostCard) -> bool {
        if self.contains(&card.post().id) {
            return false;
        }
        self.placeholder = None;
        self.cards.push_front(card);
        true
    }

    pub fn html(&self) -> Result<String> {
        if self.cards.is_empty() {
            if let Some(message) = self.placeholder {
                return self.templates.placeholder(message);
            }
        }
        let cards = self.cards.iter().map(PostCard::html).collect::<Result<Vec<_>>>()?;
        self.templates.list("feed", cards)
    }
}

#[derive(Clone)]
pub struct FeedAssembler {
    ctx: Context,
    cards: PostCardBuilder,
    settings: FeedSettings,
}

impl FeedAssembler {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone(), cards: PostCardBuilder::new(ctx), settings: FeedSettings::default() }
    }

    pub fn with_settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Communities whose members include the viewer.
    pub async fn joined_communities(&self) -> Result<Vec<Community>> {
        let query = ListQuery::new().filter(Filter::contains("members", self.ctx.session.user_id()));
        records::<Community>(self.ctx.store()).full_list(query).await
    }

    /// The list query for a context; `None` when there is nothing to ask.
    pub async fn query_for(&self, context: &FeedContext) -> Result<Option<ListQuery>> {
        let base = ListQuery::new().sort(Sort::desc("created")).expand(Expand::post_with_original());

        let query = match context {
            FeedContext::Home => {
                let following = self.ctx.session.following();
                let joined: Vec<String> =
                    self.joined_communities().await?.into_iter().map(|community| community.id).collect();
                match home_filter(&following, &joined) {
                    Some(filter) => base.filter(filter).page(1, self.settings.page_size),
                    None => return Ok(None),
                }
            }
            FeedContext::Profile { user_id } => {
                base.filter(Filter::eq("author", user_id)).page(1, self.settings.page_size)
            }
            FeedContext::Community { community_id } => base.filter(Filter::eq("community", community_id)),
            FeedContext::Search { query } => {
                base.filter(Filter::contains("content", query.as_str())).page(1, self.settings.search_limit)
            }
        };
        Ok(Some(query))
    }

    /// Loads and renders a feed, propagating store failures.
    pub async fn try_assemble(&self, context: FeedContext) -> Result<Feed> {
        let mut feed = Feed::new(context.clone(), self.ctx.templates.clone());
        let Some(query) = self.query_for(&context).await? else {
            return Ok(feed.with_placeholder(NOTHING_TO_SHOW));
        };

        let posts = records::<Post>(self.ctx.store()).list(&query).await?.items;
        if posts.is_empty() {
            return Ok(feed.with_placeholder(context.empty_message()));
        }

        for post in &posts {
            feed.cards.push_back(self.cards.build(post, CardMode::Standard).await);
        }
        Ok(feed)
    }

    /// Like `try_assemble`, but a failure becomes the context's error
    /// message.
    pub async fn assemble(&self, context: FeedContext) -> Feed {
        match self.try_assemble(context.clone()).await {
            Ok(feed) => feed,
            Err(err) => {
                tracing::error!(error = %err, context = ?context, "failed to load feed");
                let message = context.failure_message();
                Feed::new(context, self.ctx.templates.clone()).with_placeholder(message)
            }
        }
    }

    /// Keeps `feed` subscribed to the new-post signal.
    pub fn live(&self, feed: Feed) -> LiveFeed {
        let feed = Arc::new(Mutex::new(feed));
        let cards = self.cards.clone();
        let target = Arc::downgrade(&feed);

        let subscription = self.ctx.new_posts.subscribe(move |post| {
            let Some(feed) = target.upgrade() else {
                return;
            };
            let card = cards.build_fresh(post);
            if lock(&feed).prepend(card) {
                tracing::debug!(post = %post.id, "prepended new post");
            }
        });

        LiveFeed { feed, _subscription: subscription }
    }
}

fn lock(feed: &Mutex<Feed>) -> MutexGuard<'_, Feed> {
    feed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A feed that prepends every post announced on the new-post signal until
/// it is dropped.
pub struct LiveFeed {
    feed: Arc<Mutex<Feed>>,
    _subscription: Subscription,
}

impl LiveFeed {
    pub fn with<T>(&self, f: impl FnOnce(&Feed) -> T) -> T {
        let feed = lock(&self.feed);
        f(&*feed)
    }

    pub fn len(&self) -> usize {
        self.with(Feed::len)
    }

    pub fn is_empty(&self) -> bool {
        self.with(Feed::is_empty)
    }

    pub fn html(&self) -> Result<String> {
        self.with(Feed::html)
    }
}
