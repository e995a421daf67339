//! # Search
//!
//! Users, public communities and posts are searched concurrently. Each
//! section fails on its own: a failed lookup is logged and shows as empty.

use vee_core::{records, Community, Filter, ListQuery, Result, User};
use vee_ui::{CommunityCardView, UserListItemView};

use crate::feed::{Feed, FeedAssembler, FeedContext, FeedSettings};
use crate::Context;

/// Result sizes of the user and community sections.
const SECTION_LIMIT: u32 = 10;

pub struct SearchResults {
    pub query: String,
    pub users: Vec<User>,
    pub communities: Vec<Community>,
    pub posts: Feed,
}

pub struct SearchService {
    ctx: Context,
    feeds: FeedAssembler,
}

impl SearchService {
    pub fn new(ctx: &Context) -> Self {
        Self { ctx: ctx.clone(), feeds: FeedAssembler::new(ctx) }
    }

    pub fn with_settings(mut self, settings: FeedSettings) -> Self {
        self.feeds = self.feeds.with_settings(settings);
        self
    }

    pub async fn search(&self, query: &str) -> SearchResults {
        let query = query.trim();
        let (users, communities, posts) = tokio::join!(
            self.users(query),
            self.communities(query),
            self.feeds.assemble(FeedContext::Search { query: query.to_string() }),
        );

        SearchResults {
            query: query.to_string(),
            users: users.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "user search failed");
                Vec::new()
            }),
            communities: communities.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "community search failed");
                Vec::new()
            }),
            posts,
        }
    }

    async fn users(&self, query: &str) -> Result<Vec<User>> {
        let filter = Filter::contains("username", query).or(Filter::contains("full_name", query));
        let page = records::<User>(self.ctx.store())
            .list(&ListQuery::new().filter(filter).page(1, SECTION_LIMIT))
            .await?;
        Ok(page.items)
    }

    async fn communities(&self, query: &str) -> Result<Vec<Community>> {
        let matches = Filter::contains("name", query).or(Filter::contains("description", query));
        let filter = Filter::And(vec![matches, Filter::eq("private", false)]);
        let page = records::<Community>(self.ctx.store())
            .list(&ListQuery::new().filter(filter).page(1, SECTION_LIMIT))
            .await?;
        Ok(page.items)
    }

    /// Renders the three sections as `(users, communities, posts)`.
    pub fn html(&self, results: &SearchResults) -> Result<(String, String, String)> {
        let templates = &self.ctx.templates;

        let users = if results.users.is_empty() {
            templates.placeholder("No users found.")?
        } else {
            let items = results
                .users
                .iter()
                .map(|user| {
                    templates.render(&UserListItemView {
                        name: user.display_name().to_string(),
                        handle: user.handle(),
                        href: templates.profile_href(&user.username),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            templates.list("users-list", items)?
        };

        let communities = if results.communities.is_empty() {
            templates.placeholder("No communities found.")?
        } else {
            let items = results
                .communities
                .iter()
                .map(|community| {
                    templates.render(&CommunityCardView {
                        name: community.name.clone(),
                        description: community.description.clone(),
                        href: templates.community_href(&community.id),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            templates.list("communities-list", items)?
        };

        Ok((users, communities, results.posts.html()?))
    }
}
