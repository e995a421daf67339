//! # Pages
//!
//! Loaders for the pages built from the components above: post detail,
//! profile, community and the community directory. A page that cannot be
//! loaded renders a single message instead.

use std::sync::Arc;

use vee_core::{records, Community, Expand, Filter, ListQuery, Post, Result, Sort, User};
use vee_ui::{
    month_year, render_inline, CommunityCardView, CommunityHeaderView, ProfileAction, ProfileHeaderView,
    TemplateRegistry,
};

use crate::comments::{CommentThread, CommentThreadBuilder};
use crate::feed::{Feed, FeedAssembler, FeedContext, FeedSettings};
use crate::post_card::{CardMode, PostCard, PostCardBuilder};
use crate::social::{FollowToggle, MembershipToggle};
use crate::Context;

pub trait Render {
    fn html(&self) -> Result<String>;
}

/// A loaded page, or the message shown in its place.
pub enum Loaded<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Loaded<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(page) => Some(page),
            Self::Unavailable(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Unavailable(message) => Some(message.as_str()),
        }
    }
}

impl<T: Render> Loaded<T> {
    pub fn html(&self, templates: &TemplateRegistry) -> Result<String> {
        match self {
            Self::Ready(page) => page.html(),
            Self::Unavailable(message) => templates.placeholder(message),
        }
    }
}

pub struct PostDetailPage {
    pub card: PostCard,
    pub comments: CommentThread,
}

impl Render for PostDetailPage {
    fn html(&self) -> Result<String> {
        Ok(format!("{}{}", self.card.html()?, self.comments.html()?))
    }
}

pub struct ProfilePage {
    pub user: User,
    /// Absent on the viewer's own profile
    pub follow: Option<FollowToggle>,
    pub posts: Feed,
    templates: Arc<TemplateRegistry>,
}

impl Render for ProfilePage {
    fn html(&self) -> Result<String> {
        let action = match &self.follow {
            None => ProfileAction::EditProfile { href: self.templates.settings_href().to_string() },
            Some(follow) if follow.is_following() => ProfileAction::Unfollow,
            Some(_) => ProfileAction::Follow,
        };
        let header = self.templates.render(&ProfileHeaderView {
            name: self.user.display_name().to_string(),
            handle: self.user.handle(),
            verified: self.user.verified,
            bio_html: render_inline(Some(self.user.bio.as_str())),
            joined: month_year(self.user.created),
            action,
        })?;
        self.templates.list("profile-container", vec![header, self.posts.html()?])
    }
}

pub struct CommunityPage {
    pub membership: MembershipToggle,
    pub posts: Feed,
    templates: Arc<TemplateRegistry>,
}

impl Render for CommunityPage {
    fn html(&self) -> Result<String> {
        let community = self.membership.community();
        let rules = community.rules.trim();
        let header = self.templates.render(&CommunityHeaderView {
            name: community.name.clone(),
            description: community.description.clone(),
            rules_html: (!rules.is_empty()).then(|| render_inline(Some(community.rules.as_str()))),
            member: self.membership.is_member(),
            member_count: self.membership.member_count(),
        })?;
        self.templates.list("community-container", vec![header, self.posts.html()?])
    }
}

pub struct CommunityDirectory {
    pub communities: Vec<Community>,
    templates: Arc<TemplateRegistry>,
}

impl Render for CommunityDirectory {
    fn html(&self) -> Result<String> {
        if self.communities.is_empty() {
            return self.templates.placeholder("No public communities found.");
        }
        let cards = self
            .communities
            .iter()
            .map(|community| {
                self.templates.render(&CommunityCardView {
                    name: community.name.clone(),
                    description: community.description.clone(),
                    href: self.templates.community_href(&community.id),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.templates.list("communities-list", cards)
    }
}

pub struct Pages {
    ctx: Context,
    cards: PostCardBuilder,
    threads: CommentThreadBuilder,
    feeds: FeedAssembler,
}

impl Pages {
    pub fn new(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            cards: PostCardBuilder::new(ctx),
            threads: CommentThreadBuilder::new(ctx),
            feeds: FeedAssembler::new(ctx),
        }
    }

    pub fn with_settings(mut self, settings: FeedSettings) -> Self {
        self.feeds = self.feeds.with_settings(settings);
        self
    }

    /// One post with its comments. The card does not navigate to itself.
    pub async fn post_detail(&self, post_id: &str) -> Loaded<PostDetailPage> {
        let post = match records::<Post>(self.ctx.store()).get_one(post_id, &Expand::post_with_original()).await {
            Ok(post) => post,
            Err(err) if err.is_not_found() => {
                return Loaded::Unavailable("This post could not be found. It may have been deleted.".into());
            }
            Err(err) => {
                tracing::error!(error = %err, post = %post_id, "failed to load post");
                return Loaded::Unavailable("An error occurred while loading this post.".into());
            }
        };

        let (mut card, comments) =
            tokio::join!(self.cards.build(&post, CardMode::Standard), self.threads.load(&post.id));
        card.suppress_navigation();
        Loaded::Ready(PostDetailPage { card, comments: comments.with_post_author(post.author.clone()) })
    }

    pub async fn profile(&self, username: &str) -> Loaded<ProfilePage> {
        let lookup = records::<User>(self.ctx.store()).first_matching(&Filter::eq("username", username)).await;
        let user = match lookup {
            Ok(user) => user,
            Err(err) if err.is_not_found() => return Loaded::Unavailable(format!("User @{username} not found.")),
            Err(err) => {
                tracing::error!(error = %err, username = %username, "failed to load profile");
                return Loaded::Unavailable("Error loading profile.".into());
            }
        };

        let follow = FollowToggle::new(&self.ctx, &user.id).ok();
        let posts = self.feeds.assemble(FeedContext::Profile { user_id: user.id.clone() }).await;
        Loaded::Ready(ProfilePage { user, follow, posts, templates: self.ctx.templates.clone() })
    }

    pub async fn community(&self, community_id: &str) -> Loaded<CommunityPage> {
        let community = match records::<Community>(self.ctx.store()).get_one(community_id, &Expand::none()).await {
            Ok(community) => community,
            Err(err) => {
                tracing::error!(error = %err, community = %community_id, "failed to load community");
                return Loaded::Unavailable(
                    "Could not load this community. It may be private or does not exist.".into(),
                );
            }
        };

        let posts = self.feeds.assemble(FeedContext::Community { community_id: community.id.clone() }).await;
        Loaded::Ready(CommunityPage {
            membership: MembershipToggle::new(&self.ctx, community),
            posts,
            templates: self.ctx.templates.clone(),
        })
    }

    /// Public communities, newest first.
    pub async fn communities(&self) -> Loaded<CommunityDirectory> {
        let query = ListQuery::new().filter(Filter::eq("private", false)).sort(Sort::desc("created"));
        match records::<Community>(self.ctx.store()).full_list(query).await {
            Ok(communities) => {
                Loaded::Ready(CommunityDirectory { communities, templates: self.ctx.templates.clone() })
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load communities");
                Loaded::Unavailable("Could not load communities.".into())
            }
        }
    }
}
