//! # Fragment Views
//!
//! One askama template per fragment. Fields holding `*_html` are already
//! rendered markup (escaped user text or nested fragments); everything else
//! is escaped by the template.

use askama::Template;

/// Like / bookmark / repost controls under a standard card.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRowView {
    pub liked: bool,
    pub like_count: u64,
    pub bookmarked: bool,
}

#[derive(Template)]
#[template(path = "post_card.html")]
pub struct PostCardView {
    pub post_id: String,
    pub author_name: String,
    pub author_handle: String,
    pub profile_href: String,
    pub timestamp: String,
    pub content_html: String,
    pub detail_href: String,
    /// Non-interactive rendering inside another card or a preview
    pub embedded: bool,
    pub actions: Option<ActionRowView>,
}

#[derive(Template)]
#[template(path = "repost_card.html")]
pub struct RepostCardView {
    pub post_id: String,
    pub reposter_name: String,
    pub profile_href: String,
    pub timestamp: String,
    pub comment_html: Option<String>,
    pub embedded_html: String,
}

#[derive(Template)]
#[template(path = "repost_surface.html")]
pub struct RepostSurfaceView {
    pub preview_html: String,
    pub text: String,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Template)]
#[template(path = "comment_card.html")]
pub struct CommentCardView {
    pub comment_id: String,
    pub depth: usize,
    pub author_name: String,
    pub author_handle: String,
    pub profile_href: String,
    pub timestamp: String,
    pub content_html: String,
    pub replies_html: Vec<String>,
    pub reply_form_html: Option<String>,
}

#[derive(Template)]
#[template(path = "reply_form.html")]
pub struct ReplyFormView {
    pub placeholder: String,
    pub text: String,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Template)]
#[template(path = "notification_card.html")]
pub struct NotificationCardView {
    pub notification_id: String,
    pub unread: bool,
    pub icon_html: String,
    pub message_html: String,
    pub timestamp: String,
}

#[derive(Template)]
#[template(path = "community_card.html")]
pub struct CommunityCardView {
    pub name: String,
    pub description: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "user_list_item.html")]
pub struct UserListItemView {
    pub name: String,
    pub handle: String,
    pub href: String,
}

/// The button in a profile header.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileAction {
    EditProfile { href: String },
    Follow,
    Unfollow,
}

#[derive(Template)]
#[template(path = "profile_header.html")]
pub struct ProfileHeaderView {
    pub name: String,
    pub handle: String,
    pub verified: bool,
    pub bio_html: String,
    pub joined: String,
    pub action: ProfileAction,
}

#[derive(Template)]
#[template(path = "community_header.html")]
pub struct CommunityHeaderView {
    pub name: String,
    pub description: String,
    pub rules_html: Option<String>,
    pub member: bool,
    pub member_count: usize,
}

#[derive(Template)]
#[template(path = "placeholder.html")]
pub struct PlaceholderView {
    pub message: String,
}

/// A container of already rendered fragments.
#[derive(Template)]
#[template(path = "list.html")]
pub struct ListView {
    pub class: String,
    pub items_html: Vec<String>,
}

pub mod icons {
    pub const LIKE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" class="like-icon"><path d="M20.84 4.61a5.5 5.5 0 0 0-7.78 0L12 5.67l-1.06-1.06a5.5 5.5 0 0 0-7.78 7.78l1.06 1.06L12 21.23l7.78-7.78 1.06-1.06a5.5 5.5 0 0 0 0-7.78z"></path></svg>"#;
    pub const COMMENT: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" class="comment-icon"><path d="M21 15a2 2 0 0 1-2 2H7l-4 4V5a2 2 0 0 1 2-2h14a2 2 0 0 1 2 2z"></path></svg>"#;
    pub const FOLLOW: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><path d="M16 21v-2a4 4 0 0 0-4-4H5a4 4 0 0 0-4 4v2"></path><circle cx="8.5" cy="7" r="4"></circle><line x1="20" y1="8" x2="20" y2="14"></line><line x1="17" y1="11" x2="23" y2="11"></line></svg>"#;
    pub const REPOST: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" class="repost-icon"><polyline points="17 1 21 5 17 9"></polyline><path d="M3 11V9a4 4 0 0 1 4-4h14"></path><polyline points="7 23 3 19 7 15"></polyline><path d="M21 13v2a4 4 0 0 1-4 4H3"></path></svg>"#;
}
