//! # vee-client
//!
//! The composition and interaction layer of Vee: builds post cards, comment
//! threads and feeds from store records and reconciles social actions
//! (likes, bookmarks, reposts, follows) with the record store.

pub mod comments;
pub mod compose;
pub mod events;
pub mod feed;
pub mod interaction;
pub mod notifications;
pub mod notify;
pub mod pages;
pub mod post_card;
pub mod repost;
pub mod search;
pub mod settings;
pub mod signup;
pub mod social;

use std::sync::Arc;

use vee_core::{RecordStore, Session};
use vee_ui::TemplateRegistry;

pub use comments::{CommentCard, CommentThread, CommentThreadBuilder, MAX_DEPTH};
pub use compose::PostComposer;
pub use events::{NewPostSignal, Subscription};
pub use feed::{Feed, FeedAssembler, FeedContext, FeedSettings, LiveFeed};
pub use interaction::{InteractionToggle, ToggleOutcome, ToggleState};
pub use notifications::NotificationCenter;
pub use notify::NotificationDispatcher;
pub use post_card::{CardMode, ClickTarget, PostCard, PostCardBuilder};
pub use repost::{RepostComposer, RepostOutcome};
pub use search::{SearchResults, SearchService};
pub use settings::AccountSettings;
pub use signup::{Registration, SignUpForm};
pub use social::{FollowToggle, MembershipToggle};

/// Everything a component needs, shared by cheap clones.
///
/// The session is explicit: components read the current user from here,
/// never from ambient state.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn RecordStore>,
    pub session: Session,
    pub templates: Arc<TemplateRegistry>,
    pub new_posts: NewPostSignal,
    pub notifier: NotificationDispatcher,
}

impl Context {
    pub fn new(store: Arc<dyn RecordStore>, session: Session, templates: TemplateRegistry) -> Self {
        Self {
            notifier: NotificationDispatcher::new(store.clone()),
            store,
            session,
            templates: Arc::new(templates),
            new_posts: NewPostSignal::new(),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}
