//! # Template Registry
//!
//! Resolved once at startup and shared by every builder: the route table
//! used for links plus rendering of the compiled fragments.

use askama::Template;
use serde::Deserialize;
use vee_core::error::{AppError, Result};

use crate::views::{ListView, PlaceholderView};

/// URL patterns of the pages cards link to. `{username}` and `{id}` are
/// substituted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub profile: String,
    pub post: String,
    pub community: String,
    pub settings: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            profile: "/profile?u={username}".to_string(),
            post: "/post?id={id}".to_string(),
            community: "/community?id={id}".to_string(),
            settings: "/settings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    routes: Routes,
}

impl TemplateRegistry {
    pub fn new(routes: Routes) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn profile_href(&self, username: &str) -> String {
        self.routes.profile.replace("{username}", username)
    }

    pub fn post_href(&self, post_id: &str) -> String {
        self.routes.post.replace("{id}", post_id)
    }

    pub fn community_href(&self, community_id: &str) -> String {
        self.routes.community.replace("{id}", community_id)
    }

    pub fn settings_href(&self) -> &str {
        &self.routes.settings
    }

    /// Renders any fragment view.
    pub fn render<T: Template>(&self, view: &T) -> Result<String> {
        view.render().map_err(|err| AppError::Internal(format!("template rendering failed: {err}")))
    }

    pub fn placeholder(&self, message: &str) -> Result<String> {
        self.render(&PlaceholderView { message: message.to_string() })
    }

    pub fn list(&self, class: &str, items_html: Vec<String>) -> Result<String> {
        self.render(&ListView { class: class.to_string(), items_html })
    }
}
