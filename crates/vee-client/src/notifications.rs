//! The viewer's notification list.

use serde_json::json;
use vee_core::{records, AppError, Expand, Filter, ListQuery, Notification, NotificationKind, Result, Sort};
use vee_ui::{icons, time_ago, NotificationCardView};

use crate::Context;

/// Icon shown next to a notification; empty for kinds without one.
pub fn icon_html(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Like => icons::LIKE,
        NotificationKind::Comment => icons::COMMENT,
        NotificationKind::Follow => icons::FOLLOW,
        NotificationKind::Repost => icons::REPOST,
        NotificationKind::Mention | NotificationKind::CommunityJoin => "",
    }
}

/// Message markup; the source user's handle is escaped.
pub fn message_html(notification: &Notification) -> String {
    let Some(source) = &notification.expand.source_user else {
        return "You have a new notification.".to_string();
    };
    let action = match notification.kind {
        NotificationKind::Like => "liked your post.",
        NotificationKind::Comment => "commented on your post.",
        NotificationKind::Follow => "started following you.",
        NotificationKind::Repost => "reposted your post.",
        NotificationKind::Mention => "mentioned you.",
        NotificationKind::CommunityJoin => "joined your community.",
    };
    format!("<strong>@{}</strong> {action}", html_escape::encode_text(&source.username))
}

pub struct NotificationCenter {
    ctx: Context,
    items: Vec<Notification>,
    load_failed: bool,
}

impl NotificationCenter {
    /// Loads every notification addressed to the viewer, newest first.
    pub async fn load(ctx: &Context) -> Self {
        let query = ListQuery::new()
            .filter(Filter::eq("user", ctx.session.user_id()))
            .sort(Sort::desc("created"))
            .expand(Expand::paths(["source_user", "post"]));

        let (items, load_failed) = match records::<Notification>(ctx.store()).full_list(query).await {
            Ok(items) => (items, false),
            Err(err) => {
                tracing::error!(error = %err, "failed to load notifications");
                (Vec::new(), true)
            }
        };
        Self { ctx: ctx.clone(), items, load_failed }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Marks one notification read. Already read ones are left alone and
    /// cost no store call; returns whether an update was made.
    pub async fn mark_read(&mut self, notification_id: &str) -> Result<bool> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == notification_id)
            .ok_or_else(|| AppError::not_found("notification", notification_id))?;
        if item.read {
            return Ok(false);
        }

        records::<Notification>(self.ctx.store())
            .update(notification_id, json!({ "read": true }))
            .await
            .inspect_err(|err| {
                tracing::warn!(error = %err, notification = %notification_id, "failed to mark notification read");
            })?;
        item.read = true;
        Ok(true)
    }

    pub fn html(&self) -> Result<String> {
        let templates = &self.ctx.templates;
        if self.load_failed {
            return templates.placeholder("Could not load notifications.");
        }
        if self.items.is_empty() {
            return templates.placeholder("You have no notifications.");
        }

        let cards = self
            .items
            .iter()
            .map(|item| {
                templates.render(&NotificationCardView {
                    notification_id: item.id.clone(),
                    unread: !item.read,
                    icon_html: icon_html(item.kind).to_string(),
                    message_html: message_html(item),
                    timestamp: time_ago(item.created),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        templates.list("notifications-list", cards)
    }
}
