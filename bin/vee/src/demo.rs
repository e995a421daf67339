//! Demo data for the memory store and a scripted run through the social
//! actions: follow, join, like, repost, comment, then the other side's
//! notifications.

use anyhow::{Context as _, Result};
use serde_json::json;
use vee_client::{
    CardMode, CommentThreadBuilder, Context, FeedAssembler, FeedContext, FeedSettings, FollowToggle,
    MembershipToggle, NotificationCenter, PostCardBuilder, RepostComposer,
};
use vee_core::{collections, records, Community, Expand, Filter, Post, Session, User};
use vee_store_memory::MemoryStore;

const USERS: [(&str, &str, &str, &str); 3] = [
    ("ada", "ada", "Ada Lovelace", "Writes *notes* on engines."),
    ("bob", "bob", "Bob", "Mostly **Rust**."),
    ("cy", "cy", "", ""),
];

pub fn seeded_store() -> Result<MemoryStore> {
    let store = MemoryStore::with_social_schema();

    for (id, username, full_name, bio) in USERS {
        store.insert(
            collections::USERS,
            json!({ "id": id, "username": username, "full_name": full_name, "bio": bio, "verified": id == "bob" }),
        )?;
    }

    store.insert(
        collections::COMMUNITIES,
        json!({
            "id": "rustaceans", "name": "Rustaceans", "description": "All things Rust.",
            "rules": "Be **kind**.", "members": ["bob", "cy"], "private": false
        }),
    )?;
    store.insert(
        collections::COMMUNITIES,
        json!({ "id": "backroom", "name": "Backroom", "members": ["cy"], "private": true }),
    )?;

    store.insert(collections::POSTS, json!({ "id": "hello", "author": "bob", "content": "Hello from **Bob**!" }))?;
    store.insert(
        collections::POSTS,
        json!({ "id": "ferris", "author": "cy", "community": "rustaceans", "content": "Ferris says *hi*" }),
    )?;
    store.insert(
        collections::POSTS,
        json!({ "id": "boost", "author": "cy", "content": "Worth a read", "original_post": "hello" }),
    )?;

    store.insert(
        collections::COMMENTS,
        json!({ "id": "first", "user": "cy", "post": "hello", "content": "Nice post" }),
    )?;
    store.insert(
        collections::COMMENTS,
        json!({ "user": "bob", "post": "hello", "content": "Thanks!", "parent_comment": "first" }),
    )?;

    Ok(store)
}

pub async fn walkthrough(ctx: &Context, settings: FeedSettings) -> Result<()> {
    let feeds = FeedAssembler::new(ctx).with_settings(settings);
    let before = feeds.assemble(FeedContext::Home).await;
    tracing::info!(posts = before.len(), placeholder = ?before.placeholder(), "home feed before following anyone");

    let bob = records::<User>(ctx.store())
        .first_matching(&Filter::eq("username", "bob"))
        .await
        .context("demo data has no @bob")?;
    let follow = FollowToggle::new(ctx, &bob.id)?.toggle().await?;
    if let Some(task) = follow.notification {
        task.await?;
    }

    let community = records::<Community>(ctx.store()).get_one("rustaceans", &Expand::none()).await?;
    let joined = MembershipToggle::new(ctx, community).toggle().await?;
    tracing::info!(joined, "membership of Rustaceans");

    let live = feeds.live(feeds.assemble(FeedContext::Home).await);
    tracing::info!(posts = live.len(), "home feed after following @bob and joining Rustaceans");

    let target = records::<Post>(ctx.store()).get_one("hello", &Expand::post_with_original()).await?;
    let card = PostCardBuilder::new(ctx).build(&target, CardMode::Standard).await;
    if let Some(like) = card.like() {
        let outcome = like.toggle().await?;
        if let Some(task) = outcome.notification {
            task.await?;
        }
        tracing::info!(likes = ?outcome.state.count, "liked @bob's post");
    }

    let mut reposts = RepostComposer::new(ctx);
    reposts.open(&target);
    reposts.set_text("Everyone should see this");
    let repost = reposts.confirm().await?;
    if let Some(task) = repost.notification {
        task.await?;
    }
    tracing::info!(repost = %repost.post.id, posts = live.len(), "reposted into the live feed");

    let mut thread = CommentThreadBuilder::new(ctx).load(&target.id).await.with_post_author(target.author.clone());
    thread.submit_comment("Great read!").await?;

    println!("{}", live.html()?);
    println!("{}", thread.html()?);

    let inbox = NotificationCenter::load(&Context::new(
        ctx.store.clone(),
        Session::new(bob),
        (*ctx.templates).clone(),
    ))
    .await;
    tracing::info!(unread = inbox.unread_count(), "notifications waiting for @bob");
    println!("{}", inbox.html()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vee_core::ListQuery;

    #[tokio::test]
    async fn test_seeded_store_wires_relations() {
        let store = seeded_store().unwrap();
        let boost = records::<Post>(&store).get_one("boost", &Expand::post_with_original()).await.unwrap();
        assert_eq!(boost.original().unwrap().author_record().unwrap().username, "bob");

        let public = records::<Community>(&store)
            .list(&ListQuery::new().filter(Filter::eq("private", false)))
            .await
            .unwrap();
        assert_eq!(public.total, 1);
        assert_eq!(store.count(collections::COMMENTS), 2);
    }
}
