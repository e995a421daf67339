//! # vee
//!
//! Command-line front end: signs in, builds one page and prints its HTML.
//! The record store adapter is picked by configuration among the ones
//! compiled in (see the crate features).

#[cfg(feature = "store-memory")]
mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vee_client::pages::Pages;
use vee_client::{
    AccountSettings, Context, FeedAssembler, FeedContext, FeedSettings, NotificationCenter,
    PostCardBuilder, PostComposer, Registration, SearchService, SignUpForm,
};
use vee_configs::{AppConfig, LogConfig, StoreBackend};
use vee_core::Session;
use vee_ui::TemplateRegistry;

#[derive(Parser)]
#[command(name = "vee", about = "Vee social network client", version)]
struct Cli {
    /// Configuration file (defaults to ./vee.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Demo user to act as with the memory store
    #[arg(long = "as", value_name = "USERNAME", default_value = "ada")]
    as_user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Followed users and joined communities
    Home,
    /// One post with its comments
    Post { id: String },
    /// Publish a new post
    Publish {
        text: String,
        /// Community id to post into
        #[arg(long)]
        community: Option<String>,
    },
    /// A user's profile and posts
    Profile { username: String },
    /// One community and its posts
    Community { id: String },
    /// Public communities, newest first
    Communities,
    /// Users, communities and posts matching a query
    Search { query: String },
    /// The signed-in user's notifications
    Notifications,
    /// Update the signed-in user's name and bio
    EditProfile {
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
    /// Create an account and show its profile
    SignUp {
        username: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
    /// Walk through the social actions on the demo data
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log);

    let templates = TemplateRegistry::new(config.routes.clone());
    let settings = FeedSettings { page_size: config.feed.page_size, search_limit: config.feed.search_limit };

    let ctx = match config.store.backend {
        StoreBackend::Memory => open_memory(&cli.as_user, templates).await?,
        StoreBackend::PocketBase => open_pocketbase(&config, templates).await?,
    };
    tracing::info!(user = %ctx.session.user().username, backend = ?config.store.backend, "signed in");

    if let Command::Demo = cli.command {
        if config.store.backend != StoreBackend::Memory {
            bail!("the demo only runs against the memory store");
        }
        return run_demo(&ctx, settings).await;
    }

    let html = render(&ctx, settings, cli.command).await?;
    println!("{html}");
    Ok(())
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so page
/// output stays clean.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn render(ctx: &Context, settings: FeedSettings, command: Command) -> Result<String> {
    let pages = Pages::new(ctx).with_settings(settings);
    let html = match command {
        Command::Home => {
            let feed = FeedAssembler::new(ctx).with_settings(settings).assemble(FeedContext::Home).await;
            feed.html()?
        }
        Command::Post { id } => pages.post_detail(&id).await.html(&ctx.templates)?,
        Command::Publish { text, community } => {
            let mut composer = PostComposer::new(ctx);
            composer.set_text(&text);
            composer.set_community(community);
            let post = composer.submit().await.map_err(|err| anyhow!(err.user_message()))?;
            PostCardBuilder::new(ctx).build_fresh(&post).html()?
        }
        Command::Profile { username } => pages.profile(&username).await.html(&ctx.templates)?,
        Command::Community { id } => pages.community(&id).await.html(&ctx.templates)?,
        Command::Communities => pages.communities().await.html(&ctx.templates)?,
        Command::Search { query } => {
            let search = SearchService::new(ctx).with_settings(settings);
            let results = search.search(&query).await;
            let (users, communities, posts) = search.html(&results)?;
            [users, communities, posts].join("\n")
        }
        Command::Notifications => NotificationCenter::load(ctx).await.html()?,
        Command::EditProfile { full_name, bio } => {
            let user = AccountSettings::new(ctx)
                .update_profile(&full_name, &bio)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            pages.profile(&user.username).await.html(&ctx.templates)?
        }
        Command::SignUp { username, full_name, email, password, bio } => {
            let form = SignUpForm {
                username,
                full_name,
                email,
                password_confirm: password.clone(),
                password,
                bio,
            };
            let user = Registration::new(ctx.store.clone())
                .register(&form)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            pages.profile(&user.username).await.html(&ctx.templates)?
        }
        Command::Demo => bail!("the demo is not a page"),
    };
    Ok(html)
}

#[cfg(feature = "store-memory")]
async fn open_memory(as_user: &str, templates: TemplateRegistry) -> Result<Context> {
    use vee_core::{records, Filter, User};

    let store = Arc::new(demo::seeded_store()?);
    let user = records::<User>(store.as_ref())
        .first_matching(&Filter::eq("username", as_user))
        .await
        .with_context(|| format!("no demo user @{as_user}"))?;
    Ok(Context::new(store, Session::new(user), templates))
}

#[cfg(not(feature = "store-memory"))]
async fn open_memory(_as_user: &str, _templates: TemplateRegistry) -> Result<Context> {
    bail!("the memory store is not compiled in (feature `store-memory`)")
}

#[cfg(feature = "store-pocketbase")]
async fn open_pocketbase(config: &AppConfig, templates: TemplateRegistry) -> Result<Context> {
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use vee_store_pocketbase::PocketBaseStore;

    let (Some(identity), Some(password)) = (&config.store.identity, &config.store.password) else {
        bail!("store.identity and store.password are required to sign in");
    };
    let store = PocketBaseStore::new(&config.store.url, Duration::from_secs(config.store.timeout_secs))?;
    let user = store
        .authenticate(identity, password.expose_secret())
        .await
        .with_context(|| format!("failed to sign in to {}", config.store.url))?;
    Ok(Context::new(Arc::new(store), Session::new(user), templates))
}

#[cfg(not(feature = "store-pocketbase"))]
async fn open_pocketbase(_config: &AppConfig, _templates: TemplateRegistry) -> Result<Context> {
    bail!("the pocketbase store is not compiled in (feature `store-pocketbase`)")
}

#[cfg(feature = "store-memory")]
async fn run_demo(ctx: &Context, settings: FeedSettings) -> Result<()> {
    demo::walkthrough(ctx, settings).await
}

#[cfg(not(feature = "store-memory"))]
async fn run_demo(_ctx: &Context, _settings: FeedSettings) -> Result<()> {
    bail!("the demo needs the memory store (feature `store-memory`)")
}
