// src/main.rs

use std::{process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use pixello_core::{
    AppError, AppState, HttpApi, SocialApi,
    config::Config,
    controllers::{
        auth,
        connection::SendOutcome,
        feed::{FeedSnapshot, FeedStore},
        interaction::{CommentOutcome, LikeOutcome},
    },
    models::{
        connection::{ConnectionRequest, Relation},
        post::{Post, PostId},
    },
    notice::{NoticeBoard, NoticeLevel},
    routes,
    utils::session_store::SessionStore,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pixello")]
#[command(version, about = "Command-line client for the Pixello social network")]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long, env = "PIXELLO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show a page of the feed
    Feed {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Publish a post
    Post {
        content: String,
        #[arg(long)]
        video: Option<String>,
    },
    /// Edit one of your posts
    Edit {
        id: PostId,
        content: String,
        #[arg(long)]
        video: Option<String>,
        /// Feed page the post is on
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Delete one of your posts
    Delete {
        id: PostId,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Like or unlike a post
    Like {
        post: PostId,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the comments of a post
    Comments {
        post: PostId,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Comment on a post
    Comment {
        post: PostId,
        text: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show incoming, outgoing and accepted connection requests
    Requests,
    /// Send a connection request to a user
    Connect { user: i64 },
    /// Accept an incoming connection request
    Accept { id: i64 },
    /// Decline an incoming connection request
    Reject { id: i64 },
    /// Withdraw a connection request you sent
    Cancel { id: i64 },
    /// People you may know
    Suggestions,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(&config);

    let notices = NoticeBoard::new();
    let result = run(cli.command, &config, &notices).await;

    let mut shown_error = false;
    for notice in notices.pending() {
        match notice.level {
            NoticeLevel::Info => println!("{}", notice.message),
            NoticeLevel::Error => {
                shown_error = true;
                eprintln!("error: {}", notice.message);
            }
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            if !shown_error {
                eprintln!("error: {}", e.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs to stderr and to a daily file under `logs/`.
/// Keep the guard alive until exit or buffered file lines are lost.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "pixello.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

async fn run(command: Command, config: &Config, notices: &NoticeBoard) -> Result<(), AppError> {
    let api: Arc<dyn SocialApi> = Arc::new(HttpApi::new(config)?);
    let store = SessionStore::new(&config.session_file);

    match command {
        Command::Login { username, password } => {
            let session = auth::login(api.as_ref(), &store, &username, &password).await?;
            println!("Logged in as {}", session.current_user.display_name());
            Ok(())
        }
        Command::Logout => {
            auth::logout(api.as_ref(), &store).await?;
            println!("Logged out.");
            Ok(())
        }
        command => {
            let session = auth::restore(api.as_ref(), &store)
                .await?
                .ok_or_else(|| AppError::AuthError("Not logged in".to_string()))?;
            let state = AppState {
                api,
                session,
                notices: notices.clone(),
                config: config.clone(),
            };
            run_authenticated(command, &state).await
        }
    }
}

async fn run_authenticated(command: Command, state: &AppState) -> Result<(), AppError> {
    let me = state.session.user_id();

    match command {
        Command::Login { .. } | Command::Logout => Ok(()),
        Command::Feed { page } => {
            let feed = state.feed_store();
            feed.load_page(page).await?;
            let snapshot = feed.snapshot().await;
            if snapshot.posts.is_empty() {
                println!("No posts yet.");
            }
            for post in &snapshot.posts {
                print_post(post, me);
            }
            println!("{}", feed_footer(&snapshot));
            Ok(())
        }
        Command::Post { content, video } => {
            let post = state
                .feed_store()
                .create_post(Some(&content), video.as_deref())
                .await?;
            println!("Posted #{}", post.id);
            Ok(())
        }
        Command::Edit {
            id,
            content,
            video,
            page,
        } => {
            let feed = state.feed_store();
            feed.load_page(page).await?;
            let post = feed.edit_post(id, Some(&content), video.as_deref()).await?;
            print_post(&post, me);
            Ok(())
        }
        Command::Delete { id, page } => {
            let feed = state.feed_store();
            feed.load_page(page).await?;
            feed.delete_post(id).await?;
            println!("Deleted post #{}", id);
            Ok(())
        }
        Command::Like { post, page } => {
            let feed = state.feed_store();
            let post = find_post(&feed, post, page).await?;
            let interactions = state.interactions(feed);
            interactions.mount(&post).await?;
            let outcome = interactions.toggle_like(post.id).await?;
            let likes = interactions
                .state(post.id)
                .await
                .map_or(post.like_count, |s| s.like_count);
            let verb = match outcome {
                LikeOutcome::Liked => "Liked",
                LikeOutcome::Unliked => "Unliked",
                LikeOutcome::AlreadyLiked => "Already liked",
                LikeOutcome::AlreadyUnliked => "Already not liked",
            };
            println!("{} post #{} ({} likes)", verb, post.id, likes);
            Ok(())
        }
        Command::Comments { post, page } => {
            let feed = state.feed_store();
            let post = find_post(&feed, post, page).await?;
            let interactions = state.interactions(feed);
            interactions.mount(&post).await?;
            let comments = interactions.load_comments(post.id).await?;
            if comments.is_empty() {
                println!("No comments on post #{}.", post.id);
            }
            for comment in comments {
                println!("#{} {}: {}", comment.id, comment.author.display_name(), comment.text);
            }
            Ok(())
        }
        Command::Comment { post, text, page } => {
            let feed = state.feed_store();
            let post = find_post(&feed, post, page).await?;
            let interactions = state.interactions(feed);
            interactions.mount(&post).await?;
            match interactions.add_comment(post.id, &text).await? {
                CommentOutcome::Created(comment) => {
                    println!("Commented #{} on post #{}", comment.id, post.id)
                }
                CommentOutcome::AlreadyCommented(comment) => println!(
                    "You already commented on post #{}: {}",
                    post.id, comment.text
                ),
            }
            Ok(())
        }
        Command::Requests => {
            let buckets = state.connections().refresh().await?;
            print_requests("Incoming", &buckets.incoming, me);
            print_requests("Sent", &buckets.outgoing, me);
            print_requests("Connections", &buckets.accepted, me);
            Ok(())
        }
        Command::Connect { user } => {
            let connections = state.connections();
            connections.refresh().await?;
            if let SendOutcome::AlreadyActive(_) = connections.send_request(user).await? {
                println!("A request with user {} already exists.", user);
            }
            Ok(())
        }
        Command::Accept { id } => {
            let connections = state.connections();
            connections.refresh().await?;
            connections.accept(id).await?;
            Ok(())
        }
        Command::Reject { id } => {
            let connections = state.connections();
            connections.refresh().await?;
            connections.reject(id).await?;
            Ok(())
        }
        Command::Cancel { id } => {
            let connections = state.connections();
            connections.refresh().await?;
            connections.cancel(id).await?;
            println!("Request #{} withdrawn.", id);
            Ok(())
        }
        Command::Suggestions => {
            let connections = state.connections();
            connections.refresh().await?;
            for suggestion in connections.suggestions().await? {
                let tag = match suggestion.relation {
                    Relation::NotConnected => "",
                    Relation::RequestSent => " (request sent)",
                    Relation::RequestReceived => " (wants to connect)",
                    Relation::Connected => " (connected)",
                };
                let user = &suggestion.user;
                match user.headline.as_deref() {
                    Some(headline) => {
                        println!("{} {}{} - {}", user.id, user.display_name(), tag, headline)
                    }
                    None => println!("{} {}{}", user.id, user.display_name(), tag),
                }
            }
            Ok(())
        }
    }
}

/// Loads `page` and returns the post with `id` from it.
async fn find_post(feed: &Arc<FeedStore>, id: PostId, page: u32) -> Result<Post, AppError> {
    feed.load_page(page).await?;
    feed.post(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Post {} is not on page {}", id, page)))
}

/// Page position plus the `--page` values the server's links point to.
fn feed_footer(snapshot: &FeedSnapshot) -> String {
    let mut footer = format!("page {}", snapshot.page);
    if let Some(total) = snapshot.total {
        footer.push_str(&format!(" of {} posts", total));
    }
    if let Some(newer) = snapshot.previous.as_deref().and_then(routes::page_from_link) {
        footer.push_str(&format!(" | --page {} for newer", newer));
    }
    if let Some(older) = snapshot.next.as_deref().and_then(routes::page_from_link) {
        footer.push_str(&format!(" | --page {} for older", older));
    }
    footer
}

fn print_post(post: &Post, me: i64) {
    let owner = if post.is_owned_by(me) { " (you)" } else { "" };
    println!(
        "#{} {}{} | {} likes | {} comments",
        post.id,
        post.author.display_name(),
        owner,
        post.like_count,
        post.comment_count
    );
    if let Some(content) = post.content.as_deref() {
        println!("  {}", content);
    }
    if let Some(embed) = post.embed_url() {
        println!("  video: {}", embed);
    } else if let Some(video) = post.video_url.as_deref() {
        println!("  video: {}", video);
    }
}

fn print_requests(title: &str, records: &[ConnectionRequest], me: i64) {
    println!("{} ({})", title, records.len());
    for record in records {
        println!(
            "  #{} {}",
            record.id,
            record.counterpart(me).display_name()
        );
    }
}
