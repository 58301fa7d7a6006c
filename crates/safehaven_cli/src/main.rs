//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire configuration, logging, the local store and the remote client.
//! - Print a short, deterministic summary of the data layer and optionally
//!   stream one chat reply.
//!
//! Usage: `safehaven_cli [posts | chat <message>]`

use log::warn;
use safehaven_core::chat::conversation::Conversation;
use safehaven_core::{
    init_logging, AppConfig, ChatSession, DataStore, GeminiBackend, HttpRemoteApi,
    KeyValueStore, LogLevel, MemoryKvStore, SqliteKvStore,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal outside development.
    let _ = dotenv::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = config
        .log_level
        .clone()
        .unwrap_or_else(|| LogLevel::build_default().as_str().to_string());
    if let Err(err) = init_logging(&level, &config.log_dir()) {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("posts") => posts_summary(&config).await,
        Some("chat") => chat_once(&config, &args[1..].join(" ")).await,
        Some(other) => {
            eprintln!("unknown command `{other}`; expected `posts` or `chat <message>`");
            ExitCode::FAILURE
        }
    }
}

async fn posts_summary(config: &AppConfig) -> ExitCode {
    let remote = match HttpRemoteApi::new(&config.api_base_url, config.http_timeout()) {
        Ok(remote) => remote,
        Err(err) => {
            eprintln!("remote client error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store = open_store(config);
    let data = DataStore::new(remote, store);

    println!("safehaven_core version={}", safehaven_core::core_version());
    println!("remote healthy={}", data.check_health().await);
    let posts = data.get_posts_traced().await;
    println!("posts source={}", posts.source_label());
    for post in posts.into_inner() {
        println!(
            "- [{}] {} likes={} comments={}",
            post.id,
            post.author,
            post.likes,
            post.comments.len()
        );
    }
    ExitCode::SUCCESS
}

fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    match SqliteKvStore::open(config.db_path()) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!("event=store_open module=cli status=fallback error={err}");
            eprintln!("local store unavailable, using memory: {err}");
            Arc::new(MemoryKvStore::new())
        }
    }
}

async fn chat_once(config: &AppConfig, message: &str) -> ExitCode {
    let chat_config = config.chat_config();
    let session = GeminiBackend::new(&chat_config)
        .map(|backend| ChatSession::new(backend, &chat_config));
    let mut conversation = Conversation::new(session);

    let mut printed = 0;
    let sent = conversation
        .send(message, |reply| {
            print!("{}", &reply[printed..]);
            let _ = std::io::stdout().flush();
            printed = reply.len();
        })
        .await;
    if !sent {
        eprintln!("nothing to send");
        return ExitCode::FAILURE;
    }
    println!();

    match conversation.messages().last() {
        Some(last) if last.is_error => {
            eprintln!("{}", last.text);
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
