//! One-shot Twitter search from the command line. Uses the same session
//! selection as the API and saves raw results under data/search_results/.
//!
//! Usage: cargo run --bin run_search -- "#rustlang" --limit 20

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use birdsift_common::Config;
use birdsift_parser::extract_tweet_info;
use xscrape_client::{select_provider, Credentials, SearchClient, SearchInput};

#[derive(Parser, Debug)]
struct Args {
    /// Search query, e.g. "#rustlang" or "from:rustlang".
    query: String,

    /// Search tab to pull from (Latest, Top, ...).
    #[arg(long, default_value = "Latest")]
    category: String,

    /// Stop after this many tweets.
    #[arg(long, default_value_t = 10)]
    limit: u32,

    /// Page fetch retries before giving up.
    #[arg(long, default_value_t = 7)]
    retries: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("run_search=info".parse()?)
                .add_directive("xscrape_client=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::api_from_env();

    let credentials = Credentials {
        email: config.twitter_email.clone(),
        username: config.twitter_username.clone(),
        password: config.twitter_password.clone(),
    };

    let provider = select_provider(Path::new(&config.session_dir), credentials);
    tracing::info!(source = provider.describe(), "acquiring search session");
    let session = provider.acquire()?;
    let client = SearchClient::new(session)?.with_save_dir("data/search_results");

    let input = SearchInput {
        category: args.category,
        query: args.query,
    };
    let batches = client.run(&[input], args.limit, args.retries)?;

    let total: usize = batches.iter().map(|entries| entries.len()).sum();
    println!("Successfully retrieved {total} results");

    // Cursor and ad entries have no legacy node; skip them in the printout.
    for entry in batches.iter().flatten() {
        if entry
            .pointer("/content/itemContent/tweet_results/result/legacy")
            .is_none()
        {
            continue;
        }
        let info = extract_tweet_info(entry);
        println!("Tweet ID: {}", info.tweet_id);
        let preview: String = info.text.chars().take(100).collect();
        println!("Text: {preview}...");
        println!("{}", "-".repeat(50));
    }

    Ok(())
}
