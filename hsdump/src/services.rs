use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::api::helpscout::{http_client, HelpScoutClient};
use crate::auth::Authenticator;
use crate::cli::{Args, Commands, FilterArgs};
use crate::fetcher::{list_all_tags, ConversationPager};
use crate::settings::{self, ClientConfig};
use crate::store::{ConversationStore, TokenStore};
use crate::summary;

const TAG_SUFFIX_MAX_CHARS: usize = 30;
const FILTER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub async fn run(args: Args) -> Result<()> {
    match &args.command {
        Commands::Summarize { dir } => summarize(dir),
        Commands::Fetch { filter, output_dir } => {
            let mut client = connect(&client_config(&args)?).await?;
            fetch(&mut client, filter, output_dir).await
        }
        Commands::Export {
            filter,
            exports_dir,
        } => {
            let mut client = connect(&client_config(&args)?).await?;
            export(&mut client, filter, exports_dir).await?;
            Ok(())
        }
        Commands::ListTags => {
            let mut client = connect(&client_config(&args)?).await?;
            print_tags(&mut client).await
        }
        Commands::Token => {
            let client = connect(&client_config(&args)?).await?;
            println!("{}", client.access_token());
            Ok(())
        }
    }
}

fn client_config(args: &Args) -> Result<ClientConfig> {
    let settings = settings::load_settings()?;
    Ok(ClientConfig::resolve(args, settings)?)
}

pub async fn connect(config: &ClientConfig) -> Result<HelpScoutClient> {
    let http = http_client()?;
    let auth = Authenticator::new(
        http.clone(),
        config.auth_url.clone(),
        config.credentials.clone(),
        TokenStore::new(&config.token_file),
    );

    let client =
        HelpScoutClient::connect(http, config.api_url.clone(), auth, config.retry.clone()).await?;

    Ok(client)
}

fn print_filter(action: &str, filter: &FilterArgs) {
    println!("{} conversations:", action);
    println!("  From: {}", filter.created_from.format(FILTER_DATE_FORMAT));
    if let Some(created_to) = filter.created_to {
        println!("  To: {}", created_to.format(FILTER_DATE_FORMAT));
    }
    if !filter.tags.is_empty() {
        println!("  Tags: {}", filter.tags.join(", "));
    }
    println!("  Status: {}", filter.status);
    println!();
}

fn confirm_download() -> Result<bool> {
    let proceed = dialoguer::Confirm::new()
        .with_prompt("Do you want to proceed with downloading?")
        .default(true)
        .interact()?;
    Ok(proceed)
}

/// Saves every matching conversation, returning how many were written.
/// Ctrl-C stops between records and keeps what was already saved.
async fn download(
    client: &mut HelpScoutClient,
    filter: &FilterArgs,
    store: &ConversationStore,
) -> Result<usize> {
    let mut pager = ConversationPager::new(client, filter.query_filter());

    let total = pager.total_elements().await?;
    println!("Found {} matching conversations", total);
    println!("Using query: {}", pager.filter().search_query());

    if total == 0 {
        return Ok(0);
    }

    if !filter.yes && !confirm_download()? {
        println!("Download cancelled.");
        return Ok(0);
    }

    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut saved = 0;
    loop {
        let next = tokio::select! {
            next = pager.next() => next?,
            _ = &mut ctrl_c => {
                progress.abandon();
                warn!("interrupted, stopping after {} conversations", saved);
                break;
            }
        };

        let Some(conversation) = next else {
            break;
        };

        store.save(&conversation)?;
        saved += 1;
        progress.set_message(format!("conversation {}", conversation.id));
        progress.inc(1);
    }

    progress.finish_and_clear();

    Ok(saved)
}

async fn fetch(client: &mut HelpScoutClient, filter: &FilterArgs, output_dir: &Path) -> Result<()> {
    print_filter("Fetching", filter);

    let store = ConversationStore::create(output_dir)?;
    let saved = download(client, filter, &store).await?;

    println!(
        "\nSuccessfully saved {} conversations to {}/",
        saved,
        output_dir.display()
    );

    Ok(())
}

/// `<timestamp>` or `<timestamp>_<tags>` where tags are joined by `_`, spaces
/// become `-` and the suffix is cut to 30 characters.
pub fn export_dir_name(now: DateTime<Local>, tags: &[String]) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S").to_string();
    let suffix: String = tags
        .join("_")
        .replace(' ', "-")
        .chars()
        .take(TAG_SUFFIX_MAX_CHARS)
        .collect();

    if suffix.is_empty() {
        timestamp
    } else {
        format!("{}_{}", timestamp, suffix)
    }
}

/// Downloads into a fresh `<exports_dir>/<timestamp>[_tags]` directory and
/// summarizes it there. Returns the directory, which holds no `summary.csv`
/// when nothing matched.
pub async fn export(
    client: &mut HelpScoutClient,
    filter: &FilterArgs,
    exports_dir: &Path,
) -> Result<PathBuf> {
    let output_dir = exports_dir.join(export_dir_name(Local::now(), &filter.tags));

    print_filter("Exporting", filter);

    let store = ConversationStore::create(&output_dir)?;
    let saved = download(client, filter, &store).await?;

    if saved == 0 {
        println!("No conversations found matching your criteria.");
        return Ok(output_dir);
    }

    println!("\nSaved {} conversations to {}/", saved, output_dir.display());

    let output = summary::build(&output_dir)
        .with_context(|| format!("Failed to summarize {}", output_dir.display()))?;

    println!(
        "Created summary CSV with {} conversations: {}",
        output.rows,
        output.path.display()
    );
    println!(
        "\nAnalysis complete! You can find all files in the {}/ directory.",
        output_dir.display()
    );

    Ok(output_dir)
}

fn summarize(dir: &Path) -> Result<()> {
    let output =
        summary::build(dir).with_context(|| format!("Failed to summarize {}", dir.display()))?;

    println!(
        "Created summary CSV with {} conversations: {}",
        output.rows,
        output.path.display()
    );

    Ok(())
}

async fn print_tags(client: &mut HelpScoutClient) -> Result<()> {
    let mut tags = list_all_tags(client).await?;
    tags.sort_by_key(|tag| tag.name.to_lowercase());

    info!("found {} tags", tags.len());

    let mut table = Table::new();
    table.set_header(vec!["NAME", "SLUG", "COUNT"]);
    for tag in tags {
        table.add_row(vec![tag.name, tag.slug, tag.ticket_count.to_string()]);
    }
    println!("{table}");

    Ok(())
}
