//! crackd CLI: upload images for captioning and vote on the caption feed.
//!
//! Configuration comes from CRACKD_* environment variables (a `.env` file is read too).
//! Set CRACKD_ACCESS_TOKEN to act as a signed-in user.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crackd_api_client::ApiClient;
use crackd_cli::{
    content_type_for_path, init_tracing, parse_feed_input, parse_vote, render_snapshot, FeedInput,
};
use crackd_core::models::{FeedStatus, SelectedFile};
use crackd_core::{AuthTokenProvider, ClientConfig, SessionToken, VoteApi, VoteError};
use crackd_session::{FeedAdvancementEngine, Submission, UploadPipelineController};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "crackd", about = "Caption an image or vote on captions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and print the generated captions
    Upload {
        /// Path to the image
        file: PathBuf,
        /// Content type, when the extension does not tell
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Step through the caption feed (h/left reject, l/right approve, j/down skip, q quit)
    Feed,
    /// Vote on a single caption
    Vote {
        /// Caption UUID
        card_id: Uuid,
        /// up or down
        value: String,
    },
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let client = Arc::new(ApiClient::from_config(&config)?);
    let auth = Arc::new(SessionToken::new(config.access_token.clone()));

    match cli.command {
        Commands::Upload { file, content_type } => {
            upload(&config, client, auth, file, content_type).await
        }
        Commands::Feed => feed(&config, client, auth).await,
        Commands::Vote { card_id, value } => vote(&config, &client, &auth, card_id, &value).await,
    }
}

async fn upload(
    config: &ClientConfig,
    client: Arc<ApiClient>,
    auth: Arc<SessionToken>,
    file: PathBuf,
    content_type: Option<String>,
) -> Result<()> {
    let content_type = match content_type {
        Some(ct) => ct,
        None => content_type_for_path(&file)
            .map(str::to_string)
            .with_context(|| {
                format!(
                    "Cannot tell the type of {}; pass --content-type",
                    file.display()
                )
            })?,
    };
    let data = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let controller = UploadPipelineController::new(auth, client, config.upload.clone());
    controller.select_file(SelectedFile::new(name, content_type, data))?;

    let mut rx = controller.subscribe();
    let progress = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let stage = rx.borrow_and_update().stage;
            if let (true, Some(label)) = (stage.is_busy(), stage.label()) {
                eprintln!("{}", label);
            }
        }
    });

    let outcome = controller.submit().await;
    progress.abort();

    match outcome {
        Submission::Completed(captions) => {
            eprintln!("Done!");
            print_json(&captions)
        }
        Submission::Failed(err) => Err(err.into()),
        Submission::Ignored => Err(anyhow::anyhow!("Upload was not started")),
    }
}

async fn feed(
    config: &ClientConfig,
    client: Arc<ApiClient>,
    auth: Arc<SessionToken>,
) -> Result<()> {
    let engine = FeedAdvancementEngine::new(auth, client.clone(), client, config.feed.clone());
    let count = engine.load_session().await?;
    tracing::info!(cards = count, "Feed ready");

    let mut rx = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render_snapshot(&engine.snapshot()));

    while engine.status() == FeedStatus::Active {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let direction = match parse_feed_input(&line) {
            Some(FeedInput::Swipe(direction)) => direction,
            Some(FeedInput::Quit) => break,
            None => {
                eprintln!("Keys: h/left reject, l/right approve, j/down skip, q quit");
                continue;
            }
        };

        let action = engine.handle_key(direction);
        tracing::debug!(?action, "Input handled");
        let _ = rx.wait_for(|state| state.leaving().is_none()).await;
        println!("{}", render_snapshot(&engine.snapshot()));
    }

    // Let outstanding votes land before the process exits.
    engine.settle().await;
    if let Some(error) = engine.snapshot().transient_error {
        eprintln!("{}", error);
    }
    Ok(())
}

async fn vote(
    config: &ClientConfig,
    client: &ApiClient,
    auth: &SessionToken,
    card_id: Uuid,
    value: &str,
) -> Result<()> {
    let value = parse_vote(value)?;
    let token = auth
        .access_token()
        .await
        .ok_or(VoteError::AuthRequired)?;

    let status = match client
        .submit_vote(&token, card_id, value)
        .await
        .map_err(|e| e.classify(&config.feed.conflict_markers))
    {
        Ok(()) => "saved",
        Err(VoteError::Conflict { .. }) => "already_recorded",
        Err(err) => return Err(err.into()),
    };

    print_json(&serde_json::json!({
        "card_id": card_id,
        "value": value,
        "status": status,
    }))
}
