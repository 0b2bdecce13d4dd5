#![forbid(unsafe_code)]

//! `email-tracker-ctl`: command-line client for an `email-tracker` server.
//!
//! Submits tasks, reads the status counters, and can load a track-link
//! the way a mail client would.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "email-tracker-ctl",
    about = "Command-line client for the email-tracker server",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the server.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a tracking task and print its track-link.
    Submit {
        /// Address to notify when the email is opened.
        #[arg(long)]
        notify_to: String,
        /// Comment echoed back in the notification.
        #[arg(long, default_value = "")]
        comments: String,
        /// Claimed local send time (RFC 3339, e.g. `2024-03-01T09:30:00+08:00`).
        #[arg(long)]
        local_time: Option<String>,
    },

    /// Print task and notification counters.
    Status,

    /// Load the tracking pixel for a task, as a mail client would.
    Open {
        /// Task identifier.
        task_id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();
    let base = args.server.trim_end_matches('/').to_owned();

    let outcome = match args.command {
        Command::Submit {
            notify_to,
            comments,
            local_time,
        } => submit(&base, notify_to, comments, local_time).await,
        Command::Status => status(&base).await,
        Command::Open { task_id } => open(&base, &task_id).await,
    };

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        eprintln!("Is email-tracker running at '{base}'?");
        std::process::exit(1);
    }
}

type CtlResult = std::result::Result<(), Box<dyn std::error::Error>>;

async fn submit(
    base: &str,
    notify_to: String,
    comments: String,
    local_time: Option<String>,
) -> CtlResult {
    let mut request = serde_json::json!({ "notify_to": notify_to, "comments": comments });
    if let Some(time) = local_time {
        request["local_time"] = serde_json::Value::String(time);
    }

    let response = reqwest::Client::new()
        .post(format!("{base}/submit"))
        .json(&request)
        .send()
        .await?;
    let ok = response.status().is_success();
    let body: serde_json::Value = response.json().await?;

    if ok {
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        Ok(())
    } else {
        let message = body
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        Err(message.into())
    }
}

async fn status(base: &str) -> CtlResult {
    let body: serde_json::Value = reqwest::get(format!("{base}/status"))
        .await?
        .error_for_status()?
        .json()
        .await?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    Ok(())
}

async fn open(base: &str, task_id: &str) -> CtlResult {
    let response = reqwest::get(format!("{base}/t/{task_id}")).await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    println!("{status} ({} bytes)", bytes.len());
    Ok(())
}
