use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use ara_push_sender::config::Settings;
use ara_push_sender::notification::{batches, Dispatcher, Notification};
use ara_push_sender::telemetry;

#[derive(Debug, Parser)]
#[command(
    name = "ara-push-sender",
    about = "Print a demo push notification and optionally send it"
)]
struct Args {
    /// Registration ids to send the demo notification to.
    #[arg(long, num_args = 1..)]
    send: Vec<String>,

    /// Attempts per gateway request (0 makes a single attempt).
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

fn demo_notification() -> Notification {
    Notification::builder()
        .data_from_json(json!({
            "title": "Hello",
            "body": "Sent from ara-push-sender",
        }))
        .collapse_key("demo")
        .time_to_live(3600)
        .build()
}

/// The notification as the first gateway request will carry it.
fn first_request_preview(notification: &Notification, recipients: &[String]) -> Result<Notification> {
    let mut preview = notification.clone();
    let first = batches(recipients).next().unwrap_or_default();
    preview.set_recipients(first.to_vec())?;
    Ok(preview)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;

    // Initialize tracing
    telemetry::init_tracing(&settings.logging)?;
    tracing::info!(gateway = ?settings.gateway, "Configuration loaded");

    let recipients = if args.send.is_empty() {
        vec!["demo-registration-id".to_string()]
    } else {
        args.send.clone()
    };
    let notification = demo_notification();

    let preview = first_request_preview(&notification, &recipients)?;
    if preview.recipients().len() < recipients.len() {
        tracing::info!(
            shown = preview.recipients().len(),
            total = recipients.len(),
            "Preview shows the first request only"
        );
    }
    println!("{}", serde_json::to_string_pretty(&preview.to_json()?)?);
    if recipients.len() == 1 {
        println!("{}", preview.to_form()?);
    }

    if args.send.is_empty() {
        return Ok(());
    }

    let dispatcher = Dispatcher::new(settings.gateway)?;
    let outcome = dispatcher
        .send(&notification, recipients, args.retries)
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    tracing::info!(stats = ?dispatcher.stats(), "Send complete");

    Ok(())
}
