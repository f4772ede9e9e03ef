// Minimal terminal front end for the relay client. All conversation state
// lives in the library; this loop only reads lines and prints bubbles.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use fraudguard::prompts::{example_by_key, EXAMPLE_PROMPTS};
use fraudguard::{
    image_mime_from_path, ConversationController, HttpDispatcher, Message, MessageContent,
    RelayConfig, Role, SubmitOutcome, SubmitRejection,
};

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "analyzer",
    };
    match &message.content {
        MessageContent::Text(text) => println!("[{}] {}", who, text),
        MessageContent::Image(meta) => {
            println!("[{}] (image) {} - {}", who, meta.file_name, meta.size_display())
        }
    }
}

async fn attach_from_path(controller: &ConversationController, raw: &str) {
    let path = Path::new(raw.trim());
    let Some(mime) = image_mime_from_path(path) else {
        println!("Please pick an image file (png, jpg, gif or webp).");
        return;
    };
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            println!("Could not read {}: {}", path.display(), e);
            return;
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    match controller.attach(name, bytes, mime).await {
        Ok(staged) => println!(
            "Attached {} ({} bytes). The next send will upload the image.",
            staged.file_name,
            staged.bytes.len()
        ),
        Err(e) => println!("{}", e),
    }
}

async fn submit_and_render(controller: &ConversationController) {
    println!("analyzing...");
    match controller.submit().await {
        SubmitOutcome::Completed { .. } => {
            let transcript = controller.transcript().await;
            // The user bubble and its resolved reply are the last two.
            for message in transcript.iter().rev().take(2).rev() {
                print_message(message);
            }
        }
        SubmitOutcome::Rejected(SubmitRejection::NothingToSend) => {
            println!("Nothing to send: type a message or attach an image.")
        }
        SubmitOutcome::Rejected(SubmitRejection::AlreadyInFlight) => {
            println!("Still waiting on the previous reply.")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = RelayConfig::from_env().context("Failed to load relay configuration")?;
    log::info!(
        "Relay configured: text={} image={} timeout={:?}",
        config.text_endpoint,
        config.image_endpoint,
        config.timeout
    );

    let dispatcher = Arc::new(HttpDispatcher::new(config.clone()));
    let controller = ConversationController::new(dispatcher, &config);

    for message in &controller.transcript().await {
        print_message(message);
    }
    println!();
    println!("Commands: /attach <path>, /clear, /examples, /example <key>, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim().to_string();
        match line.split_once(' ').map_or((line.as_str(), ""), |(a, b)| (a, b)) {
            ("/quit", _) => break,
            ("/clear", _) => {
                controller.clear_attachment().await;
                println!("Attachment removed.");
            }
            ("/attach", rest) if !rest.trim().is_empty() => {
                attach_from_path(&controller, rest).await;
            }
            ("/examples", _) => {
                for prompt in EXAMPLE_PROMPTS {
                    println!("  {:<10} {}", prompt.key, prompt.label);
                }
            }
            ("/example", key) => match example_by_key(key.trim()) {
                Some(prompt) => {
                    controller.set_draft(prompt.text).await;
                    submit_and_render(&controller).await;
                }
                None => println!("Unknown example key; try /examples."),
            },
            _ if line.is_empty() => {}
            _ if line.starts_with('/') => println!("Unknown command."),
            _ => {
                controller.set_draft(line).await;
                submit_and_render(&controller).await;
            }
        }
    }

    controller.teardown().await;
    Ok(())
}
