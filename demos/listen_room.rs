//! Room listener example
//!
//! Prints every message posted to a Gitter room until interrupted.
//!
//! Run with: GITTER_TOKEN=... cargo run --example listen_room -- <room-id>

use anyhow::{bail, Context};
use gitter_http::{CloseReason, Event, GitterClient};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let token = std::env::var("GITTER_TOKEN").context("GITTER_TOKEN is not set")?;
    let Some(room_id) = std::env::args().nth(1) else {
        bail!("usage: listen_room <room-id>");
    };

    let client = GitterClient::new(token);
    let (session, mut events) = client.stream(&room_id)?;
    let closer = session.closer();

    tokio::spawn(session.listen());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            closer.close();
        }
    });

    println!("Listening to room {}", room_id);
    println!("==========================\n");

    while let Some(event) = events.next().await {
        match event {
            Event::MessageReceived(message) => {
                println!("[{}] {}: {}", message.sent, message.from_user.username, message.text);
            }
            Event::ConnectionClosed(CloseReason::RetriesExhausted) => {
                println!("\nGave up reconnecting");
            }
            Event::ConnectionClosed(CloseReason::Requested) => {
                println!("\nClosed");
            }
        }
    }

    Ok(())
}
