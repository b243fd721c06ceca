//! Minimal echo bot built on the RTM bridge.
//!
//! Starts the bridge with a token from the `RTM_TOKEN` environment variable
//! and echoes every received chat message back to its channel.

use rtm_bridge::{Message, RtmClient, RtmOptions, TYPE_MESSAGE};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let token = std::env::var("RTM_TOKEN")?;

    println!("Connecting...");
    let client = RtmClient::start(&token, RtmOptions::new())?;
    println!("Connected, waiting for messages");

    loop {
        // Surface background failures without stopping the bot.
        while let Ok(err) = client.error_rx.try_recv() {
            eprintln!("bridge error: {}", err);
        }

        let message = client.read_message();
        if message.is_none() {
            std::thread::sleep(Duration::from_millis(100));
            continue;
        }

        if let (Some(text), Some(channel)) = (message.get_str("text"), message.get_str("channel")) {
            println!("Received: {}", text);
            let reply = Message::new(TYPE_MESSAGE)
                .with("channel", channel)
                .with("text", text);
            client.send_message(reply);
        }
    }
}
