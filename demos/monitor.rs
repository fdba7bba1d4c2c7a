//! Live drone monitor.
//!
//! Demonstrates:
//! - Building a client from environment configuration
//! - Attaching a `DroneFeed` to every category of one drone
//! - Watching lifecycle events while messages stream in
//! - Sending an operator command with `--ping`
//!
//! Environment:
//!   STOMP_URL        default ws://localhost:15674/ws
//!   STOMP_LOGIN      default guest
//!   STOMP_PASSCODE   default guest
//!   STOMP_VHOST      default /
//!   DRONE_ID         default D-01
//!
//! Usage:
//!   cargo run --example monitor
//!   cargo run --example monitor -- --debug
//!   cargo run --example monitor -- --ping

// ============================================================================
// Imports
// ============================================================================

use std::env;

use dronecommand_telemetry::{
    ClientEvent, DroneChannels, DroneFeed, FeedMessage, Result, StompClient,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    ping: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            ping: args.iter().any(|a| a == "--ping"),
        }
    }
}

fn var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "dronecommand_telemetry=debug"
    } else {
        "dronecommand_telemetry=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let drone_id = var("DRONE_ID", "D-01");
    println!("=== Drone monitor: {drone_id} ===\n");

    let client = StompClient::builder()
        .endpoint(var("STOMP_URL", "ws://localhost:15674/ws"))
        .credentials(var("STOMP_LOGIN", "guest"), var("STOMP_PASSCODE", "guest"))
        .virtual_host(var("STOMP_VHOST", "/"))
        .build()?;

    let (feed, mut messages) = DroneFeed::attach(&client, DroneChannels::for_drone(&drone_id));
    let mut events = client.events();
    client.connect();

    println!("Press Ctrl+C to exit...\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            Some(message) = messages.recv() => print_message(&message),

            event = events.recv() => match event {
                Ok(ClientEvent::Connected(info)) => {
                    println!("[connected] version={:?} server={:?}", info.version, info.server);
                    if args.ping {
                        feed.send_command("ping", &json!({ "source": "monitor" }))?;
                    }
                }
                Ok(ClientEvent::Disconnected) => println!("[disconnected] reconnecting..."),
                Ok(ClientEvent::BrokerError { message, details }) => {
                    println!("[broker error] {message}: {details}");
                }
                Ok(ClientEvent::TransportError { message }) => {
                    println!("[transport error] {message}");
                }
                Err(RecvError::Lagged(n)) => println!("[events] skipped {n}"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.disconnect();
    feed.detach();
    println!("\nBye.");
    Ok(())
}

fn print_message(message: &FeedMessage) {
    let payload = &message.payload;
    match message.category.as_str() {
        "telemetry" => println!(
            "[telemetry] battery={} altitude={} speed={}",
            payload["battery"], payload["altitude"], payload["speed"]
        ),
        "video" => println!("[video] frame ({} bytes)", payload.to_string().len()),
        category => println!("[{category}] {payload}"),
    }
}
