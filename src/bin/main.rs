use encrypted_orderbook_agent::{
    config::AgentConfig, dispatcher::Dispatcher, models::Command, session::SessionContext,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const PROMPT_HELP: &str = "Type a command (e.g. \"show orders\"), :toggle to flip encryption display, :show to print the cached orders, :quit to exit.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env()?;
    let dispatcher = Dispatcher::from_config(&config)?;

    let mut session = SessionContext::new(Uuid::new_v4().to_string());
    info!(session_id = %session.session_id, "Encrypted orderbook agent ready");
    println!("{}", PROMPT_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            ":quit" | ":q" => break,
            ":toggle" => {
                let visible = session.display.toggle_visibility();
                println!(
                    "Encryption display {}",
                    if visible { "on 🔒" } else { "off 🔓" }
                );
            }
            ":show" => {
                println!("{}", session.display.render_orders_text());
                println!("{}", session.display.render_fills_text());
            }
            text => {
                let command = Command::new(text, session.session_id.clone());
                let envelope = dispatcher.dispatch(&mut session, &command).await;
                println!("\n[{} · {:?}]\n{}\n", envelope.action_tag, envelope.status, envelope.text);
            }
        }
    }

    info!(session_id = %session.session_id, "Session ended");
    Ok(())
}
