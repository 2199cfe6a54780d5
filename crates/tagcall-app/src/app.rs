use std::sync::Arc;

use anyhow::{Context, Result};
use tagcall_call::{CallController, UserAction};
use tagcall_core::{ClientConfig, UserId};
use tagcall_signaling::RelayClient;
use tagcall_webrtc::WebRtcBackend;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::terminal::{parse_line, Input, TerminalView, HELP};

/// Path of a JSON [`ClientConfig`] file.
pub const CONFIG_ENV: &str = "TAGCALL_CONFIG";
/// Overrides `signalingUrl` from the file or the default.
pub const SIGNALING_URL_ENV: &str = "TAGCALL_SIGNALING_URL";

const ACTION_CAPACITY: usize = 32;

/// Terminal client loop
///
/// # Flow
/// 1. Load config (`TAGCALL_CONFIG`, `TAGCALL_SIGNALING_URL`)
/// 2. Generate this session's user id
/// 3. Connect the relay and build the WebRTC backend
/// 4. Spawn the call controller
/// 5. Translate stdin lines into user actions until `/quit` or EOF
pub async fn run() -> Result<()> {
    let config = load_config()?;
    let user_id = UserId::generate();
    info!("Session identity: {}", user_id);

    let relay = RelayClient::connect(&config.signaling_url)
        .await
        .with_context(|| format!("connecting to relay {}", config.signaling_url))?;
    let (relay_sender, inbound) = relay.start();

    let backend = Arc::new(WebRtcBackend::new(&config).context("initialising WebRTC backend")?);
    let view = Arc::new(TerminalView::new(config.chat_history));

    let controller = CallController::new(user_id, &config, backend, relay_sender, view.clone());
    let (actions, actions_rx) = mpsc::channel(ACTION_CAPACITY);
    let controller_task = tokio::spawn(controller.run(inbound, actions_rx));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let action = match parse_line(&line) {
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Unknown(name) => {
                println!("Unknown command /{name}. Type /help.");
                continue;
            }
            Input::Empty => continue,
            Input::Quit => break,
            input => match user_action(input) {
                Some(action) => action,
                None => continue,
            },
        };
        if actions.send(action).await.is_err() {
            warn!("Call controller stopped; exiting");
            break;
        }
    }

    if view.call_active() {
        println!("* hanging up");
    }
    let _ = actions.send(UserAction::Shutdown).await;
    controller_task.await.context("call controller task")?;
    Ok(())
}

/// Maps call and chat input to the controller action.
fn user_action(input: Input) -> Option<UserAction> {
    match input {
        // Start-only: a second /call while the first is in flight must not hang it up.
        Input::Call(tag) => Some(UserAction::StartCall { tag }),
        Input::Hangup => Some(UserAction::Hangup),
        Input::Message(text) => Some(UserAction::SendMessage { text }),
        Input::Help | Input::Quit | Input::Unknown(_) | Input::Empty => None,
    }
}

fn load_config() -> Result<ClientConfig> {
    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            info!("Loading config from {}", path);
            ClientConfig::load(&path)?
        }
        Err(_) => ClientConfig::default(),
    };
    let config = match std::env::var(SIGNALING_URL_ENV) {
        Ok(url) => config.with_signaling_url(url)?,
        Err(_) => config,
    };
    info!(
        "Relay: {}  |  ICE servers: {}  |  early candidates: {:?}",
        config.signaling_url,
        config.ice_servers.len(),
        config.candidate_policy
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_command_never_toggles() {
        assert_eq!(user_action(parse_line("/call chess")), Some(UserAction::StartCall { tag: "chess".into() }));
        assert_eq!(user_action(parse_line("/hangup")), Some(UserAction::Hangup));
        assert_eq!(user_action(parse_line("hi")), Some(UserAction::SendMessage { text: "hi".into() }));
        assert_eq!(user_action(parse_line("/help")), None);
    }
}
