mod commands_file;
mod config;
mod logging;
mod plugins;

use core::time::Duration;
use std::{
    fs,
    io::IsTerminal as _,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use matrix_sdk::{
    Client, SessionMeta,
    authentication::{SessionTokens, matrix::MatrixSession},
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::{MessageType, OriginalSyncRoomMessageEvent, RoomMessageEventContent},
    },
};
use plugin_core::{TriggerSource as _, truncate};
use router::{Incoming, Router, RouterConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use triggers::TriggerStore;

use crate::{commands_file::JsonFileSource, config::load_config, logging::init_tracing};

#[derive(Parser, Debug)]
#[command(
    name = "matrix-trigger-bot",
    version,
    about = "Matrix bot answering configurable commands, keywords and dice rolls"
)]
struct Args {
    /// Homeserver base URL, e.g. `https://matrix-client.matrix.org`.
    #[arg(long, env = "MATRIX_HOMESERVER")]
    homeserver: String,

    /// Username (localpart or full user ID)
    #[arg(long, env = "MATRIX_USERNAME")]
    username: String,

    /// Password (if omitted, will prompt if needed)
    #[arg(long, env = "MATRIX_PASSWORD")]
    password: Option<String>,

    /// Directory for persistent state (encryption keys, sync cache)
    #[arg(long, env = "MATRIX_STORE", default_value = "./bot-store")]
    store: PathBuf,

    /// JSON session file for access token/device info
    #[arg(long, env = "MATRIX_SESSION_FILE", default_value = "./session.json")]
    session_file: PathBuf,

    /// Device display name
    #[arg(long, env = "MATRIX_DEVICE_NAME", default_value = "matrix-trigger-bot")]
    device_name: String,

    /// Path to the YAML bot config (prefix, cooldown, commands file, owner)
    #[arg(long, env = "MATRIX_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// Disable auto-joining rooms when invited
    #[arg(long)]
    no_autojoin: bool,

    /// Sync timeout in milliseconds
    #[arg(long, env = "MATRIX_SYNC_TIMEOUT_MS", default_value_t = 30000)]
    sync_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user_id: String,
    device_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG and clap's env fallbacks see it.
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let source = JsonFileSource::new(&config.commands_file);
    source.ensure_exists()?;
    let triggers = TriggerStore::from_value(&source.load()?)
        .with_context(|| format!("loading {}", source.path().display()))?;

    let registry = plugins::build_registry(&config.plugins, config.owner.as_deref());
    for entry in registry.entries() {
        let commands: Vec<String> = entry
            .spec
            .triggers
            .commands
            .iter()
            .map(|c| format!("{}{c}", config.prefix))
            .collect();
        info!(plugin = %entry.spec.id, help = entry.plugin.help(), commands = ?commands, "Registered built-in");
    }

    let router = Arc::new(Router::new(
        RouterConfig {
            prefix: config.prefix.clone(),
            cooldown: config.cooldown(),
            owner: config.owner.clone(),
        },
        registry,
        Arc::new(triggers),
        Arc::new(source),
    ));

    fs::create_dir_all(&args.store)
        .with_context(|| format!("creating store directory at {}", args.store.display()))?;

    // SQLite store keeps E2EE state across restarts
    let client = Client::builder()
        .homeserver_url(&args.homeserver)
        .handle_refresh_tokens()
        .sqlite_store(&args.store, None)
        .build()
        .await
        .context("building matrix client")?;

    login(&client, &args).await?;

    // Skip the backlog: handlers are only attached after the first sync.
    let initial = client
        .sync_once(SyncSettings::default())
        .await
        .context("initial sync")?;

    if !args.no_autojoin {
        client.add_event_handler(on_stripped_member);
    }

    client.add_event_handler(
        move |ev: OriginalSyncRoomMessageEvent, room: Room, client: Client| {
            let router = Arc::clone(&router);
            async move { on_room_message(&router, ev, room, client).await }
        },
    );

    info!(
        timeout_ms = args.sync_timeout_ms,
        "Starting sync… Press Ctrl+C to stop."
    );
    let settings = SyncSettings::new()
        .token(initial.next_batch)
        .timeout(Duration::from_millis(args.sync_timeout_ms));
    client
        .sync(settings)
        .await
        .map_err(|e| anyhow!("sync terminated: {e}"))
}

/// Restores the saved session, or logs in with a password and saves one.
async fn login(client: &Client, args: &Args) -> Result<()> {
    if let Some(session) = load_session(&args.session_file)? {
        info!("Restoring session for {}", session.user_id);
        let matrix_session = MatrixSession {
            meta: SessionMeta {
                user_id: session.user_id.parse().context("invalid stored user_id")?,
                device_id: session.device_id.into(),
            },
            tokens: SessionTokens {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
        };
        return client
            .restore_session(matrix_session)
            .await
            .context("restoring session");
    }

    let password = password(args)?;
    info!("Logging in as {}", args.username);
    let response = client
        .matrix_auth()
        .login_username(&args.username, &password)
        .initial_device_display_name(&args.device_name)
        .request_refresh_token()
        .send()
        .await
        .context("login failed")?;

    let session = SavedSession {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        user_id: response.user_id.to_string(),
        device_id: response.device_id.to_string(),
    };
    save_session(&args.session_file, &session)?;
    info!(
        "Logged in: user={} device={}",
        session.user_id, session.device_id
    );
    Ok(())
}

/// Empty env/arg counts as missing; only prompts on an interactive terminal.
fn password(args: &Args) -> Result<String> {
    if let Some(p) = args
        .password
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Ok(p.to_owned());
    }
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "No MATRIX_PASSWORD provided and no stored session. In non-interactive mode, set MATRIX_PASSWORD or mount an existing session at {}",
            args.session_file.display()
        ));
    }
    warn!("No password provided via --password or MATRIX_PASSWORD. Prompting...");
    #[cfg(feature = "rpassword")]
    {
        rpassword::prompt_password("Matrix password:")
            .map_err(|e| anyhow!("Failed to read password: {e}"))
    }
    #[cfg(not(feature = "rpassword"))]
    {
        Err(anyhow!(
            "rpassword feature is not enabled. Cannot prompt for password."
        ))
    }
}

async fn on_stripped_member(ev: StrippedRoomMemberEvent, room: Room, client: Client) {
    if ev.content.membership != MembershipState::Invite {
        return;
    }
    let Some(own_id) = client.user_id() else {
        return;
    };
    if ev.state_key != own_id.as_str() {
        return;
    }
    info!(room_id = %room.room_id(), "Auto-joining invited room");
    if let Err(e) = room.join().await {
        warn!(error = %e, "Failed to accept invite");
    }
}

async fn on_room_message(router: &Router, ev: OriginalSyncRoomMessageEvent, room: Room, client: Client) {
    let Some(own_id) = client.user_id() else {
        return;
    };
    if ev.sender == own_id {
        return;
    }
    let body = match &ev.content.msgtype {
        MessageType::Text(t) => t.body.as_str(),
        MessageType::Notice(n) => n.body.as_str(),
        MessageType::Audio(_)
        | MessageType::Emote(_)
        | MessageType::File(_)
        | MessageType::Image(_)
        | MessageType::Location(_)
        | MessageType::ServerNotice(_)
        | MessageType::Video(_)
        | MessageType::VerificationRequest(_)
        | _ => return,
    };
    debug!(room_id = %room.room_id(), sender = %ev.sender, body = %truncate(body, 200), "Incoming message");

    let incoming = Incoming {
        text: body,
        channel: room.room_id().as_str(),
        sender: ev.sender.as_str(),
        now: Instant::now(),
    };
    let Some(reply) = router.dispatch(incoming).await else {
        return;
    };
    if let Err(e) = room.send(RoomMessageEventContent::text_plain(reply)).await {
        warn!(room_id = %room.room_id(), error = %e, "Failed to send reply");
    }
}

fn load_session(path: &Path) -> Result<Option<SavedSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading session file at {}", path.display()))?;
    let session: SavedSession = serde_json::from_str(&data).context("parsing session JSON")?;
    Ok(Some(session))
}

fn save_session(path: &Path, session: &SavedSession) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(session)?;
    fs::write(path, data).with_context(|| format!("writing session file at {}", path.display()))?;
    Ok(())
}
