use anyhow::{Context, Result};
use sofabaton_remote::config::load_config;
use sofabaton_remote::dispatch::DrawerKind;
use sofabaton_remote::hass::{HassClient, HassRegistry};
use sofabaton_remote::remote::{Key, RemoteController, RemoteView};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Console command read from stdin
#[derive(Debug, PartialEq)]
enum Command {
    Press(Key),
    Activity(String),
    Drawer(DrawerKind),
    Item(DrawerKind, usize),
    Custom(usize),
    Show,
    Help,
}

const HELP: &str = "commands: press <key|id>, activity <name>, drawer <macros|favorites>, \
macro <n>, favorite <n>, custom <n>, show, help";

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let index = || {
        rest.parse::<usize>()
            .map_err(|_| format!("expected an item number, got '{}'", rest))
    };

    match verb {
        "press" => Key::parse(rest)
            .map(Command::Press)
            .ok_or_else(|| format!("unknown key '{}'", rest)),
        "activity" if !rest.is_empty() => Ok(Command::Activity(rest.to_string())),
        "drawer" => match rest {
            "macros" => Ok(Command::Drawer(DrawerKind::Macros)),
            "favorites" => Ok(Command::Drawer(DrawerKind::Favorites)),
            _ => Err(format!("unknown drawer '{}'", rest)),
        },
        "macro" => index().map(|i| Command::Item(DrawerKind::Macros, i)),
        "favorite" => index().map(|i| Command::Item(DrawerKind::Favorites, i)),
        "custom" => index().map(Command::Custom),
        "show" => Ok(Command::Show),
        "help" | "" => Ok(Command::Help),
        _ => Err(format!("unknown command '{}'", line)),
    }
}

async fn run_command(controller: &mut RemoteController, command: Command) {
    match command {
        Command::Press(key) => {
            let _ = controller.press_key(key.id()).await;
        }
        Command::Activity(name) => {
            let _ = controller.select_activity(&name).await;
        }
        Command::Drawer(kind) => {
            let open = controller.toggle_drawer(kind);
            info!(open = ?open, "Drawer toggled");
        }
        Command::Item(kind, index) => {
            let _ = controller.press_drawer_item(kind, index).await;
        }
        Command::Custom(index) => {
            if let Ok(Some(action)) = controller.press_custom_favorite(index).await {
                info!(action = ?action, "Host action requested");
            }
        }
        Command::Show => match serde_json::to_string_pretty(&controller.view()) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!(error = %e, "Failed to render view"),
        },
        Command::Help => println!("{}", HELP),
    }
}

/// One-line summary of the parts of the view worth logging on change
fn summarize(view: &RemoteView) -> String {
    let warning = view.warning.map(|w| w.to_string()).unwrap_or_default();
    format!(
        "{:?} activity='{}' loading={} macros={} favorites={} {}",
        view.integration,
        view.selector.selected,
        view.loading,
        view.macros.len(),
        view.favorites.len() + view.custom_favorites.len(),
        warning
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sofabaton_remote=info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SOFABATON_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());
    let config = load_config(&path).with_context(|| format!("Failed to load {}", path))?;
    let timing = config.timing.clone().with_env_overrides();

    let client = Arc::new(HassClient::new(&config.hass)?);
    let registry = Arc::new(HassRegistry::new(&config.hass));
    let entity_id = config.remote.entity.clone();
    let mut controller = RemoteController::new(config.remote, registry, client.clone(), timing)?;

    info!(entity_id = %entity_id, url = %client.base_url(), "Sofabaton remote starting...");

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.hass.poll_interval_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_summary = String::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match client.fetch_state(&entity_id).await {
                    Ok(snapshot) => {
                        let view = controller.update(&snapshot).await;
                        let summary = summarize(&view);
                        if summary != last_summary {
                            info!(entity_id = %entity_id, "{}", summary);
                            last_summary = summary;
                        }
                        debug!(queued = controller.session().queue().len(), "Update tick");
                    }
                    Err(e) => warn!(entity_id = %entity_id, error = %e, "Failed to fetch remote state"),
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => match parse_command(&line) {
                        Ok(command) => run_command(&mut controller, command).await,
                        Err(e) => println!("{}\n{}", e, HELP),
                    },
                    Ok(None) => {
                        info!("stdin closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
