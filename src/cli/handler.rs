use super::error;
use super::output;
use super::{Commands, ConfigAction, ProfileAction, ProfileFields};
use crate::app::config::Config;
use crate::app::state::AppState;
use crate::coordinator::{Command, CommandResponse};
use crate::profile::{ProfileError, ProfileValues};
use crate::queue::QueueSnapshot;
use crate::sab::api::api_url;
use crate::site;
use crate::sync::QueueView;
use crate::sync::pause::{PauseDuration, parse_pause_input};
use crate::util::paths;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Handle a CLI command and return exit code
pub async fn handle_command(command: Commands, state: AppState) -> i32 {
    let result = match command {
        Commands::Status { json } => handle_status(&state, json).await,
        Commands::Refresh => handle_refresh(&state).await,
        Commands::Pause { id } => {
            send_and_report(&state, Command::PauseDownload { nzo_id: id.clone() }, format!("Paused {id}")).await
        }
        Commands::Resume { id } => {
            send_and_report(&state, Command::ResumeDownload { nzo_id: id.clone() }, format!("Resumed {id}")).await
        }
        Commands::Delete { id } => {
            send_and_report(&state, Command::RemoveDownload { nzo_id: id.clone() }, format!("Deleted {id}")).await
        }
        Commands::Move { id, position } => {
            send_and_report(
                &state,
                Command::MoveItem { nzo_id: id.clone(), position },
                format!("Moved {id} to position {position}"),
            )
            .await
        }
        Commands::Speed { limit } => handle_speed(&state, limit).await,
        Commands::PauseQueue { minutes } => handle_pause_queue(&state, minutes).await,
        Commands::ResumeQueue => {
            send_and_report(&state, Command::ResumeQueue, "Queue resumed".to_string()).await
        }
        Commands::AddUrl { url, name, category } => handle_add_url(&state, url, name, category).await,
        Commands::Test { profile } => handle_test(&state, profile).await,
        Commands::Categories => handle_categories(&state).await,
        Commands::Profile { action } => handle_profile(action, &state).await,
        Commands::CheckPage { url } => handle_check_page(&state, url).await,
        Commands::IgnoreHost { host, undo } => handle_ignore_host(&state, host, undo).await,
        Commands::Send { json } => handle_send(&state, &json).await,
        Commands::Config { action } => handle_config(action, &state).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            error::ERROR
        }
    }
}

/// Send a command and print either `success` or the error
async fn send_and_report(state: &AppState, command: Command, success: String) -> Result<i32> {
    tracing::debug!("CLI command: {}", command.action());
    let response = state.coordinator.send(command).await;
    Ok(report(&response, &success))
}

fn report(response: &CommandResponse, success: &str) -> i32 {
    if response.is_success() {
        println!("{}", success);
    } else {
        eprintln!("Error: {}", response.error_message());
    }
    error::for_response(response)
}

/// Fetch, then print what was published to the store
async fn handle_status(state: &AppState, json: bool) -> Result<i32> {
    let response = state.coordinator.send(Command::RefreshData).await;

    if json {
        let snapshot = QueueSnapshot::load(&state.store).await;
        println!("{}", output::format_snapshot_json(&snapshot));
        if !response.is_success() {
            eprintln!("Error: {}", response.error_message());
        }
    } else {
        // The error banner carries the failure in human output
        let view = QueueView::load(&state.store).await;
        println!("{}", output::format_view(&view));
    }
    Ok(error::for_response(&response))
}

async fn handle_refresh(state: &AppState) -> Result<i32> {
    let response = state.coordinator.send(Command::RefreshData).await;
    let count = QueueSnapshot::load(&state.store).await.items.len();
    Ok(report(&response, &format!("Queue refreshed ({} items)", count)))
}

async fn handle_speed(state: &AppState, limit: String) -> Result<i32> {
    let message = if limit.trim().is_empty() {
        "Speed limit cleared".to_string()
    } else {
        format!("Speed limit set to {}", limit.trim())
    };
    send_and_report(state, Command::SetSpeedLimit { speed: limit.trim().to_string() }, message).await
}

/// Read one line from stdin after printing `prompt`; `None` on EOF
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

async fn handle_pause_queue(state: &AppState, minutes: Option<String>) -> Result<i32> {
    let raw = minutes.unwrap_or_default();
    let duration = match parse_pause_input(&raw, || {
        eprintln!("'{}' is not a number of minutes.", raw.trim());
        prompt_line("Please enter a number of minutes: ")
    }) {
        Ok(duration) => duration,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(error::INVALID_INPUT);
        }
    };

    let message = match duration {
        PauseDuration::Indefinite => "Queue paused".to_string(),
        PauseDuration::Minutes(m) => format!("Queue paused for {} minutes", m),
    };
    send_and_report(state, Command::PauseQueue { duration: duration.minutes() }, message).await
}

async fn handle_add_url(
    state: &AppState,
    url: String,
    name: Option<String>,
    category: Option<String>,
) -> Result<i32> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        eprintln!("Error: not an http(s) URL: {}", url);
        return Ok(error::INVALID_INPUT);
    }
    let response = state
        .coordinator
        .send(Command::AddUrl {
            url: url.clone(),
            nzbname: name,
            category,
        })
        .await;
    Ok(report(&response, &format!("Added {}", url)))
}

async fn handle_test(state: &AppState, profile: Option<String>) -> Result<i32> {
    let found = match &profile {
        Some(name) => state.profiles.get(name).await,
        None => state.profiles.get_active().await,
    };
    let Some(found) = found else {
        match profile {
            Some(name) => eprintln!("Error: Profile '{}' does not exist", name),
            None => eprintln!("Error: {}", crate::coordinator::NO_ACTIVE_PROFILE),
        }
        return Ok(error::NOT_FOUND);
    };

    println!("Testing '{}' at {} ...", found.name, found.values.url);
    let response = state
        .coordinator
        .send(Command::TestConnection {
            profile: found.values,
        })
        .await;
    let version = response
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    Ok(report(&response, &format!("Connection OK (version {})", version)))
}

async fn handle_categories(state: &AppState) -> Result<i32> {
    let response = state.coordinator.send(Command::GetCategories).await;
    let categories: Vec<String> = response
        .get("categories")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?
        .unwrap_or_default();
    for category in categories {
        println!("{}", category);
    }
    Ok(error::for_response(&response))
}

/// Exit code for a profile error
fn profile_error_code(e: &ProfileError) -> i32 {
    match e {
        ProfileError::Missing(_) => error::NOT_FOUND,
        ProfileError::Duplicate(_) | ProfileError::RenameConflict(_) | ProfileError::InvalidName => {
            error::INVALID_INPUT
        }
        ProfileError::Store(_) => error::ERROR,
    }
}

fn merge_fields(mut values: ProfileValues, fields: ProfileFields) -> ProfileValues {
    if let Some(url) = fields.url {
        values.url = url;
    }
    if let Some(api_key) = fields.api_key {
        values.api_key = api_key;
    }
    if let Some(username) = fields.username {
        values.username = username;
    }
    if let Some(password) = fields.password {
        values.password = password;
    }
    values
}

async fn handle_profile(action: ProfileAction, state: &AppState) -> Result<i32> {
    let profiles = &state.profiles;
    let result = match action {
        ProfileAction::List { json } => {
            let active = profiles.active_name().await;
            let names = profiles.names().await;
            if json {
                let mut list = Vec::new();
                for name in &names {
                    let url = profiles.get(name).await.map(|p| p.values.url).unwrap_or_default();
                    list.push(serde_json::json!({
                        "name": name,
                        "url": url,
                        "active": active.as_deref() == Some(name.as_str()),
                    }));
                }
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if names.is_empty() {
                println!("No profiles configured. Add one with 'sabremote profile add'.");
            } else {
                for name in names {
                    let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
            Ok(())
        }
        ProfileAction::Add { name, fields } => {
            let Some(url) = fields.url.clone() else {
                eprintln!("Error: --url is required");
                return Ok(error::INVALID_INPUT);
            };
            if let Err(e) = api_url(&url) {
                eprintln!("Error: {}", e);
                return Ok(error::INVALID_INPUT);
            }
            let values = merge_fields(ProfileValues::new(url), fields);
            profiles.add(&name, values).await.map(|()| {
                println!("Added profile '{}'", name);
            })
        }
        ProfileAction::Edit { name, rename, fields } => {
            let Some(existing) = profiles.get(&name).await else {
                eprintln!("Error: Profile '{}' does not exist", name);
                return Ok(error::NOT_FOUND);
            };
            if let Some(Err(e)) = fields.url.as_deref().map(api_url) {
                eprintln!("Error: {}", e);
                return Ok(error::INVALID_INPUT);
            }
            let new_name = rename.unwrap_or_else(|| name.clone());
            let values = merge_fields(existing.values, fields);
            profiles.edit(&name, values, &new_name).await.map(|()| {
                println!("Updated profile '{}'", new_name);
            })
        }
        ProfileAction::Remove { name } => profiles.remove(&name).await.map(|active| {
            println!("Removed profile '{}'", name);
            match active {
                Some(active) => println!("Active profile: {}", active),
                None => println!("No profiles remain"),
            }
        }),
        ProfileAction::Use { name } => profiles.set_active(&name).await.map(|()| {
            println!("Active profile: {}", name);
        }),
        ProfileAction::Show { name } => {
            let active = profiles.active_name().await;
            let target = name.or_else(|| active.clone());
            let Some(profile) = (match &target {
                Some(n) => profiles.get(n).await,
                None => None,
            }) else {
                match target {
                    Some(n) => eprintln!("Error: Profile '{}' does not exist", n),
                    None => eprintln!("Error: {}", crate::coordinator::NO_ACTIVE_PROFILE),
                }
                return Ok(error::NOT_FOUND);
            };
            let is_active = active.as_deref() == Some(profile.name.as_str());
            println!("{}", output::format_profile(&profile, is_active));
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(error::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(profile_error_code(&e))
        }
    }
}

async fn handle_check_page(state: &AppState, url: String) -> Result<i32> {
    let response = state.coordinator.send(Command::CheckPage { url }).await;
    if let Some(action) = response.get("page_action").and_then(|v| v.as_str()) {
        println!("Action: {}", action);
    }
    if let Some(host) = response.get("host").and_then(|v| v.as_str()) {
        println!("Host: {}", host);
    }
    Ok(error::for_response(&response))
}

async fn handle_ignore_host(state: &AppState, host: String, undo: bool) -> Result<i32> {
    if undo {
        site::unignore_host(&state.store, &host)
            .await
            .with_context(|| format!("Failed to re-enable detection on {}", host))?;
        println!("Detection re-enabled on {}", host);
        return Ok(error::SUCCESS);
    }
    send_and_report(
        state,
        Command::IgnoreHost { host: host.clone() },
        format!("Detection disabled on {}", host),
    )
    .await
}

async fn handle_send(state: &AppState, json: &str) -> Result<i32> {
    let response = state.coordinator.send_json(json).await;
    println!("{}", output::format_response(&response));
    Ok(error::for_response(&response))
}

async fn handle_config(action: ConfigAction, state: &AppState) -> Result<i32> {
    match action {
        ConfigAction::Show { json } => {
            let config = state.config.read().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&*config)?);
            } else {
                println!("{}", toml::to_string_pretty(&*config)?);
            }
            Ok(error::SUCCESS)
        }
        ConfigAction::Path => {
            println!("Settings: {}", paths::get_app_config_path()?.display());
            match state.store.path() {
                Some(path) => println!("State: {}", path.display()),
                None => println!("State: {}", paths::get_store_path()?.display()),
            }
            println!("Logs: {}", paths::get_logs_dir()?.display());
            Ok(error::SUCCESS)
        }
        ConfigAction::Reset { settings } => {
            let response = state.coordinator.send(Command::ResetSettings).await;
            if !response.is_success() {
                eprintln!("Error: {}", response.error_message());
                return Ok(error::for_response(&response));
            }
            println!("Stored state reset to defaults");

            if settings {
                let defaults = Config::default();
                defaults.save().context("Failed to write default settings")?;
                *state.config.write().await = defaults;
                println!("Settings reset to defaults");
            }
            Ok(error::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CoordinatorHandle, Request};
    use crate::store::Store;
    use std::sync::{Arc, Mutex};
    use tokio::sync::{RwLock, mpsc};

    fn state_with_fake(reply: CommandResponse) -> (AppState, Arc<Mutex<Vec<Command>>>) {
        let (sender, mut receiver) = mpsc::channel::<Request>(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                log.lock().unwrap().push(request.command);
                let _ = request.reply.send(reply.clone());
            }
        });
        let state = AppState::new(
            Arc::new(RwLock::new(Config::default())),
            Store::in_memory(),
            CoordinatorHandle::new(sender),
        );
        (state, seen)
    }

    #[tokio::test]
    async fn test_pause_queue_with_minutes() {
        let (state, seen) = state_with_fake(CommandResponse::ok());
        let code = handle_command(
            Commands::PauseQueue { minutes: Some("15".into()) },
            state,
        )
        .await;

        assert_eq!(code, error::SUCCESS);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Command::PauseQueue { duration: Some(15) }]
        );
    }

    #[tokio::test]
    async fn test_pause_queue_zero_is_indefinite() {
        let (state, seen) = state_with_fake(CommandResponse::ok());
        handle_command(Commands::PauseQueue { minutes: Some("0".into()) }, state).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Command::PauseQueue { duration: None }]
        );
    }

    #[tokio::test]
    async fn test_failed_command_exit_code() {
        let (state, _) = state_with_fake(CommandResponse::failure(
            crate::coordinator::NO_ACTIVE_PROFILE,
        ));
        let code = handle_command(Commands::Delete { id: "A".into() }, state).await;
        assert_eq!(code, error::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_url_rejects_non_http() {
        let (state, seen) = state_with_fake(CommandResponse::ok());
        let code = handle_command(
            Commands::AddUrl {
                url: "ftp://example.com/a.nzb".into(),
                name: None,
                category: None,
            },
            state,
        )
        .await;
        assert_eq!(code, error::INVALID_INPUT);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_profile_lifecycle_exit_codes() {
        let (state, _) = state_with_fake(CommandResponse::ok());
        let add = |name: &str, url: &str| Commands::Profile {
            action: ProfileAction::Add {
                name: name.to_string(),
                fields: ProfileFields {
                    url: Some(url.to_string()),
                    api_key: Some("key".into()),
                    ..Default::default()
                },
            },
        };

        assert_eq!(handle_command(add("home", "http://nas:8080/"), state.clone()).await, error::SUCCESS);
        assert_eq!(
            handle_command(add("home", "http://nas:8080/"), state.clone()).await,
            error::INVALID_INPUT
        );
        assert_eq!(handle_command(add("bad", "not a url"), state.clone()).await, error::INVALID_INPUT);
        assert_eq!(
            handle_command(
                Commands::Profile { action: ProfileAction::Use { name: "missing".into() } },
                state.clone()
            )
            .await,
            error::NOT_FOUND
        );
        assert_eq!(state.profiles.active_name().await.as_deref(), Some("home"));

        let edit = Commands::Profile {
            action: ProfileAction::Edit {
                name: "home".into(),
                rename: Some("nas".into()),
                fields: ProfileFields {
                    password: Some("pw".into()),
                    ..Default::default()
                },
            },
        };
        assert_eq!(handle_command(edit, state.clone()).await, error::SUCCESS);
        let profile = state.profiles.get("nas").await.unwrap();
        assert_eq!(profile.values.api_key, "key");
        assert_eq!(profile.values.password, "pw");
        assert_eq!(state.profiles.active_name().await.as_deref(), Some("nas"));
    }
}
