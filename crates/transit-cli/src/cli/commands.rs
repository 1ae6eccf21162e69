use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use transit_core::models::NotificationType;
use transit_core::notices::NoticeLevel;
use transit_core::{
    ApiError, ClientConfig, ComposeForm, HttpTransport, Identity, InboxController,
    NotificationApi, NotificationGateway, Role, Session, SessionStore, TicketGateway,
    UnreadBadge, ValidatorFlow,
};

/// Environment variable that overrides the stored access token
pub const TOKEN_ENV: &str = "TRANSIT_TOKEN";

/// One CLI operation, already parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login {
        user_id: i64,
        role: Role,
        token: String,
        name: Option<String>,
    },
    Logout,
    Whoami,
    Inbox {
        page: u32,
        size: Option<u32>,
        all: bool,
    },
    Unread {
        list: bool,
    },
    Read {
        id: i64,
    },
    ReadAll,
    Delete {
        id: i64,
    },
    Send {
        to: String,
        title: String,
        message: String,
        notification_type: String,
    },
    Validate {
        code: String,
        route: Option<i64>,
    },
    Ticket {
        code: String,
    },
    Watch {
        interval: Option<u64>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Whoami => "whoami",
            Command::Inbox { .. } => "inbox",
            Command::Unread { .. } => "unread",
            Command::Read { .. } => "read",
            Command::ReadAll => "read-all",
            Command::Delete { .. } => "delete",
            Command::Send { .. } => "send",
            Command::Validate { .. } => "validate",
            Command::Ticket { .. } => "ticket",
            Command::Watch { .. } => "watch",
        }
    }
}

pub async fn run(command: Command, config: &ClientConfig, pretty: bool) -> Result<()> {
    let store = SessionStore::new(&config.data_dir);
    debug!(command = command.name(), api = %config.api_base_url, "running command");

    match command {
        Command::Login {
            user_id,
            role,
            token,
            name,
        } => {
            if token.trim().is_empty() {
                bail!("Token must not be empty");
            }
            let identity = Identity {
                id: user_id,
                role,
                display_name: name,
            };
            let session = Session::new(identity.clone(), token.trim());
            store.sign_in(&session)?;
            print_json(&json!({ "signedIn": true, "identity": identity }), pretty)
        }
        Command::Logout => {
            store.sign_out()?;
            print_json(&json!({ "signedIn": false }), pretty)
        }
        Command::Whoami => match store.identity()? {
            Some(identity) => print_json(&json!({ "signedIn": true, "identity": identity }), pretty),
            None => print_json(&json!({ "signedIn": false }), pretty),
        },
        Command::Inbox { page, size, all } => {
            let session = require_session(&store)?;
            let inbox = InboxController::new(
                notification_gateway(config)?,
                session,
                size.unwrap_or(config.page_size),
            );
            if page == 0 {
                inbox.refresh().await?;
            } else {
                inbox.load(page).await?;
                inbox.refresh_count().await;
            }
            if all {
                while inbox.load_more().await? {}
            }
            let state = inbox.snapshot();
            print_json(
                &json!({
                    "summary": state.unread_summary(),
                    "inbox": state,
                }),
                pretty,
            )
        }
        Command::Unread { list } => {
            let session = require_session(&store)?;
            let api = notification_gateway(config)?;
            if list {
                let items = api.unread(&session, session.user_id()).await?;
                print_json(&items, pretty)
            } else {
                let count = api.unread_count(&session, session.user_id()).await?;
                print_json(&json!({ "unreadCount": count }), pretty)
            }
        }
        Command::Read { id } => {
            let inbox = inbox_controller(config, &store)?;
            let result = inbox.mark_read(id).await;
            finish_mutation(&inbox, result, pretty)
        }
        Command::ReadAll => {
            let inbox = inbox_controller(config, &store)?;
            let result = inbox.mark_all_read().await;
            finish_mutation(&inbox, result, pretty)
        }
        Command::Delete { id } => {
            let inbox = inbox_controller(config, &store)?;
            let result = inbox.delete(id).await;
            finish_mutation(&inbox, result, pretty)
        }
        Command::Send {
            to,
            title,
            message,
            notification_type,
        } => {
            let inbox = inbox_controller(config, &store)?;
            let form = ComposeForm::new(to, title, message)
                .with_type(NotificationType::parse(&notification_type.to_uppercase()));
            let created = inbox.send(&form).await.map_err(to_anyhow)?;
            print_json(&created, pretty)
        }
        Command::Validate { code, route } => {
            let validator = ValidatorFlow::new(ticket_gateway(config)?, load_session(&store)?);
            if let Some(route) = route {
                validator.set_route_id(route);
            }
            let outcome = validator.submit(&code).await.map_err(to_anyhow)?;
            let details: serde_json::Map<String, serde_json::Value> = outcome
                .detail_rows()
                .into_iter()
                .map(|(label, value)| (label.to_string(), value.into()))
                .collect();
            print_json(
                &json!({
                    "headline": outcome.headline(),
                    "result": outcome,
                    "details": details,
                }),
                pretty,
            )
        }
        Command::Ticket { code } => {
            let validator = ValidatorFlow::new(ticket_gateway(config)?, load_session(&store)?);
            let ticket = validator.lookup(&code).await.map_err(to_anyhow)?;
            print_json(&ticket, pretty)
        }
        Command::Watch { interval } => {
            let session = require_session(&store)?;
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or(config.badge_poll_interval)
                .max(Duration::from_secs(1));
            watch(notification_gateway(config)?, session, interval, pretty).await
        }
    }
}

/// Poll the unread badge and print every change until Ctrl-C.
async fn watch<A: NotificationApi + 'static>(
    api: Arc<A>,
    session: Session,
    interval: Duration,
    pretty: bool,
) -> Result<()> {
    let mut badge = UnreadBadge::new(api, interval);
    badge.activate(session);
    let mut counts = badge
        .subscribe()
        .ok_or_else(|| anyhow!("Badge poller did not start"))?;

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = counts.changed() => {
                if changed.is_err() {
                    break Err(anyhow!("Badge poller stopped unexpectedly"));
                }
                let count = *counts.borrow_and_update();
                if let Err(err) = print_json(&json!({ "unreadCount": count, "badge": badge.label() }), pretty) {
                    break Err(err);
                }
            }
        }
    };

    badge.deactivate().await;
    outcome
}

fn notification_gateway(config: &ClientConfig) -> Result<Arc<NotificationGateway>> {
    Ok(Arc::new(NotificationGateway::new(HttpTransport::new(config)?)))
}

fn ticket_gateway(config: &ClientConfig) -> Result<Arc<TicketGateway>> {
    Ok(Arc::new(TicketGateway::new(HttpTransport::new(config)?)))
}

fn inbox_controller(config: &ClientConfig, store: &SessionStore) -> Result<InboxController<NotificationGateway>> {
    Ok(InboxController::new(
        notification_gateway(config)?,
        require_session(store)?,
        config.page_size,
    ))
}

/// Stored session with `TRANSIT_TOKEN` applied, if anyone is signed in.
pub fn load_session(store: &SessionStore) -> Result<Option<Session>> {
    let token_override = std::env::var(TOKEN_ENV).ok();
    resolve_session(store, token_override.as_deref())
}

fn resolve_session(store: &SessionStore, token_override: Option<&str>) -> Result<Option<Session>> {
    let Some(token) = token_override.map(str::trim).filter(|t| !t.is_empty()) else {
        return store.load().context("Failed to load session");
    };
    // Only the identity is needed, so a missing stored token is not an error here
    let identity = store.identity().context("Failed to load session")?;
    Ok(identity.map(|identity| Session::new(identity, token)))
}

fn require_session(store: &SessionStore) -> Result<Session> {
    load_session(store)?.ok_or_else(|| anyhow!("Not logged in. Run `transit login` first."))
}

/// Report the single notice a mutation raised; failures become the error.
fn finish_mutation<A: NotificationApi>(
    inbox: &InboxController<A>,
    result: Result<(), ApiError>,
    pretty: bool,
) -> Result<()> {
    let notices = inbox.take_notices();
    match result {
        Ok(()) => {
            let message = notices
                .iter()
                .find(|n| n.level == NoticeLevel::Success)
                .map(|n| n.message.clone());
            print_json(&json!({ "ok": true, "message": message }), pretty)
        }
        Err(err) => {
            let headline = notices
                .iter()
                .find(|n| n.level == NoticeLevel::Error)
                .map(|n| n.message.clone());
            match headline {
                Some(headline) => Err(anyhow!("{}: {}", headline, err.user_message())),
                None => Err(to_anyhow(err)),
            }
        }
    }
}

fn to_anyhow(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Validation(message) => anyhow!(message),
        other => anyhow::Error::new(other),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> ClientConfig {
        // Nothing listens here; only offline commands run in these tests
        ClientConfig::new("http://127.0.0.1:9/api/v1", dir)
    }

    #[tokio::test]
    async fn test_commands_without_login_fail() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Command::ReadAll, &config(dir.path()), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
    }

    #[tokio::test]
    async fn test_validate_blank_code_is_local() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Command::Validate {
                code: "   ".to_string(),
                route: None,
            },
            &config(dir.path()),
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Please enter or scan a QR code");
    }

    #[tokio::test]
    async fn test_validate_requires_identity() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Command::Validate {
                code: "ABC123".to_string(),
                route: Some(2),
            },
            &config(dir.path()),
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in to validate tickets");
    }

    #[tokio::test]
    async fn test_login_rejects_blank_token() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Command::Login {
                user_id: 5,
                role: Role::Controller,
                token: "  ".to_string(),
                name: None,
            },
            &config(dir.path()),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Token"));
        assert!(!SessionStore::new(dir.path()).is_signed_in());
    }

    #[test]
    fn test_token_override_does_not_need_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).without_keyring();
        std::fs::write(
            store.path(),
            r#"{"identity": {"id": 5, "role": "CONTROLLER"}}"#,
        )
        .unwrap();

        assert!(resolve_session(&store, None).is_err());
        assert!(resolve_session(&store, Some("  ")).is_err());

        let session = resolve_session(&store, Some(" env-token ")).unwrap().unwrap();
        assert_eq!(session.user_id(), 5);
        assert_eq!(session.token(), "env-token");
    }

    #[tokio::test]
    async fn test_login_session_is_available_to_later_commands() {
        let dir = tempfile::tempdir().unwrap();
        run(
            Command::Login {
                user_id: 5,
                role: Role::Controller,
                token: "tok-123".to_string(),
                name: None,
            },
            &config(dir.path()),
            false,
        )
        .await
        .unwrap();

        let store = SessionStore::new(dir.path());
        let session = resolve_session(&store, None).unwrap().unwrap();
        assert_eq!(session.user_id(), 5);
        assert_eq!(session.token(), "tok-123");

        store.sign_out().unwrap();
    }

    #[test]
    fn test_token_override_without_login_is_still_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).without_keyring();
        assert!(resolve_session(&store, Some("env-token")).unwrap().is_none());
    }

    #[test]
    fn test_validation_errors_keep_plain_message() {
        let err = to_anyhow(ApiError::Validation("Please fill in all fields".to_string()));
        assert_eq!(err.to_string(), "Please fill in all fields");

        let err = to_anyhow(ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
