//! Command errors and how they surface to users.
//!
//! Every failure that ends a command becomes a [`CommandError`]; the router
//! turns it into an error page via [`CommandError::user_message`]. Per-server
//! remote failures are not errors here: they are grouped into result pages.

use fleet_types::CommandKind;
use serenity::http::HttpError;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized to use this command")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("This command is disabled")]
    Disabled,

    #[error("This command can only be used in a Discord server")]
    GuildOnly,

    /// The guild-configuration service refused or failed; the text is user-facing.
    #[error("{0}")]
    Guild(String),

    #[error("{0}")]
    Remote(String),

    #[error("cache error: {0}")]
    Cache(#[from] fleet_kv::Error),

    #[error("{command} message has expired")]
    Expired { command: CommandKind },

    /// Nothing to do; shown as a dedicated error page.
    #[error("{0}")]
    NothingToDo(String),

    #[error("chat error: {message}")]
    Chat { message: String, status: Option<u16> },
}

impl CommandError {
    /// Short text shown as the error page's field title.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Cache(_) => "Something went wrong, please try again".to_string(),
            CommandError::Chat { .. } => "Failed to send output".to_string(),
            other => other.to_string(),
        }
    }

    /// Follow-up text shown under the message, when there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            CommandError::Expired { command } => {
                Some(format!("Please run the {} command again", command))
            }
            CommandError::Cache(_) => Some("Please try again in a moment".to_string()),
            _ => None,
        }
    }

    /// Whether the error deserves an `error!` rather than a `debug!`.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CommandError::Cache(_) | CommandError::Chat { .. } | CommandError::Guild(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CommandError::Chat { status: Some(429), .. })
    }
}

/// Convert a serenity error, logging it at a level that matches its kind.
pub fn chat_error(context: &str, err: serenity::Error) -> CommandError {
    let status = match &err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => Some(resp.status_code.as_u16()),
        _ => None,
    };
    match status {
        Some(429) => warn!("{}: rate limited by Discord", context),
        Some(code) => warn!("{} (HTTP {}): {}", context, code, err),
        None => debug!("{}: {}", context, err),
    }
    CommandError::Chat {
        message: err.to_string(),
        status,
    }
}
