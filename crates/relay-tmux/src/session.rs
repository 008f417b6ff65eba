//! Tmux session listing.

use chrono::{DateTime, TimeZone, Utc};

use crate::{Result, TmuxError};

/// An open tmux session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxSession {
    /// Session name.
    pub name: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Whether a client is attached.
    pub attached: bool,
}

impl TmuxSession {
    /// Parses one `list-sessions` line.
    ///
    /// Expected format: `name:created_timestamp:attached_count`
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.rsplitn(3, ':');
        let (attached, created, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(c), Some(n)) if !n.is_empty() => (a, c, n),
            _ => {
                return Err(TmuxError::BadListing(format!(
                    "invalid session format: {}",
                    line
                )))
            }
        };

        let timestamp: i64 = created
            .trim()
            .parse()
            .map_err(|_| TmuxError::BadListing(format!("invalid timestamp: {}", created)))?;
        let created_at = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .ok_or_else(|| TmuxError::BadListing(format!("invalid timestamp: {}", timestamp)))?;

        let attached: u32 = attached
            .trim()
            .parse()
            .map_err(|_| TmuxError::BadListing(format!("invalid attach count: {}", attached)))?;

        Ok(Self {
            name: name.to_string(),
            created_at,
            attached: attached > 0,
        })
    }
}
