use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionIdError {
    #[error("invalid session id {0:?}: expected a YYYY-MM-DD calendar date")]
    Invalid(String),
}

/// Identifier for one daily pipeline run: a UTC calendar date in `YYYY-MM-DD` form.
///
/// Every event payload carries the session id of the run it belongs to.
/// Multiple sessions may be in flight concurrently (e.g. a retried prior day
/// plus today), so all per-session state is keyed by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(NaiveDate);

impl SessionId {
    /// Parse and validate a `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, SessionIdError> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| SessionIdError::Invalid(s.to_string()))?;
        Ok(Self(date))
    }

    /// Session id for the current UTC calendar date.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_date() {
        let id = SessionId::parse("2024-05-01").unwrap();
        assert_eq!(id.to_string(), "2024-05-01");
        assert_eq!(id.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SessionId::parse("not-a-date").is_err());
        assert!(SessionId::parse("2024-13-01").is_err());
        assert!(SessionId::parse("2024/05/01").is_err());
        assert!(SessionId::parse("").is_err());
    }

    #[test]
    fn today_is_well_formed() {
        let id = SessionId::today();
        assert!(SessionId::parse(&id.to_string()).is_ok());
    }

    #[test]
    fn serde_roundtrip_through_string() {
        let id = SessionId::parse("2024-05-01").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2024-05-01\"");
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_rejects_invalid() {
        let result: Result<SessionId, _> = serde_json::from_str("\"yesterday\"");
        assert!(result.is_err());
    }
}
