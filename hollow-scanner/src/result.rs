use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A wordlist entry together with its line position in the wordlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub position: usize,
    pub word: String,
}

impl Candidate {
    pub fn new(position: usize, word: impl Into<String>) -> Self {
        Self {
            position,
            word: word.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Found,
    NotFound,
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeStatus::Found => "found",
            ProbeStatus::NotFound => "not_found",
            ProbeStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Outcome of probing one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub url: String,
    pub status: ProbeStatus,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn with_status(candidate: Candidate, url: String, status: ProbeStatus, status_code: u16, elapsed: Duration) -> Self {
        Self {
            candidate,
            url,
            status,
            status_code: Some(status_code),
            error: None,
            elapsed,
        }
    }

    pub fn with_error(candidate: Candidate, url: String, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            candidate,
            url,
            status: ProbeStatus::Error,
            status_code: None,
            error: Some(error.into()),
            elapsed,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == ProbeStatus::Found
    }

    pub fn is_error(&self) -> bool {
        self.status == ProbeStatus::Error
    }
}
