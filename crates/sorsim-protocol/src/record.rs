//! The log-record grammar.
//!
//! One record per line, semicolon-separated so the file imports cleanly into
//! spreadsheets and is trivial for the terminal renderer to tail:
//!
//! ```text
//! <simMinute>;<id>;[wR=<in>/<cap>;rQ=<n>;tQ=<n>;sQ=<n>;wSem=<n>;sSem=<n>;]<role>;<text>
//! ```
//!
//! The metrics block is optional; senders that have a metrics context attach
//! it, early-bootstrap senders do not. A record whose text begins with
//! [`LOG_END_SENTINEL`] terminates the logger.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::roles::{ActorId, Role};

/// Text prefix that shuts the logger down.
pub const LOG_END_SENTINEL: &str = "END";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseRecordError {
    #[error("record has fewer than 4 fields")]
    TooFewFields,

    #[error("invalid integer field `{0}`")]
    InvalidNumber(String),

    #[error("invalid metrics fragment `{0}`")]
    InvalidMetrics(String),

    #[error("unknown role tag `{0}`")]
    UnknownRole(String),
}

/// Queue/semaphore snapshot attached to a log record by its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsBlock {
    /// Persons currently inside the waiting room.
    pub inside: u32,
    /// Waiting-room capacity N.
    pub capacity: u32,
    /// Registration channel depth.
    pub reg_queue: u32,
    /// Triage channel depth.
    pub triage_queue: u32,
    /// Combined specialist channel depth.
    pub spec_queue: u32,
    /// Free seats according to the waiting-room semaphore.
    pub wait_sem: u32,
    /// State-lock availability probe (1 free, 0 held).
    pub state_sem: u32,
}

impl fmt::Display for MetricsBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wR={}/{};rQ={};tQ={};sQ={};wSem={};sSem={}",
            self.inside,
            self.capacity,
            self.reg_queue,
            self.triage_queue,
            self.spec_queue,
            self.wait_sem,
            self.state_sem
        )
    }
}

impl MetricsBlock {
    /// Parse the six `key=value` fragments of a metrics block.
    ///
    /// `fields` must hold exactly the fragments between the id and the role
    /// tag, in grammar order.
    fn parse_fields(fields: &[&str]) -> Result<MetricsBlock, ParseRecordError> {
        fn tail<'a>(field: &'a str, prefix: &str) -> Result<&'a str, ParseRecordError> {
            field
                .strip_prefix(prefix)
                .ok_or_else(|| ParseRecordError::InvalidMetrics(field.to_string()))
        }
        fn num(raw: &str) -> Result<u32, ParseRecordError> {
            raw.parse()
                .map_err(|_| ParseRecordError::InvalidNumber(raw.to_string()))
        }

        if fields.len() != 6 {
            return Err(ParseRecordError::InvalidMetrics(fields.join(";")));
        }
        let (inside_raw, cap_raw) = tail(fields[0], "wR=")?
            .split_once('/')
            .ok_or_else(|| ParseRecordError::InvalidMetrics(fields[0].to_string()))?;
        Ok(MetricsBlock {
            inside: num(inside_raw)?,
            capacity: num(cap_raw)?,
            reg_queue: num(tail(fields[1], "rQ=")?)?,
            triage_queue: num(tail(fields[2], "tQ=")?)?,
            spec_queue: num(tail(fields[3], "sQ=")?)?,
            wait_sem: num(tail(fields[4], "wSem=")?)?,
            state_sem: num(tail(fields[5], "sSem=")?)?,
        })
    }
}

/// One line of the simulation event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimLogRecord {
    pub sim_minute: u64,
    pub source: ActorId,
    pub metrics: Option<MetricsBlock>,
    pub role: Role,
    pub text: String,
}

impl SimLogRecord {
    pub fn is_end_sentinel(&self) -> bool {
        self.text.starts_with(LOG_END_SENTINEL)
    }
}

impl fmt::Display for SimLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};", self.sim_minute, self.source)?;
        if let Some(metrics) = &self.metrics {
            write!(f, "{};", metrics)?;
        }
        write!(f, "{};{}", self.role, self.text)
    }
}

impl FromStr for SimLogRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<SimLogRecord, ParseRecordError> {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 4 {
            return Err(ParseRecordError::TooFewFields);
        }
        let sim_minute: u64 = fields[0]
            .parse()
            .map_err(|_| ParseRecordError::InvalidNumber(fields[0].to_string()))?;
        let source: u64 = fields[1]
            .parse()
            .map_err(|_| ParseRecordError::InvalidNumber(fields[1].to_string()))?;

        let (metrics, role_idx) = if fields[2].starts_with("wR=") {
            if fields.len() < 10 {
                return Err(ParseRecordError::TooFewFields);
            }
            (Some(MetricsBlock::parse_fields(&fields[2..8])?), 8)
        } else {
            (None, 2)
        };

        let role = Role::from_label(fields[role_idx])
            .ok_or_else(|| ParseRecordError::UnknownRole(fields[role_idx].to_string()))?;
        // Text is everything after the role tag; it may itself contain ';'.
        let text = fields[role_idx + 1..].join(";");

        Ok(SimLogRecord {
            sim_minute,
            source: ActorId::from_u64(source),
            metrics,
            role,
            text,
        })
    }
}
