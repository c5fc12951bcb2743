//! Severity scale shared by individual checks and the aggregate verdict

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Health severity, ordered from best to worst.
///
/// Only the relative order is meaningful. Combining two statuses always
/// keeps the worse one, see [`Status::worst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    #[default]
    Up,
    Unknown,
    Slow,
    Partial,
    Down,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Up,
        Status::Unknown,
        Status::Slow,
        Status::Partial,
        Status::Down,
    ];

    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::Unknown => "UNKNOWN",
            Status::Slow => "SLOW",
            Status::Partial => "PARTIAL",
            Status::Down => "DOWN",
        }
    }

    /// Response code for an aggregate status.
    ///
    /// UNKNOWN answers 200 for compatibility with existing probe consumers.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Status::Up | Status::Unknown => StatusCode::OK,
            Status::Slow => StatusCode::MULTI_STATUS,
            Status::Partial | Status::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn is_degraded(&self) -> bool {
        *self > Status::Unknown
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    /// Never fails: unrecognized input reads as `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Status::Up,
            "SLOW" => Status::Slow,
            "PARTIAL" => Status::Partial,
            "DOWN" => Status::Down,
            _ => Status::Unknown,
        };
        Ok(status)
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Status::Unknown))
    }
}

/// Which question a probe request is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeType {
    /// Should the process keep running.
    Liveness,
    /// Should traffic be routed to the process right now.
    Readiness,
}

impl ProbeType {
    pub const ALL: [ProbeType; 2] = [ProbeType::Liveness, ProbeType::Readiness];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeType::Liveness => "liveness",
            ProbeType::Readiness => "readiness",
        }
    }
}

impl fmt::Display for ProbeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
