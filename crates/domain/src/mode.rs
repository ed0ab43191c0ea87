use serde::{Deserialize, Serialize};

/// Which graph backend this process talks to. Parsed from configuration once
/// at startup and handed to the connection factory; read-only afterwards.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    Embedded,
    Remote,
}

impl BackendMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "embedded" | "mem" => Some(Self::Embedded),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Remote => "remote",
        }
    }
}
