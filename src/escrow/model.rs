use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escrow::summary::ServerSummary;
use crate::util::deserialize_optional_timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: i64,
    #[serde(default)]
    pub buyer_id: Option<i64>,
    #[serde(default)]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: EscrowStatus,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle state as reported by the backend. Unknown states are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EscrowStatus {
    #[default]
    Pending,
    Funded,
    Released,
    Cancelled,
    Refunded,
    Disputed,
    Other(String),
}

impl EscrowStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EscrowStatus::Pending => "Pending",
            EscrowStatus::Funded => "Funded",
            EscrowStatus::Released => "Released",
            EscrowStatus::Cancelled => "Cancelled",
            EscrowStatus::Refunded => "Refunded",
            EscrowStatus::Disputed => "Disputed",
            EscrowStatus::Other(value) => value,
        }
    }

    /// Funds are committed and the escrow has not settled yet.
    pub fn is_active(&self) -> bool {
        matches!(self, EscrowStatus::Pending | EscrowStatus::Funded)
    }
}

impl From<String> for EscrowStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => EscrowStatus::Pending,
            "Funded" => EscrowStatus::Funded,
            "Released" => EscrowStatus::Released,
            "Cancelled" => EscrowStatus::Cancelled,
            "Refunded" => EscrowStatus::Refunded,
            "Disputed" => EscrowStatus::Disputed,
            _ => EscrowStatus::Other(value),
        }
    }
}

impl From<EscrowStatus> for String {
    fn from(value: EscrowStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateEscrowRequest {
    pub seller_id: i64,
    pub amount: f64,
    pub conditions: String,
}

/// `GET /escrows/my` answers either with a bare array or with an envelope
/// that may also carry precomputed counters.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum EscrowListPayload {
    List(Vec<Escrow>),
    Envelope {
        #[serde(default)]
        escrows: Vec<Escrow>,
        #[serde(default)]
        summary: Option<ServerSummary>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscrowList {
    pub escrows: Vec<Escrow>,
    pub server_summary: Option<ServerSummary>,
}

impl From<EscrowListPayload> for EscrowList {
    fn from(payload: EscrowListPayload) -> Self {
        match payload {
            EscrowListPayload::List(escrows) => EscrowList {
                escrows,
                server_summary: None,
            },
            EscrowListPayload::Envelope { escrows, summary } => EscrowList {
                escrows,
                server_summary: summary,
            },
        }
    }
}
