use serde::Deserialize;

use crate::escrow::model::{Escrow, EscrowStatus};

/// Number of escrows shown on the dashboard's recent list.
pub const RECENT_ESCROW_LIMIT: usize = 5;

/// Counters the backend may precompute alongside the escrow list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerSummary {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub active: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub disputed: Option<u64>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscrowSummary {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub disputed: u64,
    pub total_amount: f64,
}

impl EscrowSummary {
    pub fn from_escrows(escrows: &[Escrow]) -> Self {
        let count = |predicate: fn(&EscrowStatus) -> bool| {
            escrows
                .iter()
                .filter(|escrow| predicate(&escrow.status))
                .count() as u64
        };
        Self {
            total: escrows.len() as u64,
            active: count(EscrowStatus::is_active),
            completed: count(|status| *status == EscrowStatus::Released),
            disputed: count(|status| *status == EscrowStatus::Disputed),
            total_amount: escrows.iter().map(|escrow| escrow.amount).sum(),
        }
    }

    /// Computed counters, each overridden by the server's value when present.
    pub fn merged(escrows: &[Escrow], server: Option<&ServerSummary>) -> Self {
        let computed = Self::from_escrows(escrows);
        let Some(server) = server else {
            return computed;
        };
        Self {
            total: server.total.unwrap_or(computed.total),
            active: server.active.unwrap_or(computed.active),
            completed: server.completed.unwrap_or(computed.completed),
            disputed: server.disputed.unwrap_or(computed.disputed),
            total_amount: server.total_amount.unwrap_or(computed.total_amount),
        }
    }
}

/// Data backing the standard dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub recent: Vec<Escrow>,
    pub summary: EscrowSummary,
}

impl DashboardData {
    pub fn from_list(list: &crate::escrow::EscrowList) -> Self {
        Self {
            recent: list
                .escrows
                .iter()
                .take(RECENT_ESCROW_LIMIT)
                .cloned()
                .collect(),
            summary: EscrowSummary::merged(&list.escrows, list.server_summary.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::EscrowList;
    use serde_json::json;

    fn escrows() -> Vec<Escrow> {
        serde_json::from_value(json!([
            {"id": 1, "amount": 100.0, "status": "Pending"},
            {"id": 2, "amount": 200.0, "status": "Funded"},
            {"id": 3, "amount": 300.0, "status": "Released"},
            {"id": 4, "amount": 400.0, "status": "Disputed"},
            {"id": 5, "amount": 500.0, "status": "Cancelled"},
            {"id": 6, "amount": 600.0, "status": "Released"}
        ]))
        .unwrap()
    }

    #[test]
    fn counts_by_status() {
        let summary = EscrowSummary::from_escrows(&escrows());
        assert_eq!(
            summary,
            EscrowSummary {
                total: 6,
                active: 2,
                completed: 2,
                disputed: 1,
                total_amount: 2_100.0,
            }
        );
    }

    #[test]
    fn server_values_override_computed_ones() {
        let server = ServerSummary {
            total: Some(40),
            total_amount: Some(9_999.0),
            ..Default::default()
        };
        let summary = EscrowSummary::merged(&escrows(), Some(&server));
        assert_eq!(summary.total, 40);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.total_amount, 9_999.0);
    }

    #[test]
    fn dashboard_keeps_five_most_recent() {
        let list = EscrowList {
            escrows: escrows(),
            server_summary: None,
        };
        let dashboard = DashboardData::from_list(&list);
        assert_eq!(dashboard.recent.len(), RECENT_ESCROW_LIMIT);
        assert_eq!(dashboard.recent[0].id, 1);
        assert_eq!(dashboard.summary.total, 6);
    }
}
