use crate::escrow::model::{Escrow, EscrowStatus};

/// Client-side search over an already fetched escrow list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscrowFilter {
    /// Matched case-insensitively against id, amount and conditions.
    pub search: String,
    /// `None` matches every status.
    pub status: Option<EscrowStatus>,
}

impl EscrowFilter {
    pub fn new(search: impl Into<String>, status: Option<EscrowStatus>) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.status.is_none()
    }

    pub fn matches(&self, escrow: &Escrow) -> bool {
        self.matches_status(escrow) && self.matches_search(escrow)
    }

    pub fn apply<'a>(&self, escrows: &'a [Escrow]) -> Vec<&'a Escrow> {
        escrows.iter().filter(|escrow| self.matches(escrow)).collect()
    }

    fn matches_status(&self, escrow: &Escrow) -> bool {
        self.status
            .as_ref()
            .map_or(true, |status| *status == escrow.status)
    }

    fn matches_search(&self, escrow: &Escrow) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        escrow.id.to_string().contains(&term)
            || format_amount(escrow.amount).contains(&term)
            || escrow
                .conditions
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&term)
    }
}

/// Integral amounts print without a fractional part, so "1500" matches 1500.0.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        amount.to_string()
    }
}
