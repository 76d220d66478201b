use std::fmt;

use crate::escrow::model::CreateEscrowRequest;
use crate::session::UserProfile;

pub const MIN_ESCROW_AMOUNT: f64 = 100.0;
pub const MAX_ESCROW_AMOUNT: f64 = 1_000_000.0;

/// Seller picked through user search.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerRef {
    pub id: i64,
    pub name: String,
    /// `None` when the search result did not include the activation flag.
    pub activated: Option<bool>,
}

/// Form input of the escrow creation flow, before it becomes a
/// [`CreateEscrowRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EscrowDraft {
    pub seller: Option<SellerRef>,
    pub amount: Option<f64>,
    pub item_description: Option<String>,
    pub delivery_date: Option<String>,
    pub delivery_method: Option<String>,
    pub payment_release_condition: Option<String>,
    pub inspection_period_days: Option<u32>,
    pub refund_policy: Option<String>,
    pub governing_law: Option<String>,
    pub contact_details: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EscrowValidationError {
    BuyerNotActivated,
    SellerNotSelected,
    InvalidAmount(f64),
    AmountBelowMinimum(f64),
    AmountAboveMaximum(f64),
    SelfEscrow,
    SellerNotActivated,
}

impl fmt::Display for EscrowValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscrowValidationError::BuyerNotActivated => write!(
                f,
                "Your account is not activated. Please check your email and activate your account."
            ),
            EscrowValidationError::SellerNotSelected => {
                write!(f, "Please search and select a seller to create an escrow.")
            }
            EscrowValidationError::InvalidAmount(_) => write!(f, "Please enter a valid amount"),
            EscrowValidationError::AmountBelowMinimum(_) => {
                write!(f, "Minimum amount is {MIN_ESCROW_AMOUNT:.0} ETB")
            }
            EscrowValidationError::AmountAboveMaximum(_) => {
                write!(f, "Maximum amount is 1,000,000 ETB")
            }
            EscrowValidationError::SelfEscrow => write!(
                f,
                "You cannot create an escrow with yourself as the seller"
            ),
            EscrowValidationError::SellerNotActivated => write!(
                f,
                "The selected seller's account is not activated. Please choose a different seller."
            ),
        }
    }
}

impl std::error::Error for EscrowValidationError {}

impl EscrowDraft {
    pub fn new(seller: SellerRef, amount: f64) -> Self {
        Self {
            seller: Some(seller),
            amount: Some(amount),
            ..Default::default()
        }
    }

    /// Checks the draft against the buyer's profile. The first failing rule wins.
    pub fn validate(&self, buyer: &UserProfile) -> Result<(), EscrowValidationError> {
        if !buyer.activated {
            return Err(EscrowValidationError::BuyerNotActivated);
        }

        let seller = self
            .seller
            .as_ref()
            .ok_or(EscrowValidationError::SellerNotSelected)?;

        let amount = self.amount.unwrap_or(0.0);
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EscrowValidationError::InvalidAmount(amount));
        }
        if amount < MIN_ESCROW_AMOUNT {
            return Err(EscrowValidationError::AmountBelowMinimum(amount));
        }
        if amount > MAX_ESCROW_AMOUNT {
            return Err(EscrowValidationError::AmountAboveMaximum(amount));
        }

        if seller.id == buyer.id {
            return Err(EscrowValidationError::SelfEscrow);
        }
        if seller.activated == Some(false) {
            return Err(EscrowValidationError::SellerNotActivated);
        }
        Ok(())
    }

    /// Validates and builds the request body, composing the conditions text.
    pub fn to_request(&self, buyer: &UserProfile) -> Result<CreateEscrowRequest, EscrowValidationError> {
        self.validate(buyer)?;
        let seller = self
            .seller
            .as_ref()
            .ok_or(EscrowValidationError::SellerNotSelected)?;
        Ok(CreateEscrowRequest {
            seller_id: seller.id,
            amount: self.amount.unwrap_or_default(),
            conditions: self.conditions_text(buyer),
        })
    }

    /// Human-readable agreement text sent as the escrow `conditions`.
    ///
    /// Always starts with the buyer and seller names; every other section is
    /// included only when its field is non-empty.
    pub fn conditions_text(&self, buyer: &UserProfile) -> String {
        let buyer_name = buyer.display_name_or("Buyer");
        let seller_name = self
            .seller
            .as_ref()
            .map(|seller| seller.name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or("Seller");

        let mut lines: Vec<String> = vec![
            format!("Buyer: {buyer_name}"),
            String::new(),
            format!("Seller: {seller_name}"),
            String::new(),
        ];

        if let Some(description) = present(&self.item_description) {
            lines.push("Item Description:".into());
            lines.push(description.into());
            lines.push(String::new());
        }

        let date = present(&self.delivery_date);
        let method = present(&self.delivery_method);
        if date.is_some() || method.is_some() {
            lines.push("Delivery:".into());
            if let Some(date) = date {
                lines.push(format!("- Date: {date}"));
            }
            if let Some(method) = method {
                lines.push(format!("- Method: {method}"));
            }
            lines.push(String::new());
        }

        if let Some(condition) = present(&self.payment_release_condition) {
            lines.push("Payment Release:".into());
            lines.push(condition.into());
            lines.push(String::new());
        }

        if let Some(days) = self.inspection_period_days.filter(|days| *days > 0) {
            lines.push(format!("Inspection Period: {days} day(s)"));
            lines.push(String::new());
        }

        if let Some(policy) = present(&self.refund_policy) {
            lines.push("Refund Policy:".into());
            lines.push(policy.into());
            lines.push(String::new());
        }

        if let Some(law) = present(&self.governing_law) {
            lines.push(format!("Governing Law: {law}"));
            lines.push(String::new());
        }

        if let Some(contact) = present(&self.contact_details) {
            lines.push(format!("Contact: {contact}"));
            lines.push(String::new());
        }

        if let Some(notes) = present(&self.additional_notes) {
            lines.push("Additional Notes:".into());
            lines.push(notes.into());
        }

        lines.join("\n")
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}
