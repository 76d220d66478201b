//! Maps escrow creation failures to the message shown to the user.
//!
//! The backend's machine-readable `code` drives the classification. Older
//! deployments only send prose, so when no code is present the message text
//! is inspected as a fallback.

use crate::error::ClientError;
use crate::escrow::draft::EscrowValidationError;

#[derive(Debug, Clone, PartialEq)]
pub enum EscrowErrorKind {
    Validation(EscrowValidationError),
    BuyerNotActivated,
    SellerNotActivated,
    AccountNotActivated,
    BuyerBankDetails,
    SellerBankDetails,
    BankDetails,
    AccessDenied,
    Unauthenticated,
    Network,
    Other,
}

impl EscrowErrorKind {
    pub fn classify(error: &ClientError) -> Self {
        match error {
            ClientError::Validation(err) => EscrowErrorKind::Validation(err.clone()),
            ClientError::Network(_) => EscrowErrorKind::Network,
            ClientError::Unauthenticated(_) | ClientError::InvalidToken(_) => {
                EscrowErrorKind::Unauthenticated
            }
            ClientError::Http {
                status,
                code: Some(code),
                ..
            } => Self::from_code(code).unwrap_or(match status {
                401 => EscrowErrorKind::Unauthenticated,
                403 => EscrowErrorKind::AccessDenied,
                _ => EscrowErrorKind::Other,
            }),
            ClientError::Http {
                status,
                code: None,
                message,
            } => Self::from_legacy_message(*status, message),
            _ => EscrowErrorKind::Other,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "buyer_not_activated" => EscrowErrorKind::BuyerNotActivated,
            "seller_not_activated" => EscrowErrorKind::SellerNotActivated,
            "account_not_activated" => EscrowErrorKind::AccountNotActivated,
            "buyer_bank_details" => EscrowErrorKind::BuyerBankDetails,
            "seller_bank_details" => EscrowErrorKind::SellerBankDetails,
            "bank_details_incompatible" => EscrowErrorKind::BankDetails,
            "forbidden" => EscrowErrorKind::AccessDenied,
            "unauthenticated" => EscrowErrorKind::Unauthenticated,
            _ => return None,
        };
        Some(kind)
    }

    fn from_legacy_message(status: u16, message: &str) -> Self {
        if status == 401 {
            return EscrowErrorKind::Unauthenticated;
        }
        if status == 403 {
            return if message.contains("Buyer account is not activated") {
                EscrowErrorKind::BuyerNotActivated
            } else if message.contains("Seller account is not activated") {
                EscrowErrorKind::SellerNotActivated
            } else if message.contains("not activated") {
                EscrowErrorKind::AccountNotActivated
            } else {
                EscrowErrorKind::AccessDenied
            };
        }

        let lower = message.to_lowercase();
        if lower.contains("bank") || lower.contains("account") {
            if lower.contains("buyer") || lower.contains("your") {
                EscrowErrorKind::BuyerBankDetails
            } else if lower.contains("seller") {
                EscrowErrorKind::SellerBankDetails
            } else {
                EscrowErrorKind::BankDetails
            }
        } else {
            EscrowErrorKind::Other
        }
    }

    /// Text for a toast. `detail` is the backend message, if any.
    pub fn user_message(&self, detail: Option<&str>) -> String {
        let detail = detail.unwrap_or("Failed to create escrow");
        match self {
            EscrowErrorKind::Validation(err) => err.to_string(),
            EscrowErrorKind::BuyerNotActivated => "Your account appears to be inactive. Please check your profile activation status or contact support.".to_string(),
            EscrowErrorKind::SellerNotActivated => "The selected seller's account is not activated. Please choose a different seller or contact them to activate their account.".to_string(),
            EscrowErrorKind::AccountNotActivated => "Account Activation Issue: One or both accounts are not properly activated. Please verify activation status.".to_string(),
            EscrowErrorKind::BuyerBankDetails => format!("Buyer Bank Details Issue: {detail}"),
            EscrowErrorKind::SellerBankDetails => format!("Seller Bank Details Issue: {detail}"),
            EscrowErrorKind::BankDetails => format!(
                "Bank Details Compatibility Issue: {detail}. Please check both buyer and seller bank account details."
            ),
            EscrowErrorKind::AccessDenied => format!("Access Denied: {detail}"),
            EscrowErrorKind::Unauthenticated => "You must be logged in to create an escrow".to_string(),
            EscrowErrorKind::Network => "Network error. Please check your connection.".to_string(),
            EscrowErrorKind::Other => detail.to_string(),
        }
    }
}

/// Convenience wrapper returning the toast text for a failed creation.
pub fn escrow_error_message(error: &ClientError) -> String {
    let detail = match error {
        ClientError::Http { message, .. } => Some(message.as_str()),
        _ => None,
    };
    EscrowErrorKind::classify(error).user_message(detail)
}
