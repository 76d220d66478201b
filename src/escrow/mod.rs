//! Escrow records and the client-side rules applied around them.

mod draft;
mod error_kind;
mod filter;
mod model;
mod summary;

#[doc(inline)]
pub use draft::{
    EscrowDraft, EscrowValidationError, SellerRef, MAX_ESCROW_AMOUNT, MIN_ESCROW_AMOUNT,
};

#[doc(inline)]
pub use error_kind::{escrow_error_message, EscrowErrorKind};

#[doc(inline)]
pub use filter::EscrowFilter;

#[doc(inline)]
pub use model::{CreateEscrowRequest, Escrow, EscrowList, EscrowStatus};

pub(crate) use model::EscrowListPayload;

#[doc(inline)]
pub use summary::{DashboardData, EscrowSummary, ServerSummary, RECENT_ESCROW_LIMIT};
