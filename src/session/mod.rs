//! Session lifecycle: persisted credentials, startup restore and proactive
//! token refresh.

mod api;
pub mod backend;
pub(crate) mod model;
pub mod persistence;
pub mod scheduler;
pub mod token;

pub use api::{Session, SessionBuilder};
pub use backend::{RefreshTokenResponse, SessionBackend};
pub use model::{DashboardView, SessionState, UserProfile, UserRole};
pub use persistence::{FileStorage, InMemoryStorage, SessionStorage, StoredSession};
pub use scheduler::{RefreshScheduler, SchedulerConfig, SchedulerState};
pub use token::{
    is_token_expired, is_token_expired_at, optimal_refresh_time, optimal_refresh_time_at,
    remaining_validity, token_expiry, DEFAULT_EXPIRY_SKEW,
};
