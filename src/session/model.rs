use serde::{Deserialize, Serialize};

/// Profile returned by `GET /users/me`, cached next to the access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub activated: bool,
    #[serde(default)]
    pub role: UserRole,
}

impl UserProfile {
    /// "First Last", trimmed; `fallback` when both names are empty.
    pub fn display_name_or(&self, fallback: &str) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl From<String> for UserRole {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "admin" | "administrator" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl From<UserRole> for String {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::User => "user".to_string(),
            UserRole::Admin => "admin".to_string(),
        }
    }
}

/// Which dashboard a profile is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    Standard,
    Admin,
}

impl DashboardView {
    pub fn for_profile(profile: &UserProfile) -> Self {
        if profile.is_admin() {
            DashboardView::Admin
        } else {
            DashboardView::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// `initialize` has not run yet.
    Uninitialized,
    Unauthenticated,
    Authenticated(UserProfile),
    /// Background refresh gave up; the user has to sign in again.
    ReauthenticationRequired,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }
}
