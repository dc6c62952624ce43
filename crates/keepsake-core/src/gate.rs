use std::collections::HashSet;

use keepsake_types::api::Visibility;
use keepsake_types::models::Principal;

/// The two people this journal belongs to.
pub const DEFAULT_ALLOWED_EMAILS: [&str; 2] = ["mi423ma@gmail.com", "niclaskuzio@icloud.com"];

/// Lower-cased, whitespace-trimmed form used for every comparison.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The single allow-list shared by every surface that shows or writes content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = emails
            .into_iter()
            .map(|e| canonical_email(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.allowed.contains(&canonical_email(email))
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn decide(&self, principal: Option<&Principal>) -> GateDecision {
        let Some(principal) = principal else {
            return GateDecision::SignedOut;
        };

        let email = canonical_email(&principal.email);
        if !self.allowed.contains(&email) {
            return GateDecision::NotAllowed { email };
        }

        let name = principal.display_name.trim();
        let display = if name.is_empty() { email } else { name.to_string() };
        GateDecision::Allowed { display }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EMAILS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    SignedOut,
    NotAllowed { email: String },
    Allowed { display: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Status line next to the sign-in controls.
    pub fn who_line(&self) -> String {
        match self {
            Self::SignedOut => String::new(),
            Self::NotAllowed { email } => format!("Signed in as {} (not allowed)", email),
            Self::Allowed { display } => format!("Signed in as {}", display),
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Self::SignedOut => Visibility {
                app_area: false,
                login_button: true,
                logout_button: false,
            },
            Self::NotAllowed { .. } => Visibility {
                app_area: false,
                login_button: false,
                logout_button: true,
            },
            Self::Allowed { .. } => Visibility {
                app_area: true,
                login_button: false,
                logout_button: true,
            },
        }
    }
}
