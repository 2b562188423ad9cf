use serde::Serialize;
use std::fmt::Display;

/// Terminal outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The code points at a live destination.
    Resolved(String),
    /// The code was found but its expiration has passed.
    Expired,
    /// Neither a self-encoded token nor a registry entry.
    NotFound,
    /// The code was empty.
    InvalidInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionKind {
    Resolved,
    Expired,
    NotFound,
    InvalidInput,
}

/// Flat, serializable form of a [`Resolution`], for UI collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub kind: ResolutionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
}

pub const TITLE_REDIRECTING: &str = "Redirecting...";
pub const TITLE_LINK_ISSUE: &str = "Link Issue";

impl Resolution {
    pub fn kind(&self) -> ResolutionKind {
        match self {
            Resolution::Resolved(_) => ResolutionKind::Resolved,
            Resolution::Expired => ResolutionKind::Expired,
            Resolution::NotFound => ResolutionKind::NotFound,
            Resolution::InvalidInput => ResolutionKind::InvalidInput,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn destination_url(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(url) => Some(url),
            _ => None,
        }
    }

    /// Page title: "Redirecting..." exactly when resolved.
    pub fn title(&self) -> &'static str {
        if self.is_resolved() {
            TITLE_REDIRECTING
        } else {
            TITLE_LINK_ISSUE
        }
    }

    /// One-line status text for the user.
    pub fn message(&self) -> &'static str {
        match self {
            Resolution::Resolved(_) => "Taking you to your destination.",
            Resolution::Expired => "This link has expired.",
            Resolution::NotFound => "This link does not exist.",
            Resolution::InvalidInput => "Invalid short code.",
        }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved(url) => write!(f, "resolved to {url}"),
            Resolution::Expired => f.write_str("expired"),
            Resolution::NotFound => f.write_str("not found"),
            Resolution::InvalidInput => f.write_str("invalid input"),
        }
    }
}

impl From<Resolution> for ResolutionResult {
    fn from(value: Resolution) -> Self {
        let kind = value.kind();
        let destination_url = match value {
            Resolution::Resolved(url) => Some(url),
            _ => None,
        };
        Self {
            kind,
            destination_url,
        }
    }
}
