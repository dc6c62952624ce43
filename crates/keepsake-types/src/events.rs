use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::Visibility;
use crate::models::CollectionKind;

/// Change notices fanned out by the dispatcher after every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Added { collection: CollectionKind, id: Uuid },
    Deleted { collection: CollectionKind, id: Uuid },
}

impl StoreEvent {
    pub fn collection(&self) -> CollectionKind {
        match self {
            Self::Added { collection, .. } | Self::Deleted { collection, .. } => *collection,
        }
    }
}

/// A render target on the client page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Pane {
    /// The full list of a collection, e.g. `list:letters`.
    List(CollectionKind),
    /// Today's reminder.
    Today,
    /// The pinned (or else latest) letter on the dashboard.
    FeaturedLetter,
    /// Memory photos on the dashboard.
    Collage,
}

impl From<Pane> for String {
    fn from(pane: Pane) -> Self {
        match pane {
            Pane::List(kind) => format!("list:{}", kind.name()),
            Pane::Today => "today".into(),
            Pane::FeaturedLetter => "featured_letter".into(),
            Pane::Collage => "collage".into(),
        }
    }
}

impl TryFrom<String> for Pane {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "today" => Ok(Pane::Today),
            "featured_letter" => Ok(Pane::FeaturedLetter),
            "collage" => Ok(Pane::Collage),
            other => other
                .strip_prefix("list:")
                .and_then(CollectionKind::from_name)
                .map(Pane::List)
                .ok_or_else(|| format!("unknown pane '{}'", other)),
        }
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Identify succeeded and the principal is allowed in.
    Ready { who: String, visibility: Visibility },

    /// Gate state changed (not allowed, or signed out). No data follows.
    Gate { who: String, visibility: Visibility },

    /// Replace the contents of a pane.
    Render { pane: Pane, html: String },

    /// A short, non-fatal status for the user.
    Notice { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Start live queries for these collections
    Subscribe { collections: Vec<CollectionKind> },

    /// Cancel live queries for these collections
    Unsubscribe { collections: Vec<CollectionKind> },

    /// Advance today's pick by one
    PickAnother,

    /// Flip the local reveal state of a hidden message
    ToggleReveal { id: Uuid },

    /// Delete a record. Ignored unless the user confirmed the prompt.
    Delete {
        collection: CollectionKind,
        id: Uuid,
        confirmed: bool,
    },

    SignOut,
}
