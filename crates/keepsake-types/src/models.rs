use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The named collections a journal is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    #[serde(rename = "dailyReminders")]
    Reminders,
    #[serde(rename = "letters")]
    Letters,
    #[serde(rename = "hiddenMessages")]
    HiddenMessages,
    #[serde(rename = "memories")]
    Memories,
    #[serde(rename = "songs")]
    Songs,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        Self::Reminders,
        Self::Letters,
        Self::HiddenMessages,
        Self::Memories,
        Self::Songs,
    ];

    /// Stable collection name, shared by the store and the gateway protocol.
    pub fn name(self) -> &'static str {
        match self {
            Self::Reminders => "dailyReminders",
            Self::Letters => "letters",
            Self::HiddenMessages => "hiddenMessages",
            Self::Memories => "memories",
            Self::Songs => "songs",
        }
    }

    /// URL segment used by the REST routes.
    pub fn path(self) -> &'static str {
        match self {
            Self::Reminders => "reminders",
            Self::Letters => "letters",
            Self::HiddenMessages => "hidden",
            Self::Memories => "memories",
            Self::Songs => "songs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An authenticated identity as reported by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

/// Fields every record carries. Assigned by the server at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub text: String,
    /// Scheduling tag. `None` means the reminder can show up on any day.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub body: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenKind {
    Hard,
    Soft,
}

impl HiddenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    /// Anything that is not "hard" is treated as a soft confession.
    pub fn parse(s: &str) -> Self {
        if s == "hard" { Self::Hard } else { Self::Soft }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenMessage {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub kind: HiddenKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub link: String,
}
