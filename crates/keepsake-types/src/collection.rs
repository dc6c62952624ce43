use std::fmt::Debug;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::models::{
    CollectionKind, HiddenKind, HiddenMessage, Letter, Memory, RecordMeta, Reminder, Song,
};

/// One sort key of a collection's display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub const fn desc(column: &'static str) -> Self {
        Self { column, descending: true }
    }
}

const NEWEST_FIRST: &[OrderBy] = &[OrderBy::desc("created_at")];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Nothing worth saving. Carries the status line shown to the writer.
    #[error("{0}")]
    Empty(&'static str),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

const WRITE_SOMETHING: &str = "Write something first 💗";

/// A journal collection: its name, record shape, draft shape and display order.
///
/// Everything that differs between reminders, letters, hidden messages, memories
/// and songs is expressed through this trait so the store, the live queries and
/// the HTTP handlers are written once.
pub trait Collection: Send + Sync + 'static {
    const KIND: CollectionKind;
    const ORDER: &'static [OrderBy];
    /// Status line reported after a successful write.
    const SAVED: &'static str;

    type Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Draft: Debug + DeserializeOwned + Send + 'static;

    /// Trim and check a draft, then stamp it into a record.
    fn build(draft: Self::Draft, meta: RecordMeta) -> Result<Self::Record, DraftError>;

    fn meta(record: &Self::Record) -> &RecordMeta;
}

// -- Drafts --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewReminder {
    #[serde(default)]
    pub text: String,
    /// Empty for an unscheduled reminder.
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewLetter {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewHiddenMessage {
    #[serde(default = "soft")]
    pub kind: HiddenKind,
    #[serde(default)]
    pub text: String,
}

fn soft() -> HiddenKind {
    HiddenKind::Soft
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMemory {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSong {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

// -- Collections --

pub struct Reminders;
pub struct Letters;
pub struct HiddenMessages;
pub struct Memories;
pub struct Songs;

impl Collection for Reminders {
    const KIND: CollectionKind = CollectionKind::Reminders;
    const ORDER: &'static [OrderBy] = NEWEST_FIRST;
    const SAVED: &'static str = "Saved 💗";

    type Record = Reminder;
    type Draft = NewReminder;

    fn build(draft: NewReminder, meta: RecordMeta) -> Result<Reminder, DraftError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(DraftError::Empty(WRITE_SOMETHING));
        }

        let date = match draft.date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| DraftError::InvalidDate(raw.to_string()))?,
            ),
        };

        Ok(Reminder { meta, text: text.to_string(), date })
    }

    fn meta(record: &Reminder) -> &RecordMeta {
        &record.meta
    }
}

impl Collection for Letters {
    const KIND: CollectionKind = CollectionKind::Letters;
    const ORDER: &'static [OrderBy] = &[OrderBy::desc("pinned"), OrderBy::desc("created_at")];
    const SAVED: &'static str = "Sealed with love 💌✨";

    type Record = Letter;
    type Draft = NewLetter;

    fn build(draft: NewLetter, meta: RecordMeta) -> Result<Letter, DraftError> {
        let title = draft.title.trim();
        let body = draft.body.trim();
        if title.is_empty() && body.is_empty() {
            return Err(DraftError::Empty(WRITE_SOMETHING));
        }

        Ok(Letter {
            meta,
            title: title.to_string(),
            body: body.to_string(),
            pinned: draft.pinned,
        })
    }

    fn meta(record: &Letter) -> &RecordMeta {
        &record.meta
    }
}

impl Collection for HiddenMessages {
    const KIND: CollectionKind = CollectionKind::HiddenMessages;
    const ORDER: &'static [OrderBy] = NEWEST_FIRST;
    const SAVED: &'static str = "Locked 🔒";

    type Record = HiddenMessage;
    type Draft = NewHiddenMessage;

    fn build(draft: NewHiddenMessage, meta: RecordMeta) -> Result<HiddenMessage, DraftError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(DraftError::Empty(WRITE_SOMETHING));
        }

        Ok(HiddenMessage { meta, kind: draft.kind, text: text.to_string() })
    }

    fn meta(record: &HiddenMessage) -> &RecordMeta {
        &record.meta
    }
}

impl Collection for Memories {
    const KIND: CollectionKind = CollectionKind::Memories;
    const ORDER: &'static [OrderBy] = NEWEST_FIRST;
    const SAVED: &'static str = "Saved 💗";

    type Record = Memory;
    type Draft = NewMemory;

    fn build(draft: NewMemory, meta: RecordMeta) -> Result<Memory, DraftError> {
        let title = draft.title.trim();
        let description = draft.description.trim();
        let image_url = draft.image_url.trim();
        if title.is_empty() && description.is_empty() && image_url.is_empty() {
            return Err(DraftError::Empty("Add something first 💗"));
        }

        Ok(Memory {
            meta,
            title: title.to_string(),
            description: description.to_string(),
            image_url: image_url.to_string(),
        })
    }

    fn meta(record: &Memory) -> &RecordMeta {
        &record.meta
    }
}

impl Collection for Songs {
    const KIND: CollectionKind = CollectionKind::Songs;
    const ORDER: &'static [OrderBy] = NEWEST_FIRST;
    const SAVED: &'static str = "Saved 💗";

    type Record = Song;
    type Draft = NewSong;

    fn build(draft: NewSong, meta: RecordMeta) -> Result<Song, DraftError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DraftError::Empty(WRITE_SOMETHING));
        }

        Ok(Song { meta, title: title.to_string(), link: draft.link.trim().to_string() })
    }

    fn meta(record: &Song) -> &RecordMeta {
        &record.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn meta() -> RecordMeta {
        RecordMeta {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_name: "Mi".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reminder_trims_and_parses_date() {
        let draft = NewReminder { text: "  drink water  ".into(), date: "2024-01-01".into() };
        let r = Reminders::build(draft, meta()).unwrap();
        assert_eq!(r.text, "drink water");
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 1));

        let draft = NewReminder { text: "hug".into(), date: "   ".into() };
        assert_eq!(Reminders::build(draft, meta()).unwrap().date, None);
    }

    #[test]
    fn reminder_rejects_blank_text_and_bad_date() {
        let blank = NewReminder { text: " \n ".into(), date: String::new() };
        assert_eq!(
            Reminders::build(blank, meta()).unwrap_err(),
            DraftError::Empty("Write something first 💗")
        );

        let bad = NewReminder { text: "x".into(), date: "01/02/2024".into() };
        assert!(matches!(
            Reminders::build(bad, meta()),
            Err(DraftError::InvalidDate(_))
        ));
    }

    #[test]
    fn letter_needs_title_or_body() {
        assert!(Letters::build(NewLetter::default(), meta()).is_err());

        let only_title = NewLetter { title: "Hi".into(), ..Default::default() };
        assert!(Letters::build(only_title, meta()).is_ok());
    }

    #[test]
    fn memory_accepts_image_only() {
        let draft = NewMemory { image_url: "https://x/y.jpg".into(), ..Default::default() };
        assert!(Memories::build(draft, meta()).is_ok());
        assert_eq!(
            Memories::build(NewMemory::default(), meta()).unwrap_err().to_string(),
            "Add something first 💗"
        );
    }

    #[test]
    fn hidden_kind_defaults_to_soft() {
        let draft: NewHiddenMessage = serde_json::from_str(r#"{"text":"psst"}"#).unwrap();
        assert_eq!(draft.kind, HiddenKind::Soft);

        let draft: NewHiddenMessage =
            serde_json::from_str(r#"{"kind":"hard","text":"oof"}"#).unwrap();
        assert_eq!(draft.kind, HiddenKind::Hard);
    }

    #[test]
    fn missing_text_is_an_empty_draft() {
        let song: NewSong = serde_json::from_str(r#"{"link":""}"#).unwrap();
        assert_eq!(
            Songs::build(song, meta()).unwrap_err(),
            DraftError::Empty("Write something first 💗")
        );

        let reminder: NewReminder = serde_json::from_str("{}").unwrap();
        assert!(matches!(Reminders::build(reminder, meta()), Err(DraftError::Empty(_))));

        let hidden: NewHiddenMessage = serde_json::from_str(r#"{"kind":"hard"}"#).unwrap();
        assert!(matches!(HiddenMessages::build(hidden, meta()), Err(DraftError::Empty(_))));
    }

    #[test]
    fn letters_sort_pinned_first() {
        assert_eq!(Letters::ORDER[0].column, "pinned");
        assert!(Letters::ORDER.iter().all(|o| o.descending));
    }
}
