use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use keepsake_types::collection::{HiddenMessages, Letters, Memories, Reminders, Songs};
use keepsake_types::events::Pane;
use keepsake_types::models::{CollectionKind, HiddenMessage, Letter, Memory, Reminder, Song};

use crate::clock::DayClock;
use crate::picker::pick_today;
use crate::render::{
    Render, RenderContext, render_collage, render_featured_letter, render_list, render_today,
};

/// A full, ordered result set for one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Reminders(Vec<Reminder>),
    Letters(Vec<Letter>),
    HiddenMessages(Vec<HiddenMessage>),
    Memories(Vec<Memory>),
    Songs(Vec<Song>),
}

impl Snapshot {
    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Reminders(_) => CollectionKind::Reminders,
            Self::Letters(_) => CollectionKind::Letters,
            Self::HiddenMessages(_) => CollectionKind::HiddenMessages,
            Self::Memories(_) => CollectionKind::Memories,
            Self::Songs(_) => CollectionKind::Songs,
        }
    }
}

/// Lifts a typed live-query result into a [`Snapshot`].
pub trait IntoSnapshot: Render {
    fn snapshot(records: Vec<Self::Record>) -> Snapshot;
}

impl IntoSnapshot for Reminders {
    fn snapshot(records: Vec<Reminder>) -> Snapshot {
        Snapshot::Reminders(records)
    }
}

impl IntoSnapshot for Letters {
    fn snapshot(records: Vec<Letter>) -> Snapshot {
        Snapshot::Letters(records)
    }
}

impl IntoSnapshot for HiddenMessages {
    fn snapshot(records: Vec<HiddenMessage>) -> Snapshot {
        Snapshot::HiddenMessages(records)
    }
}

impl IntoSnapshot for Memories {
    fn snapshot(records: Vec<Memory>) -> Snapshot {
        Snapshot::Memories(records)
    }
}

impl IntoSnapshot for Songs {
    fn snapshot(records: Vec<Song>) -> Snapshot {
        Snapshot::Songs(records)
    }
}

/// What one viewer currently sees: the latest snapshot per collection, the
/// "pick another" offset and which hidden messages are unlocked.
///
/// All of it lives only as long as the viewer's connection.
#[derive(Debug, Default)]
pub struct ViewSession {
    clock: DayClock,
    pick_offset: u32,
    reminders: Vec<Reminder>,
    letters: Vec<Letter>,
    hidden: Vec<HiddenMessage>,
    memories: Vec<Memory>,
    songs: Vec<Song>,
    revealed: HashSet<Uuid>,
    /// Day key the viewer last saw, set by [`ViewSession::roll_day`].
    day: Option<String>,
}

impl ViewSession {
    pub fn new(clock: DayClock) -> Self {
        Self {
            clock,
            ..Default::default()
        }
    }

    pub fn pick_offset(&self) -> u32 {
        self.pick_offset
    }

    /// Store a fresh snapshot and return every pane that depends on it.
    pub fn apply(&mut self, snapshot: Snapshot, now: DateTime<Utc>) -> Vec<(Pane, String)> {
        let kind = snapshot.kind();
        debug!("applying {} snapshot", kind);

        match snapshot {
            Snapshot::Reminders(records) => {
                self.reminders = records;
                vec![self.render_pane(Pane::List(kind), now), self.render_pane(Pane::Today, now)]
            }
            Snapshot::Letters(records) => {
                self.letters = records;
                vec![
                    self.render_pane(Pane::List(kind), now),
                    self.render_pane(Pane::FeaturedLetter, now),
                ]
            }
            Snapshot::HiddenMessages(records) => {
                // forget reveals for messages that no longer exist
                self.revealed.retain(|id| records.iter().any(|h| h.meta.id == *id));
                self.hidden = records;
                vec![self.render_pane(Pane::List(kind), now)]
            }
            Snapshot::Memories(records) => {
                self.memories = records;
                vec![self.render_pane(Pane::List(kind), now), self.render_pane(Pane::Collage, now)]
            }
            Snapshot::Songs(records) => {
                self.songs = records;
                vec![self.render_pane(Pane::List(kind), now)]
            }
        }
    }

    /// "Pick another": bump the offset and redraw today's reminder.
    pub fn pick_another(&mut self, now: DateTime<Utc>) -> (Pane, String) {
        self.pick_offset = self.pick_offset.wrapping_add(1);
        self.render_pane(Pane::Today, now)
    }

    /// Flip a hidden message between locked and revealed. `None` when the id
    /// is not in the current snapshot.
    pub fn toggle_reveal(&mut self, id: Uuid, now: DateTime<Utc>) -> Option<(Pane, String)> {
        if !self.hidden.iter().any(|h| h.meta.id == id) {
            return None;
        }
        if !self.revealed.remove(&id) {
            self.revealed.insert(id);
        }
        Some(self.render_pane(Pane::List(CollectionKind::HiddenMessages), now))
    }

    /// Redraw today's pick once the canonical day has moved on. The first
    /// call only records the day.
    pub fn roll_day(&mut self, now: DateTime<Utc>) -> Option<(Pane, String)> {
        let key = self.clock.day_key(now);
        let previous = self.day.replace(key.clone())?;
        if previous == key {
            return None;
        }
        debug!("day rolled over from {} to {}", previous, key);
        Some(self.render_pane(Pane::Today, now))
    }

    pub fn today_text(&self, now: DateTime<Utc>) -> String {
        let key = self.clock.day_key(now);
        pick_today(&self.reminders, &key, self.pick_offset).text().to_string()
    }

    /// Drop everything cached, as on sign-out.
    pub fn clear(&mut self) {
        *self = Self::new(self.clock);
    }

    /// Render one pane from the cached snapshots.
    pub fn render_pane(&self, pane: Pane, now: DateTime<Utc>) -> (Pane, String) {
        let ctx = RenderContext {
            tz: self.clock.tz(),
            revealed: &self.revealed,
        };
        let html = match pane {
            Pane::List(CollectionKind::Reminders) => render_list::<Reminders>(&self.reminders, &ctx),
            Pane::List(CollectionKind::Letters) => render_list::<Letters>(&self.letters, &ctx),
            Pane::List(CollectionKind::HiddenMessages) => {
                render_list::<HiddenMessages>(&self.hidden, &ctx)
            }
            Pane::List(CollectionKind::Memories) => render_list::<Memories>(&self.memories, &ctx),
            Pane::List(CollectionKind::Songs) => render_list::<Songs>(&self.songs, &ctx),
            Pane::FeaturedLetter => render_featured_letter(&self.letters),
            Pane::Collage => render_collage(&self.memories),
            Pane::Today => render_today(&self.today_text(now)),
        };
        (pane, html)
    }
}
