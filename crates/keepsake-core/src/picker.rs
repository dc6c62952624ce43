//! Deterministic daily pick.
//!
//! No selection is ever stored. Everyone who looks on the same day, with the same
//! list and the same offset, sees the same reminder because the choice is a pure
//! function of the day key.

use chrono::NaiveDate;

use keepsake_types::models::Reminder;

/// Shown when there is nothing to pick from at all.
pub const EMPTY_PLACEHOLDER: &str = "Add your first reminder 💗";
/// Shown when every reminder is scheduled for some other day.
pub const NO_CANDIDATES: &str = "Nothing planned for today 💗";
/// Shown when the chosen reminder has no text.
pub const BLANK_TEXT: &str = "💗";

/// `h = h * 31 + unit (mod 2^32)` over the UTF-16 code units of the key.
pub fn hash_day_key(key: &str) -> u32 {
    key.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32))
}

/// Anything the picker can choose between.
pub trait Pickable {
    fn text(&self) -> &str;
    fn date(&self) -> Option<NaiveDate>;
}

impl Pickable for Reminder {
    fn text(&self) -> &str {
        &self.text
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick<'a, T> {
    /// The list was empty.
    Empty,
    /// Nothing is scheduled for today and nothing is unscheduled.
    NoCandidates,
    Item {
        item: &'a T,
        /// Index inside the active candidate list.
        position: usize,
        /// Candidates were today's scheduled reminders.
        scheduled: bool,
    },
}

impl<'a, T: Pickable> Pick<'a, T> {
    pub fn item(&self) -> Option<&'a T> {
        match *self {
            Self::Item { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn text(&self) -> &'a str {
        match *self {
            Self::Empty => EMPTY_PLACEHOLDER,
            Self::NoCandidates => NO_CANDIDATES,
            Self::Item { item, .. } => {
                let text = item.text();
                if text.trim().is_empty() { BLANK_TEXT } else { text }
            }
        }
    }
}

/// Date-aware pick.
///
/// Reminders tagged with today's date win, cycled by `offset` alone. Otherwise the
/// untagged reminders are indexed by `hash(day_key) + offset`. Reminders tagged for
/// other days are never shown.
pub fn pick_today<'a, T: Pickable>(items: &'a [T], day_key: &str, offset: u32) -> Pick<'a, T> {
    if items.is_empty() {
        return Pick::Empty;
    }

    let today = NaiveDate::parse_from_str(day_key, "%Y-%m-%d").ok();
    let scheduled: Vec<&T> = match today {
        Some(day) => items.iter().filter(|i| i.date() == Some(day)).collect(),
        None => Vec::new(),
    };
    if !scheduled.is_empty() {
        let position = offset as usize % scheduled.len();
        return Pick::Item { item: scheduled[position], position, scheduled: true };
    }

    let unscheduled: Vec<&T> = items.iter().filter(|i| i.date().is_none()).collect();
    if unscheduled.is_empty() {
        return Pick::NoCandidates;
    }

    let position = seeded_index(day_key, offset, unscheduled.len());
    Pick::Item { item: unscheduled[position], position, scheduled: false }
}

/// Pick over the whole list, ignoring dates.
pub fn pick_any<'a, T: Pickable>(items: &'a [T], day_key: &str, offset: u32) -> Pick<'a, T> {
    if items.is_empty() {
        return Pick::Empty;
    }

    let position = seeded_index(day_key, offset, items.len());
    Pick::Item { item: &items[position], position, scheduled: false }
}

fn seeded_index(day_key: &str, offset: u32, len: usize) -> usize {
    ((hash_day_key(day_key) as u64 + offset as u64) % len as u64) as usize
}
