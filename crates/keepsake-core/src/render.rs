//! Markup fragments for every collection.
//!
//! All user-supplied strings go through [`escape_html`] before they touch markup.
//! Class names match the stylesheet the pages ship with.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use keepsake_types::collection::{Collection, HiddenMessages, Letters, Memories, Reminders, Songs};
use keepsake_types::models::{
    CollectionKind, HiddenKind, HiddenMessage, Letter, Memory, Reminder, Song,
};

use crate::escape::{escape_html, is_web_url};

/// Dashboard collage never shows more than this many photos.
pub const COLLAGE_LIMIT: usize = 18;

pub const NO_LETTERS: &str = "Write your first letter 💌";
pub const NO_PHOTOS: &str = "Add photos in Memories 🌸";
pub const NO_SONGS: &str = "Add your first song 🎶";

/// Per-view inputs that are not part of the records themselves.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub tz: Tz,
    /// Hidden messages the viewer has unlocked in this session.
    pub revealed: &'a HashSet<Uuid>,
}

/// A collection that knows how to draw its records.
pub trait Render: Collection {
    /// Prompt the client must confirm before a delete is sent.
    const CONFIRM: &'static str;
    /// Rendered in place of an empty list, if anything.
    const EMPTY: Option<&'static str> = None;

    fn render_item(record: &Self::Record, ctx: &RenderContext<'_>) -> String;
}

/// Render an ordered snapshot, keeping the order it was delivered in.
pub fn render_list<C: Render>(records: &[C::Record], ctx: &RenderContext<'_>) -> String {
    if records.is_empty() {
        return C::EMPTY.map(subtle).unwrap_or_default();
    }

    records.iter().map(|r| C::render_item(r, ctx)).collect()
}

/// `Jan 5, 2024` in the viewer's zone.
pub fn format_date(ts: &DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%b %-d, %Y").to_string()
}

fn subtle(text: &str) -> String {
    format!(r#"<div class="subtle">{}</div>"#, escape_html(text))
}

fn delete_button(kind: CollectionKind, id: &Uuid, confirm: &str) -> String {
    format!(
        r#"<button class="deleteBtn" title="Delete" data-collection="{}" data-id="{}" data-confirm="{}">🗑</button>"#,
        kind.name(),
        id,
        escape_html(confirm)
    )
}

fn byline(author: &str, created_at: &DateTime<Utc>, tz: Tz) -> String {
    format!("{} • {}", escape_html(author), format_date(created_at, tz))
}

impl Render for Reminders {
    const CONFIRM: &'static str = "Delete this reminder? 💔";

    fn render_item(r: &Reminder, _ctx: &RenderContext<'_>) -> String {
        let mut html = String::from(r#"<div class="dailyRow">"#);
        let _ = write!(html, r#"<div class="dailyText">{}</div>"#, escape_html(&r.text));
        if let Some(date) = r.date {
            let _ = write!(html, r#"<span class="dateTag">{}</span>"#, date.format("%Y-%m-%d"));
        }
        html.push_str(&delete_button(Self::KIND, &r.meta.id, Self::CONFIRM));
        html.push_str("</div>");
        html
    }
}

impl Render for Letters {
    const CONFIRM: &'static str = "Delete this letter forever? 💔\n\n(You can always write it again.)";
    const EMPTY: Option<&'static str> = Some(NO_LETTERS);

    fn render_item(l: &Letter, ctx: &RenderContext<'_>) -> String {
        let mut html = String::from(r#"<div class="letter"><div class="letterTop">"#);
        if l.pinned {
            html.push_str(r#"<span class="badge">Pinned 💗</span>"#);
        }
        let _ = write!(
            html,
            r#"<div class="meta">{}{}</div></div>"#,
            byline(&l.meta.author_name, &l.meta.created_at, ctx.tz),
            delete_button(Self::KIND, &l.meta.id, Self::CONFIRM)
        );
        if !l.title.is_empty() {
            let _ = write!(html, "<h3>{}</h3>", escape_html(&l.title));
        }
        let _ = write!(html, r#"<p class="letterBody">{}</p></div>"#, escape_html(&l.body));
        html
    }
}

impl Render for HiddenMessages {
    const CONFIRM: &'static str = "Delete this hidden message? 💔";

    fn render_item(h: &HiddenMessage, ctx: &RenderContext<'_>) -> String {
        let tag = match h.kind {
            HiddenKind::Hard => "🫧 Hard thing",
            HiddenKind::Soft => "🌷 Soft confession",
        };
        let revealed = ctx.revealed.contains(&h.meta.id);
        let (body_class, button) = if revealed {
            ("hiddenBody", "Hide 🔒")
        } else {
            ("hiddenBody locked", "Reveal 💗")
        };

        format!(
            concat!(
                r#"<div class="hiddenItem">"#,
                r#"<div class="hiddenTop"><span class="hiddenTag">{tag}</span>"#,
                r#"<span class="hiddenMeta">{meta}</span></div>"#,
                r#"<div class="{body_class}" data-id="{id}">{text}</div>"#,
                r#"<div class="hiddenActions">"#,
                r#"<button class="revealBtn" data-id="{id}">{button}</button>{delete}</div>"#,
                "</div>"
            ),
            tag = tag,
            meta = byline(&h.meta.author_name, &h.meta.created_at, ctx.tz),
            body_class = body_class,
            id = h.meta.id,
            text = escape_html(&h.text),
            button = button,
            delete = delete_button(Self::KIND, &h.meta.id, Self::CONFIRM),
        )
    }
}

impl Render for Memories {
    const CONFIRM: &'static str = "Delete this memory? 💔";

    fn render_item(m: &Memory, _ctx: &RenderContext<'_>) -> String {
        let title = if m.title.is_empty() { "Memory" } else { &m.title };

        let mut html = String::from(r#"<div class="card memory">"#);
        html.push_str(&delete_button(Self::KIND, &m.meta.id, Self::CONFIRM));
        let _ = write!(html, "<h3>{}</h3>", escape_html(title));
        if is_web_url(&m.image_url) {
            let _ = write!(
                html,
                r#"<img class="memoryImage" src="{}" alt="memory" loading="lazy" onerror="this.style.display='none';" />"#,
                escape_html(&m.image_url)
            );
        }
        let _ = write!(
            html,
            r#"<p class="memoryText">{}</p><p class="memoryAuthor">{}</p></div>"#,
            escape_html(&m.description),
            escape_html(&m.meta.author_name)
        );
        html
    }
}

impl Render for Songs {
    const CONFIRM: &'static str = "Delete this song? 💔";
    const EMPTY: Option<&'static str> = Some(NO_SONGS);

    fn render_item(s: &Song, _ctx: &RenderContext<'_>) -> String {
        let title = if s.title.is_empty() { "Song" } else { &s.title };

        let mut html = String::from(r#"<div class="songRow"><div class="songInfo">"#);
        let _ = write!(html, r#"<div class="songTitle">{}</div>"#, escape_html(title));
        if is_web_url(&s.link) {
            let _ = write!(
                html,
                r#"<a class="songLink" href="{}" target="_blank" rel="noopener">open link</a>"#,
                escape_html(s.link.trim())
            );
        }
        html.push_str("</div>");
        html.push_str(&delete_button(Self::KIND, &s.meta.id, Self::CONFIRM));
        html.push_str("</div>");
        html
    }
}

/// Escaped text for the "today" box.
pub fn render_today(text: &str) -> String {
    escape_html(text)
}

/// First pinned letter in display order, otherwise the newest one.
pub fn featured_letter(letters: &[Letter]) -> Option<&Letter> {
    letters.iter().find(|l| l.pinned).or_else(|| letters.first())
}

pub fn render_featured_letter(letters: &[Letter]) -> String {
    let Some(show) = featured_letter(letters) else {
        return subtle(NO_LETTERS);
    };

    let mut html = String::new();
    if !show.title.is_empty() {
        let _ = write!(html, r#"<div class="letterMiniTitle">{}</div>"#, escape_html(&show.title));
    }
    let _ = write!(
        html,
        r#"<div class="letterMiniBody">{}</div><div class="subtle">{}</div>"#,
        escape_html(&show.body),
        escape_html(&show.meta.author_name)
    );
    if show.pinned {
        html.push_str(r#"<div class="miniBadge">Pinned 💗</div>"#);
    }
    html
}

/// Photo wall from the newest memories that carry an image.
pub fn render_collage(memories: &[Memory]) -> String {
    let items: String = memories
        .iter()
        .filter(|m| is_web_url(&m.image_url))
        .take(COLLAGE_LIMIT)
        .map(|m| {
            format!(
                r#"<div class="collageItem"><img src="{}" alt="memory" loading="lazy" onerror="this.parentElement.style.display='none';" /></div>"#,
                escape_html(&m.image_url)
            )
        })
        .collect();

    if items.is_empty() { subtle(NO_PHOTOS) } else { items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use keepsake_types::models::RecordMeta;

    fn meta(author: &str) -> RecordMeta {
        RecordMeta {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_name: author.into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(),
        }
    }

    fn letter(title: &str, pinned: bool) -> Letter {
        Letter { meta: meta("Mi"), title: title.into(), body: "body".into(), pinned }
    }

    fn memory(url: &str) -> Memory {
        Memory {
            meta: meta("Mi"),
            title: String::new(),
            description: String::new(),
            image_url: url.into(),
        }
    }

    fn ctx(revealed: &HashSet<Uuid>) -> RenderContext<'_> {
        RenderContext { tz: crate::clock::DEFAULT_TIMEZONE, revealed }
    }

    #[test]
    fn user_text_is_escaped_everywhere() {
        let none = HashSet::new();
        let evil = "<script>&\"'";
        let mut r = Reminder { meta: meta(evil), text: evil.into(), date: None };
        let html = Reminders::render_item(&r, &ctx(&none));
        assert!(html.contains("&lt;script&gt;&amp;&quot;&#039;"));
        assert!(!html.contains("<script>"));

        r.meta.author_name = evil.into();
        let l = Letter { meta: r.meta.clone(), title: evil.into(), body: evil.into(), pinned: false };
        let html = Letters::render_item(&l, &ctx(&none));
        assert!(!html.contains("<script>"));
        assert_eq!(html.matches("&lt;script&gt;").count(), 3);
    }

    #[test]
    fn reminder_row_shows_date_tag_only_when_scheduled() {
        let none = HashSet::new();
        let mut r = Reminder { meta: meta("Mi"), text: "hug".into(), date: None };
        assert!(!Reminders::render_item(&r, &ctx(&none)).contains("dateTag"));

        r.date = chrono::NaiveDate::from_ymd_opt(2024, 2, 14);
        let html = Reminders::render_item(&r, &ctx(&none));
        assert!(html.contains(r#"<span class="dateTag">2024-02-14</span>"#));
        assert!(html.contains(r#"data-collection="dailyReminders""#));
        assert!(html.contains(r#"data-confirm="Delete this reminder? 💔""#));
    }

    #[test]
    fn pinned_letter_gets_badge_and_date() {
        let none = HashSet::new();
        let html = Letters::render_item(&letter("Hi", true), &ctx(&none));
        assert!(html.contains("Pinned 💗"));
        assert!(html.contains("Mi • Jan 5, 2024"));
        assert!(html.contains("<h3>Hi</h3>"));

        let html = Letters::render_item(&letter("", false), &ctx(&none));
        assert!(!html.contains("badge"));
        assert!(!html.contains("<h3>"));
    }

    #[test]
    fn hidden_message_is_locked_until_revealed() {
        let h = HiddenMessage { meta: meta("Mi"), kind: HiddenKind::Hard, text: "ok".into() };
        let mut revealed = HashSet::new();

        let html = HiddenMessages::render_item(&h, &ctx(&revealed));
        assert!(html.contains("hiddenBody locked"));
        assert!(html.contains("Reveal 💗"));
        assert!(html.contains("🫧 Hard thing"));

        revealed.insert(h.meta.id);
        let html = HiddenMessages::render_item(&h, &ctx(&revealed));
        assert!(!html.contains("locked"));
        assert!(html.contains("Hide 🔒"));
    }

    #[test]
    fn broken_images_hide_themselves() {
        let none = HashSet::new();
        let html = Memories::render_item(&memory("https://img/x.jpg"), &ctx(&none));
        assert!(html.contains(r#"onerror="this.style.display='none';""#));
        assert!(html.contains("<h3>Memory</h3>"));

        let html = Memories::render_item(&memory("javascript:alert(1)"), &ctx(&none));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn song_link_only_for_web_urls() {
        let none = HashSet::new();
        let mut s = Song { meta: meta("Mi"), title: "Vienna".into(), link: "https://x".into() };
        assert!(Songs::render_item(&s, &ctx(&none)).contains("open link"));

        s.link = "javascript:void(0)".into();
        assert!(!Songs::render_item(&s, &ctx(&none)).contains("<a "));
    }

    #[test]
    fn empty_lists_use_placeholders() {
        let none = HashSet::new();
        assert!(render_list::<Songs>(&[], &ctx(&none)).contains(NO_SONGS));
        assert_eq!(render_list::<Reminders>(&[], &ctx(&none)), "");
        assert!(render_featured_letter(&[]).contains(NO_LETTERS));
        assert!(render_collage(&[]).contains(NO_PHOTOS));
    }

    #[test]
    fn featured_letter_prefers_first_pinned() {
        let letters = vec![letter("latest", false), letter("pinned", true)];
        assert_eq!(featured_letter(&letters).unwrap().title, "pinned");

        let letters = vec![letter("latest", false), letter("older", false)];
        assert_eq!(featured_letter(&letters).unwrap().title, "latest");
    }

    #[test]
    fn collage_caps_at_limit() {
        let memories: Vec<Memory> = (0..25)
            .map(|i| memory(&format!("https://img/{}.jpg", i)))
            .chain(std::iter::once(memory("")))
            .collect();
        let html = render_collage(&memories);
        assert_eq!(html.matches("collageItem").count(), COLLAGE_LIMIT);
        assert!(html.contains("https://img/0.jpg"));
        assert!(!html.contains("https://img/18.jpg"));
    }
}
