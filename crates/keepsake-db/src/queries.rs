use crate::Database;
use crate::models::{META_COLUMNS, UserRow, format_timestamp, meta_from_row};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};

use keepsake_types::collection::{Collection, HiddenMessages, Letters, Memories, Reminders, Songs};
use keepsake_types::models::{
    HiddenKind, HiddenMessage, Letter, Memory, RecordMeta, Reminder, Song,
};

/// Maps a collection onto its SQLite table.
///
/// Every table starts with the shared meta columns (`id`, `author_id`,
/// `author_name`, `created_at`) followed by `COLUMNS`.
pub trait Table: Collection {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Content values in `COLUMNS` order.
    fn values(record: &Self::Record) -> Vec<Value>;

    /// Rebuild a record; content columns start at `META_COLUMNS`.
    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Self::Record>;
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, display_name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, display_name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Records --

    pub fn insert_record<T: Table>(&self, record: &T::Record) -> Result<()> {
        let meta = T::meta(record);
        let mut values = vec![
            Value::Text(meta.id.to_string()),
            Value::Text(meta.author_id.to_string()),
            Value::Text(meta.author_name.clone()),
            Value::Text(format_timestamp(&meta.created_at)),
        ];
        values.extend(T::values(record));

        self.with_conn(|conn| {
            conn.execute(&insert_sql::<T>(), rusqlite::params_from_iter(values))?;
            Ok(())
        })
    }

    /// Full result set in display order.
    pub fn list_records<T: Table>(&self) -> Result<Vec<T::Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&select_sql::<T>())?;
            let rows = stmt
                .query_map([], |row| T::from_row(meta_from_row(row)?, row))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no record had this id.
    pub fn delete_record<T: Table>(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", T::TABLE), [id])?;
            Ok(changed > 0)
        })
    }
}

const META_NAMES: [&str; META_COLUMNS] = ["id", "author_id", "author_name", "created_at"];

fn insert_sql<T: Table>() -> String {
    let columns: Vec<&str> = META_NAMES.iter().chain(T::COLUMNS).copied().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn select_sql<T: Table>() -> String {
    let columns: Vec<&str> = META_NAMES.iter().chain(T::COLUMNS).copied().collect();
    // rowid breaks timestamp ties: newest insert first
    let order: Vec<String> = T::ORDER
        .iter()
        .map(|o| format!("{} {}", o.column, if o.descending { "DESC" } else { "ASC" }))
        .chain(std::iter::once("rowid DESC".to_string()))
        .collect();
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        columns.join(", "),
        T::TABLE,
        order.join(", ")
    )
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, display_name, password, created_at FROM users WHERE {} = ?1",
        column
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

// -- Tables --

const C: usize = META_COLUMNS;

impl Table for Reminders {
    const TABLE: &'static str = "daily_reminders";
    const COLUMNS: &'static [&'static str] = &["text", "date"];

    fn values(r: &Reminder) -> Vec<Value> {
        vec![
            Value::Text(r.text.clone()),
            r.date
                .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Reminder> {
        let date = match row.get::<_, Option<String>>(C + 1)? {
            Some(raw) if !raw.is_empty() => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(C + 1, Type::Text, Box::new(e))
                })?,
            ),
            _ => None,
        };
        Ok(Reminder { meta, text: row.get(C)?, date })
    }
}

impl Table for Letters {
    const TABLE: &'static str = "letters";
    const COLUMNS: &'static [&'static str] = &["title", "body", "pinned"];

    fn values(l: &Letter) -> Vec<Value> {
        vec![
            Value::Text(l.title.clone()),
            Value::Text(l.body.clone()),
            Value::Integer(l.pinned as i64),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Letter> {
        Ok(Letter {
            meta,
            title: row.get(C)?,
            body: row.get(C + 1)?,
            pinned: row.get(C + 2)?,
        })
    }
}

impl Table for HiddenMessages {
    const TABLE: &'static str = "hidden_messages";
    const COLUMNS: &'static [&'static str] = &["kind", "text"];

    fn values(h: &HiddenMessage) -> Vec<Value> {
        vec![Value::Text(h.kind.as_str().to_string()), Value::Text(h.text.clone())]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<HiddenMessage> {
        let kind: String = row.get(C)?;
        Ok(HiddenMessage { meta, kind: HiddenKind::parse(&kind), text: row.get(C + 1)? })
    }
}

impl Table for Memories {
    const TABLE: &'static str = "memories";
    const COLUMNS: &'static [&'static str] = &["title", "description", "image_url"];

    fn values(m: &Memory) -> Vec<Value> {
        vec![
            Value::Text(m.title.clone()),
            Value::Text(m.description.clone()),
            Value::Text(m.image_url.clone()),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Memory> {
        Ok(Memory {
            meta,
            title: row.get(C)?,
            description: row.get(C + 1)?,
            image_url: row.get(C + 2)?,
        })
    }
}

impl Table for Songs {
    const TABLE: &'static str = "songs";
    const COLUMNS: &'static [&'static str] = &["title", "link"];

    fn values(s: &Song) -> Vec<Value> {
        vec![Value::Text(s.title.clone()), Value::Text(s.link.clone())]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Song> {
        Ok(Song { meta, title: row.get(C)?, link: row.get(C + 1)? })
    }
}

/// Extension trait for optional query results
/// True when `err` is SQLite refusing a write over a constraint, such as a
/// second account for the same email.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn meta(minute: u32) -> RecordMeta {
        RecordMeta {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_name: "Niclas".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    fn letter(title: &str, pinned: bool, minute: u32) -> Letter {
        Letter { meta: meta(minute), title: title.into(), body: String::new(), pinned }
    }

    #[test]
    fn letters_list_pinned_before_newer() {
        let db = Database::open_in_memory().unwrap();
        db.insert_record::<Letters>(&letter("old pinned", true, 1)).unwrap();
        db.insert_record::<Letters>(&letter("new", false, 30)).unwrap();
        db.insert_record::<Letters>(&letter("newer pinned", true, 10)).unwrap();

        let titles: Vec<String> = db
            .list_records::<Letters>()
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, ["newer pinned", "old pinned", "new"]);
    }

    #[test]
    fn reminders_round_trip_with_optional_date() {
        let db = Database::open_in_memory().unwrap();
        let scheduled = Reminder {
            meta: meta(5),
            text: "B".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        let free = Reminder { meta: meta(0), text: "A".into(), date: None };
        db.insert_record::<Reminders>(&free).unwrap();
        db.insert_record::<Reminders>(&scheduled).unwrap();

        let rows = db.list_records::<Reminders>().unwrap();
        assert_eq!(rows, vec![scheduled, free]);
    }

    #[test]
    fn equal_timestamps_list_newest_insert_first() {
        let db = Database::open_in_memory().unwrap();
        let at = meta(0).created_at + Duration::microseconds(7);
        for title in ["first", "second"] {
            let mut m = meta(0);
            m.created_at = at;
            db.insert_record::<Songs>(&Song { meta: m, title: title.into(), link: String::new() })
                .unwrap();
        }

        let rows = db.list_records::<Songs>().unwrap();
        assert_eq!(rows[0].title, "second");
        assert_eq!(rows[0].meta.created_at, at);
    }

    #[test]
    fn delete_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let h = HiddenMessage { meta: meta(0), kind: HiddenKind::Hard, text: "shh".into() };
        db.insert_record::<HiddenMessages>(&h).unwrap();

        let id = h.meta.id.to_string();
        assert!(db.delete_record::<HiddenMessages>(&id).unwrap());
        assert!(!db.delete_record::<HiddenMessages>(&id).unwrap());
        assert!(db.list_records::<HiddenMessages>().unwrap().is_empty());
    }

    #[test]
    fn users_are_unique_by_email() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "mi423ma@gmail.com", "Mi", "hash").unwrap();
        let err = db.create_user("u2", "mi423ma@gmail.com", "Other", "hash").unwrap_err();
        assert!(is_constraint_violation(&err));
        assert!(!is_constraint_violation(&anyhow::anyhow!("disk on fire")));

        let user = db.get_user_by_email("mi423ma@gmail.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(db.get_user_by_id("nope").unwrap().is_none());
    }
}
