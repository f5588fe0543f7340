//! Projection of stored log records into their public view.

use crate::models::{LogEntryView, LogRecord};

/// Stateless mapper from [`LogRecord`] to [`LogEntryView`].
pub struct LogMapper;

impl LogMapper {
    /// Project a record. Never fails; missing name parts become empty strings.
    pub fn to_view(record: &LogRecord) -> LogEntryView {
        LogEntryView {
            id: record.id.clone(),
            logbooks: record.logbooks.clone(),
            title: record.title.clone(),
            text: record.text.clone(),
            note: record.note.clone(),
            tags: record.tags.clone(),
            author: author_name(record.first_name.as_deref(), record.last_name.as_deref()),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            user_name: record.user_name.clone(),
            logged_at: record.logged_at,
            event_at: record.event_at,
            origin_id: record.origin_id.clone(),
        }
    }

    pub fn to_views<'a, I>(records: I) -> Vec<LogEntryView>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        records.into_iter().map(Self::to_view).collect()
    }
}

impl From<&LogRecord> for LogEntryView {
    fn from(record: &LogRecord) -> Self {
        LogMapper::to_view(record)
    }
}

/// Author display name: first and last name joined by one space, untrimmed.
pub fn author_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn record(first: Option<&str>, last: Option<&str>) -> LogRecord {
        LogRecord {
            id: "42".into(),
            logbooks: vec!["operations".into()],
            title: "title".into(),
            text: "text".into(),
            note: Some("note".into()),
            tags: vec!["rf".into()],
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            user_name: "user".into(),
            logged_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            event_at: None,
            origin_id: Some("origin".into()),
        }
    }

    #[test]
    fn test_author_from_first_and_last_name() {
        let view = LogMapper::to_view(&record(Some("firstName"), Some("lastName")));
        assert_eq!(view.author, "firstName lastName");
    }

    #[test]
    fn test_empty_first_name_keeps_separator() {
        let view = LogMapper::to_view(&record(Some(""), Some("lastName")));
        assert_eq!(view.author, " lastName");
    }

    #[test]
    fn test_missing_names_degrade_to_empty() {
        assert_eq!(LogMapper::to_view(&record(None, Some("lastName"))).author, " lastName");
        assert_eq!(LogMapper::to_view(&record(Some("firstName"), None)).author, "firstName ");
        assert_eq!(LogMapper::to_view(&record(None, None)).author, " ");
    }

    #[test]
    fn test_fields_pass_through() {
        let rec = record(Some("Ada"), Some("Lovelace"));
        let view = LogEntryView::from(&rec);
        assert_eq!(view.id, rec.id);
        assert_eq!(view.logbooks, rec.logbooks);
        assert_eq!(view.note, rec.note);
        assert_eq!(view.tags, rec.tags);
        assert_eq!(view.logged_at, rec.logged_at);
        assert_eq!(view.origin_id, rec.origin_id);
        assert_eq!(view.first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let rec = record(Some("a"), Some("b"));
        assert_eq!(LogMapper::to_view(&rec), LogMapper::to_view(&rec));
    }

    #[test]
    fn test_view_serializes_author() {
        let view = LogMapper::to_view(&record(Some("Grace"), Some("Hopper")));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["author"], "Grace Hopper");
        assert_eq!(json["userName"], "user");
    }
}
