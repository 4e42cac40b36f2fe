// Note records and the authenticated CRUD operations on `/notes`.

use crate::api::ApiClient;
use crate::error::{Error, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use tracing::{debug, info};

pub const NOTES_PATH: &[&str] = &["notes", ""];

/// A Joplin note. Every field is optional: the service only returns the
/// fields asked for, and `None` means "not in the response".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub is_conflict: Option<i64>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub is_todo: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub todo_due: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub todo_completed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_data: Option<String>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub user_created_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub user_updated_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_cipher_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub encryption_applied: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub markup_language: Option<i64>,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub is_shared: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_original_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_rect: Option<String>,
    #[serde(rename = "type_", default, deserialize_with = "lenient::int", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<i64>,
}

/// One page of `GET /notes/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Note>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body markup accepted by `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFormat {
    Markdown,
    Html,
}

impl NoteFormat {
    /// Field of the create payload that carries the body.
    pub fn body_field(self) -> &'static str {
        match self {
            NoteFormat::Markdown => "body",
            NoteFormat::Html => "body_html",
        }
    }
}

impl FromStr for NoteFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" => Ok(NoteFormat::Markdown),
            "html" => Ok(NoteFormat::Html),
            other => Err(Error::UnknownFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// CRUD on the note collection. Every request carries the API token.
pub struct NoteRepository {
    api: ApiClient,
    max_pages: u32,
}

impl NoteRepository {
    pub fn new(api: ApiClient, max_pages: u32) -> Self {
        NoteRepository {
            api,
            max_pages: max_pages.max(1),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetch one note restricted to `fields` (comma-separated).
    pub fn get(&self, id: &str, fields: &str) -> Result<Note> {
        let context = format!("retrieving note {id}");
        self.api
            .get(&note_path(id), &[("fields", fields.to_string())], &context)?
            .json(&context)
    }

    /// Fetch a single page of the collection.
    pub fn get_page(
        &self,
        fields: &str,
        order_by: Option<&str>,
        order_dir: Option<&str>,
        page: u32,
    ) -> Result<Page> {
        let context = format!("retrieving page {page} of notes");
        let query = page_query(fields, order_by, order_dir, page);
        self.api.get(NOTES_PATH, &query, &context)?.json(&context)
    }

    /// Walk every page, starting at 1, until the service reports no more.
    pub fn get_all(
        &self,
        fields: &str,
        order_by: Option<&str>,
        order_dir: Option<&str>,
    ) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        let mut page = 1;
        loop {
            let result = self.get_page(fields, order_by, order_dir, page)?;
            debug!(page, items = result.items.len(), has_more = result.has_more, "fetched page");
            notes.extend(result.items);
            if !result.has_more {
                return Ok(notes);
            }
            if page >= self.max_pages {
                return Err(Error::PaginationLimit { pages: page });
            }
            page += 1;
        }
    }

    /// Create a note. `format` must be `markdown` or `html`; it is checked
    /// before anything is sent. The response is returned as the new note.
    pub fn create(&self, title: &str, format: &str, body: &str) -> Result<Note> {
        let format: NoteFormat = format.parse()?;
        let payload = create_body(title, format, body);
        let note: Note = self
            .api
            .execute(Method::POST, NOTES_PATH, &[], Some(&payload), "creating note")?
            .json("reading the created note")?;
        info!(id = note.id.as_deref().unwrap_or_default(), "note created");
        Ok(note)
    }

    /// Update a note from alternating field/value arguments.
    pub fn update(&self, id: &str, pairs: &[String]) -> Result<Note> {
        let fields = fold_fields(pairs)?;
        let context = format!("updating note {id}");
        let note: Note = self
            .api
            .execute(Method::PUT, &note_path(id), &[], Some(&Value::Object(fields)), &context)?
            .json(&context)?;
        info!(id, "note updated");
        Ok(note)
    }

    /// Delete a note; `permanent` skips the trash. Any 2xx is success and
    /// the body is ignored.
    pub fn delete(&self, id: &str, permanent: bool) -> Result<String> {
        let context = format!("deleting note {id}");
        self.api
            .execute(Method::DELETE, &note_path(id), &delete_query(permanent), None, &context)?;
        info!(id, permanent, "note deleted");
        Ok(id.to_string())
    }
}

fn note_path(id: &str) -> [&str; 2] {
    ["notes", id]
}

fn page_query(
    fields: &str,
    order_by: Option<&str>,
    order_dir: Option<&str>,
    page: u32,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(4);
    query.push(("fields", fields.to_string()));
    if let Some(order_by) = order_by.filter(|v| !v.is_empty()) {
        query.push(("order_by", order_by.to_string()));
    }
    if let Some(order_dir) = order_dir.filter(|v| !v.is_empty()) {
        query.push(("order_dir", order_dir.to_uppercase()));
    }
    query.push(("page", page.to_string()));
    query
}

fn delete_query(permanent: bool) -> Vec<(&'static str, String)> {
    if permanent {
        vec![("permanent", "1".to_string())]
    } else {
        Vec::new()
    }
}

fn create_body(title: &str, format: NoteFormat, body: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("title".to_string(), json!(title));
    payload.insert(format.body_field().to_string(), json!(body));
    Value::Object(payload)
}

/// Fold `[field, value, field, value, ...]` into a map; a repeated field
/// keeps its last value. A trailing field without a value is rejected.
fn fold_fields(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for chunk in pairs.chunks(2) {
        match chunk {
            [field, value] => {
                fields.insert(field.clone(), Value::String(value.clone()));
            }
            [field] => {
                return Err(Error::UnpairedField {
                    field: field.clone(),
                })
            }
            _ => {}
        }
    }
    Ok(fields)
}

// The service sends some numeric columns as strings ("0.00000000").
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn float<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(de)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("number {n} out of range"))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected a number, found `{s}`"))),
            Some(other) => Err(D::Error::custom(format!("expected a number, found {other}"))),
        }
    }

    pub fn int<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
        match Option::<Value>::deserialize(de)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(i)),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e18 => Ok(Some(f as i64)),
                _ => Err(D::Error::custom(format!("expected an integer, found {n}"))),
            },
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected an integer, found `{s}`"))),
            Some(Value::Bool(b)) => Ok(Some(i64::from(b))),
            Some(other) => Err(D::Error::custom(format!("expected an integer, found {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn update_pairs_become_a_field_map() {
        let fields = fold_fields(&strings(&["title", "A", "body", "B"])).unwrap();
        assert_eq!(Value::Object(fields), json!({"title": "A", "body": "B"}));
    }

    #[test]
    fn repeated_update_field_keeps_last_value() {
        let fields = fold_fields(&strings(&["title", "A", "title", "C"])).unwrap();
        assert_eq!(Value::Object(fields), json!({"title": "C"}));
    }

    #[test]
    fn trailing_update_field_is_rejected() {
        let err = fold_fields(&strings(&["title", "A", "body"])).unwrap_err();
        match err {
            Error::UnpairedField { field } => assert_eq!(field, "body"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_body_places_markup_in_the_right_field() {
        assert_eq!(
            create_body("t", NoteFormat::Markdown, "**x**"),
            json!({"title": "t", "body": "**x**"})
        );
        assert_eq!(
            create_body("t", NoteFormat::Html, "<b>x</b>"),
            json!({"title": "t", "body_html": "<b>x</b>"})
        );
    }

    #[test]
    fn format_must_be_exactly_markdown_or_html() {
        assert_eq!("markdown".parse::<NoteFormat>().unwrap(), NoteFormat::Markdown);
        assert_eq!("html".parse::<NoteFormat>().unwrap(), NoteFormat::Html);
        for bad in ["Markdown", "HTML", "txt", ""] {
            assert!(matches!(
                bad.parse::<NoteFormat>(),
                Err(Error::UnknownFormat { .. })
            ));
        }
    }

    #[test]
    fn page_query_uppercases_direction_and_skips_empty_ordering() {
        assert_eq!(
            page_query("id,title", Some("title"), Some("asc"), 3),
            vec![
                ("fields", "id,title".to_string()),
                ("order_by", "title".to_string()),
                ("order_dir", "ASC".to_string()),
                ("page", "3".to_string()),
            ]
        );
        assert_eq!(
            page_query("id", Some(""), None, 1),
            vec![("fields", "id".to_string()), ("page", "1".to_string())]
        );
    }

    #[test]
    fn delete_query_only_flags_permanent_deletes() {
        assert_eq!(delete_query(true), vec![("permanent", "1".to_string())]);
        assert!(delete_query(false).is_empty());
    }

    #[test]
    fn note_keeps_field_presence() {
        let note: Note = serde_json::from_value(json!({
            "id": "abc",
            "title": "Hello",
            "latitude": "12.50000000",
            "is_todo": 0,
            "type_": 1
        }))
        .unwrap();
        assert_eq!(note.id.as_deref(), Some("abc"));
        assert_eq!(note.latitude, Some(12.5));
        assert_eq!(note.is_todo, Some(0));
        assert_eq!(note.item_type, Some(1));
        assert_eq!(note.body, None);

        let back = serde_json::to_value(&note).unwrap();
        assert_eq!(
            back,
            json!({"id": "abc", "title": "Hello", "latitude": 12.5, "is_todo": 0, "type_": 1})
        );
    }

    #[test]
    fn unreadable_numeric_string_is_an_error() {
        let err = serde_json::from_value::<Note>(json!({"id": "abc", "latitude": "n/a"}))
            .unwrap_err();
        assert!(err.to_string().contains("n/a"), "{err}");

        let err = serde_json::from_value::<Note>(json!({"id": "abc", "todo_due": "soon"}))
            .unwrap_err();
        assert!(err.to_string().contains("soon"), "{err}");
    }

    #[test]
    fn fractional_value_in_integer_field_is_an_error() {
        assert!(serde_json::from_value::<Note>(json!({"is_todo": 1.9})).is_err());

        let note: Note = serde_json::from_value(json!({"is_todo": 1.0, "todo_due": "1700000000000"}))
            .unwrap();
        assert_eq!(note.is_todo, Some(1));
        assert_eq!(note.todo_due, Some(1_700_000_000_000));
    }

    #[test]
    fn null_numeric_field_reads_as_absent() {
        let note: Note = serde_json::from_value(json!({"latitude": null, "order": 0})).unwrap();
        assert_eq!(note.latitude, None);
        assert_eq!(note.order, Some(0.0));
    }

    #[test]
    fn page_defaults_when_fields_are_missing() {
        let page: Page = serde_json::from_value(json!({})).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
