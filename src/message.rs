use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{FactoryError, FactoryResult};

/// Raw message data as delivered by the server, keyed by field name.
///
/// The factory does not validate anything here beyond the base fields it reads.
pub type RawMessageData = Map<String, Value>;

/// Datetime layout used by the server for `date`.
pub const SERVER_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Field names owned by the base constructor, both as read from raw data and as
/// serialized. Decorators may not own any of them.
pub const BASE_FIELDS: &[&str] = &[
    "id",
    "body",
    "date",
    "author",
    "author_id",
    "message_type",
    "subject",
    "model",
    "res_id",
    "record_name",
    "attachment_ids",
];

pub fn is_base_field(name: &str) -> bool {
    BASE_FIELDS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// Value of a decorator-owned field.
///
/// `Absent` is the explicit marker for "the decorator ran but had nothing to
/// set"; it serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuxiliaryField {
    Present(Value),
    Absent,
}

impl AuxiliaryField {
    pub fn value(&self) -> Option<&Value> {
        match self {
            AuxiliaryField::Present(value) => Some(value),
            AuxiliaryField::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, AuxiliaryField::Absent)
    }
}

impl From<Option<Value>> for AuxiliaryField {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => AuxiliaryField::Present(value),
            None => AuxiliaryField::Absent,
        }
    }
}

/// A constructed chat message.
///
/// Fields are read-only once the factory hands the message out. Auxiliary
/// fields are flattened next to the base fields when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: i64,

    #[serde(serialize_with = "serialize_body")]
    body: Bytes,

    date: Option<DateTime<Utc>>,

    author: Option<Author>,

    message_type: String,

    subject: Option<String>,

    /// Model and record of the document thread the message was posted on.
    model: Option<String>,
    res_id: Option<i64>,
    record_name: Option<String>,

    attachment_ids: Vec<i64>,

    #[serde(flatten)]
    auxiliary: BTreeMap<String, AuxiliaryField>,
}

fn serialize_body<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(body))
}

impl Message {
    /// Build the base message from raw data.
    ///
    /// # Errors
    /// Raise FactoryError::InvalidInput if `id` is missing or is not an integer.
    /// Malformed optional fields fall back to their defaults.
    pub(crate) fn from_raw(data: &RawMessageData) -> FactoryResult<Self> {
        let id = match data.get("id") {
            None | Some(Value::Null) => {
                return Err(FactoryError::InvalidInput(
                    "missing required field `id`".to_owned(),
                ))
            }
            Some(value) => value.as_i64().ok_or_else(|| {
                FactoryError::InvalidInput(format!("field `id` must be an integer, got {}", value))
            })?,
        };

        let text = |field: &str| {
            optional(data, field)
                .and_then(|value| lenient(id, field, value.as_str().map(str::to_owned)))
        };

        let body = text("body")
            .map(Bytes::from)
            .unwrap_or_default();
        let date = optional(data, "date").and_then(|value| lenient(id, "date", parse_date(value)));
        let author =
            optional(data, "author_id").and_then(|value| lenient(id, "author_id", parse_author(value)));
        let res_id = optional(data, "res_id").and_then(|value| lenient(id, "res_id", value.as_i64()));
        let attachment_ids = optional(data, "attachment_ids")
            .and_then(|value| lenient(id, "attachment_ids", parse_attachment_ids(value)))
            .unwrap_or_default();

        Ok(Message {
            id,
            body,
            date,
            author,
            message_type: text("message_type").unwrap_or_default(),
            subject: text("subject"),
            model: text("model"),
            res_id,
            record_name: text("record_name"),
            attachment_ids,
            auxiliary: BTreeMap::new(),
        })
    }

    pub(crate) fn set_auxiliary(&mut self, field: &str, value: AuxiliaryField) {
        self.auxiliary.insert(field.to_owned(), value);
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn message_type(&self) -> &str {
        self.message_type.as_str()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn res_id(&self) -> Option<i64> {
        self.res_id
    }

    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    pub fn attachment_ids(&self) -> &[i64] {
        &self.attachment_ids
    }

    /// Look up a decorator-owned field. `None` means no decorator set it at all.
    pub fn auxiliary(&self, field: &str) -> Option<&AuxiliaryField> {
        self.auxiliary.get(field)
    }

    pub fn auxiliary_fields(&self) -> impl Iterator<Item = (&str, &AuxiliaryField)> {
        self.auxiliary
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }
}

// The server sends `false` for empty relations and unset values.
fn optional<'a>(data: &'a RawMessageData, field: &str) -> Option<&'a Value> {
    match data.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(value) => Some(value),
    }
}

fn lenient<T>(message_id: i64, field: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        debug!(message_id, field, "Ignoring malformed base field");
    }
    parsed
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    NaiveDateTime::parse_from_str(text, SERVER_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|date| date.with_timezone(&Utc)))
        .ok()
}

/// Authors arrive as an `[id, display name]` pair.
fn parse_author(value: &Value) -> Option<Author> {
    match value.as_array()?.as_slice() {
        [id, name] => Some(Author {
            id: id.as_i64()?,
            name: name.as_str()?.to_owned(),
        }),
        _ => None,
    }
}

fn parse_attachment_ids(value: &Value) -> Option<Vec<i64>> {
    value
        .as_array()?
        .iter()
        .map(|entry| match entry {
            Value::Object(attachment) => attachment.get("id").and_then(Value::as_i64),
            other => other.as_i64(),
        })
        .collect()
}
