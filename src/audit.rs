//!
//! EDI attachment audit trail carried on chat messages.
//!
//! Every time an EDI transfer receives or sends files, the server posts a message on the thread and records an
//! audit entry per attachment (file name, size and checksum at the time of transfer). The entries are delivered in
//! the raw message data under `edi_attachment_audit_ids`.
//!
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::decorator::Decorator;
use crate::error::DecoratorError;
use crate::message::{Message, RawMessageData};

pub const AUDIT_FIELD: &str = "edi_attachment_audit_ids";

/// One audited attachment, as formatted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentAudit {
    pub id: i64,

    /// File name at the time of transfer. The server sends `false` when unknown.
    #[serde(default, deserialize_with = "false_as_none")]
    pub datas_fname: Option<String>,

    #[serde(default)]
    pub file_size: i64,

    #[serde(default, deserialize_with = "false_as_none")]
    pub checksum: Option<String>,
}

fn false_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(text) => Ok(Some(text)),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or false, got {}",
            other
        ))),
    }
}

/// Attaches the attachment audit trail to every message.
///
/// The raw value is carried verbatim once it has been checked to be a list of audit records. Missing, `null`,
/// `false` and empty lists are all recorded as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttachmentAuditDecorator;

impl AttachmentAuditDecorator {
    pub fn parse(value: &Value) -> Result<Vec<AttachmentAudit>, DecoratorError> {
        Vec::<AttachmentAudit>::deserialize(value).map_err(|e| DecoratorError::Malformed {
            field: AUDIT_FIELD.to_owned(),
            reason: e.to_string(),
        })
    }
}

impl Decorator for AttachmentAuditDecorator {
    fn field(&self) -> &str {
        AUDIT_FIELD
    }

    fn decorate(
        &self,
        data: &RawMessageData,
        _message: &Message,
    ) -> Result<Option<Value>, DecoratorError> {
        let value = match data.get(AUDIT_FIELD) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
            Some(value) => value,
        };
        if AttachmentAuditDecorator::parse(value)?.is_empty() {
            return Ok(None);
        }
        Ok(Some(value.clone()))
    }
}

impl Message {
    /// Typed view of the attachment audit trail.
    ///
    /// Returns `None` when the field is absent, was never set, or does not hold audit records.
    pub fn attachment_audits(&self) -> Option<Vec<AttachmentAudit>> {
        let value = self.auxiliary(AUDIT_FIELD)?.value()?;
        AttachmentAuditDecorator::parse(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decorate(data: Value) -> Result<Option<Value>, Box<dyn std::error::Error>> {
        let data: RawMessageData = serde_json::from_value(data)?;
        let message = Message::from_raw(&data)?;
        Ok(AttachmentAuditDecorator.decorate(&data, &message)?)
    }

    #[test]
    fn test_audit_deserialization() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"
        {"id": 4, "datas_fname": "ORDERS.EDI", "file_size": 2048, "checksum": "9a0364b9e99bb480dd25e1f0284c8555"}
        "#;
        let audit: AttachmentAudit = serde_json::from_str(json)?;
        assert_eq!(audit.id, 4);
        assert_eq!(audit.datas_fname.as_deref(), Some("ORDERS.EDI"));
        assert_eq!(audit.file_size, 2048);
        assert_eq!(
            audit.checksum.as_deref(),
            Some("9a0364b9e99bb480dd25e1f0284c8555")
        );
        Ok(())
    }

    #[test]
    fn test_audit_false_values() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"{"id": 4, "datas_fname": false, "file_size": 0, "checksum": false}"#;
        let audit: AttachmentAudit = serde_json::from_str(json)?;
        assert_eq!(audit.datas_fname, None);
        assert_eq!(audit.checksum, None);
        Ok(())
    }

    #[test]
    fn test_decorate_carries_value() -> Result<(), Box<dyn std::error::Error>> {
        let audits = json!([
            {"id": 2, "datas_fname": "b.csv", "file_size": 20, "checksum": "bb"},
            {"id": 1, "datas_fname": "a.csv", "file_size": 10, "checksum": "aa"},
        ]);
        let value = decorate(json!({"id": 1, "edi_attachment_audit_ids": audits.clone()}))?;
        assert_eq!(value, Some(audits));
        Ok(())
    }

    #[test]
    fn test_decorate_absent() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(decorate(json!({"id": 1}))?, None);
        assert_eq!(decorate(json!({"id": 1, "edi_attachment_audit_ids": false}))?, None);
        assert_eq!(decorate(json!({"id": 1, "edi_attachment_audit_ids": []}))?, None);
        Ok(())
    }

    #[test]
    fn test_decorate_malformed() -> Result<(), Box<dyn std::error::Error>> {
        let data: RawMessageData =
            serde_json::from_value(json!({"id": 1, "edi_attachment_audit_ids": "oops"}))?;
        let message = Message::from_raw(&data)?;
        let result = AttachmentAuditDecorator.decorate(&data, &message);
        assert!(matches!(result, Err(DecoratorError::Malformed { .. })));
        Ok(())
    }
}
