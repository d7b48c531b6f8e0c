use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::AttachmentAuditDecorator;
use crate::decorator::{CopyField, Decorator};
use crate::error::{FactoryError, FactoryResult};
use crate::message;

/// Factory configuration: the built-in decorators to register, in order.
///
/// ```json
/// {"decorators": [{"kind": "attachment_audit"}, {"kind": "copy_field", "field": "tracking_value_ids"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactoryConfig {
    pub decorators: Vec<DecoratorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecoratorConfig {
    AttachmentAudit,
    CopyField { field: String },
}

impl DecoratorConfig {
    pub(crate) fn build(&self) -> Arc<dyn Decorator> {
        match self {
            DecoratorConfig::AttachmentAudit => Arc::new(AttachmentAuditDecorator),
            DecoratorConfig::CopyField { field } => Arc::new(CopyField::new(field)),
        }
    }
}

impl FactoryConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Raise FactoryError::Config if the document is not valid JSON, names an unknown decorator kind, or copies
    /// into a base message field.
    pub fn from_json(json: &str) -> FactoryResult<Self> {
        let config: FactoryConfig =
            serde_json::from_str(json).map_err(|e| FactoryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FactoryResult<()> {
        for decorator in &self.decorators {
            if let DecoratorConfig::CopyField { field } = decorator {
                if field.is_empty() {
                    return Err(FactoryError::Config(
                        "copy_field requires a non-empty field name".to_owned(),
                    ));
                }
                if message::is_base_field(field) {
                    return Err(FactoryError::Config(format!(
                        "copy_field may not target base field `{}`",
                        field
                    )));
                }
            }
        }
        Ok(())
    }
}
