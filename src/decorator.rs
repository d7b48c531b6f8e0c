//!
//! This module defines the extension point of the factory: decorators that compute one auxiliary field each.
//!
use serde_json::Value;

use crate::error::DecoratorError;
use crate::message::{Message, RawMessageData};

/// A decorator owns exactly one auxiliary field and computes its value.
///
/// `decorate` receives the raw data and the message as enriched by every decorator registered before this
/// one. Returning `Ok(None)` records the field as explicitly absent. Returning an error (or panicking) is
/// reported to the factory's diagnostics and also records the field as absent; it never aborts construction.
pub trait Decorator: Send + Sync {
    /// Name of the auxiliary field this decorator owns.
    fn field(&self) -> &str;

    fn decorate(
        &self,
        data: &RawMessageData,
        message: &Message,
    ) -> Result<Option<Value>, DecoratorError>;
}

/// Adapts a closure into a [`Decorator`].
pub struct FnDecorator<F> {
    field: String,
    decorate: F,
}

/// Build a decorator from a closure.
///
/// # Examples
///
/// ```
/// use chat_message_factory::decorator::decorator_fn;
/// use chat_message_factory::factory::MessageFactory;
/// use serde_json::json;
///
/// let factory = MessageFactory::new();
/// factory.register_decorator(decorator_fn("is_edi", |data, _message| {
///     Ok(Some(json!(data.get("model") == Some(&json!("edi.document")))))
/// }));
/// ```
pub fn decorator_fn<F>(field: impl Into<String>, decorate: F) -> FnDecorator<F>
where
    F: Fn(&RawMessageData, &Message) -> Result<Option<Value>, DecoratorError> + Send + Sync,
{
    FnDecorator {
        field: field.into(),
        decorate,
    }
}

impl<F> Decorator for FnDecorator<F>
where
    F: Fn(&RawMessageData, &Message) -> Result<Option<Value>, DecoratorError> + Send + Sync,
{
    fn field(&self) -> &str {
        self.field.as_str()
    }

    fn decorate(
        &self,
        data: &RawMessageData,
        message: &Message,
    ) -> Result<Option<Value>, DecoratorError> {
        (self.decorate)(data, message)
    }
}

/// Copies one raw field verbatim onto the message.
///
/// A missing or `null` raw value is recorded as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyField {
    field: String,
}

impl CopyField {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_owned(),
        }
    }
}

impl Decorator for CopyField {
    fn field(&self) -> &str {
        self.field.as_str()
    }

    fn decorate(
        &self,
        data: &RawMessageData,
        _message: &Message,
    ) -> Result<Option<Value>, DecoratorError> {
        match data.get(&self.field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(value.clone())),
        }
    }
}
