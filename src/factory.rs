//!
//! This module defines MessageFactory, which turns raw message data into immutable messages and lets extensions
//! enrich them through registered decorators.
//!
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

use crate::config::FactoryConfig;
use crate::decorator::Decorator;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{DecoratorError, FactoryError, FactoryResult};
use crate::message::{self, AuxiliaryField, Message, RawMessageData};

type Decorators = Arc<Vec<Arc<dyn Decorator>>>;

/// MessageFactory owns the ordered decorator list.
///
/// Registration replaces the list copy-on-write, so a construction that already took its snapshot keeps running
/// against the decorators that were registered when it started.
pub struct MessageFactory {
    decorators: RwLock<Decorators>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl MessageFactory {
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            decorators: RwLock::new(Arc::new(Vec::new())),
            diagnostics,
        }
    }

    /// Create a factory with the configured built-in decorators registered in configuration order.
    ///
    /// # Errors
    /// Raise FactoryError::Config if the configuration does not validate.
    pub fn from_config(config: &FactoryConfig) -> FactoryResult<Self> {
        config.validate()?;
        let factory = Self::new();
        config
            .decorators
            .iter()
            .for_each(|decorator| factory.register_shared(decorator.build()));
        Ok(factory)
    }

    /// Append a decorator to the end of the list.
    ///
    /// Registering a decorator for a field that already has one is allowed; both run and the later one wins.
    pub fn register_decorator<D: Decorator + 'static>(&self, decorator: D) {
        self.register_shared(Arc::new(decorator));
    }

    /// Same as [`register_decorator`](Self::register_decorator) for an already shared decorator.
    pub fn register_shared(&self, decorator: Arc<dyn Decorator>) {
        let mut guard = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(
            field = decorator.field(),
            position = guard.len(),
            "Registering message decorator"
        );
        Arc::make_mut(&mut *guard).push(decorator);
    }

    pub fn decorator_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Remove every registered decorator. Constructions in flight are not affected.
    pub fn clear(&self) {
        let mut guard = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(Vec::new());
    }

    /// Construct a message: base fields first, then every decorator in registration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_message_factory::audit::AttachmentAuditDecorator;
    /// use chat_message_factory::factory::MessageFactory;
    /// use serde_json::json;
    ///
    /// let factory = MessageFactory::new();
    /// factory.register_decorator(AttachmentAuditDecorator);
    /// let message = factory
    ///     .construct_value(&json!({"id": 1, "body": "Received ORDERS.EDI"}))
    ///     .unwrap();
    /// assert!(message.auxiliary("edi_attachment_audit_ids").unwrap().is_absent());
    /// ```
    ///
    /// # Errors
    /// Raise FactoryError::InvalidInput if a base-required field is missing or malformed. Decorator failures
    /// never surface here; they are reported to diagnostics and the field is recorded as absent.
    pub fn construct(&self, data: &RawMessageData) -> FactoryResult<Message> {
        let decorators = self.snapshot();
        self.construct_with(&decorators, data)
    }

    /// Construct from a JSON value, which must be an object.
    pub fn construct_value(&self, value: &Value) -> FactoryResult<Message> {
        match value {
            Value::Object(data) => self.construct(data),
            other => Err(FactoryError::InvalidInput(format!(
                "message data must be a JSON object, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Construct a batch of messages against a single snapshot of the decorator list.
    ///
    /// # Errors
    /// Stops at the first invalid entry.
    pub fn construct_batch<'a, I>(&self, batch: I) -> FactoryResult<Vec<Message>>
    where
        I: IntoIterator<Item = &'a RawMessageData>,
    {
        let decorators = self.snapshot();
        batch
            .into_iter()
            .map(|data| self.construct_with(&decorators, data))
            .collect()
    }

    fn snapshot(&self) -> Decorators {
        let guard = self
            .decorators
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn construct_with(
        &self,
        decorators: &[Arc<dyn Decorator>],
        data: &RawMessageData,
    ) -> FactoryResult<Message> {
        let mut message = Message::from_raw(data)?;
        for decorator in decorators {
            let field = decorator.field();
            match invoke(decorator.as_ref(), data, &message) {
                Ok(value) => message.set_auxiliary(field, AuxiliaryField::from(value)),
                Err(error) => {
                    // Base fields are never overwritten, not even with the absent marker.
                    if !matches!(error, DecoratorError::Reserved(_)) {
                        message.set_auxiliary(field, AuxiliaryField::Absent);
                    }
                    self.diagnostics
                        .decorator_failed(message.id(), field, &error);
                }
            }
        }
        debug!(
            message_id = message.id(),
            decorators = decorators.len(),
            "Constructed message"
        );
        Ok(message)
    }
}

fn invoke(
    decorator: &dyn Decorator,
    data: &RawMessageData,
    message: &Message,
) -> Result<Option<Value>, DecoratorError> {
    if message::is_base_field(decorator.field()) {
        return Err(DecoratorError::Reserved(decorator.field().to_owned()));
    }
    panic::catch_unwind(AssertUnwindSafe(|| decorator.decorate(data, message)))
        .unwrap_or_else(|payload| Err(DecoratorError::Panicked(panic_reason(payload.as_ref()))))
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        return (*reason).to_owned();
    }
    if let Some(reason) = payload.downcast_ref::<String>() {
        return reason.clone();
    }
    "unknown panic payload".to_owned()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Default for MessageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decorators = self.snapshot();
        f.debug_struct("MessageFactory")
            .field(
                "decorators",
                &decorators
                    .iter()
                    .map(|decorator| decorator.field())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Process-wide factory.
///
/// Extensions register their decorators once during startup; everything else only constructs. Call
/// [`MessageFactory::clear`] on teardown.
pub fn global() -> &'static MessageFactory {
    static GLOBAL: OnceLock<MessageFactory> = OnceLock::new();
    GLOBAL.get_or_init(MessageFactory::new)
}
