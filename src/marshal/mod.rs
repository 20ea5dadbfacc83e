//! Input marshaling strategies.
//!
//! A pipeline converts its input (and every query variable) into a [`Value`]
//! through one marshaling strategy, chosen when the pipeline is built:
//!
//! - the default strategy runs the [`Normalizer`], except that with the
//!   `message` feature it first renders `DynamicMessage` inputs (and their
//!   `Vec`, `Option`, `Box` and map shapes) with proto field names;
//! - the structured-message strategy (`message` feature) renders protobuf
//!   messages the way their JSON mapping prescribes and falls back to the
//!   normalizer for everything else;
//! - a caller-supplied [`InputMarshaler`] replaces both.

#[cfg(feature = "message")]
pub mod message;

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::BoxError;
use crate::normalize::{NormalizeError, Normalizer};
use crate::value::Value;

#[cfg(feature = "message")]
use message::MessageMarshaler;

/// A value that can be fed to a pipeline as input or variable.
///
/// Implemented for every `Serialize + 'static` type. [`as_any`](Input::as_any)
/// lets marshalers check for concrete types they handle specially.
pub trait Input {
    /// Normalize this value with `normalizer`.
    fn normalize(&self, normalizer: &Normalizer) -> Result<Value, NormalizeError>;

    /// This value as `Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Rust type name, used in conversion errors.
    fn type_name(&self) -> &'static str;
}

impl<T: Serialize + Any> Input for T {
    fn normalize(&self, normalizer: &Normalizer) -> Result<Value, NormalizeError> {
        normalizer.normalize(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// Converts pipeline inputs into [`Value`]s.
///
/// `normalizer` carries the custom marshalers from the merged encode options;
/// implementations that do not handle an input themselves should delegate to
/// [`Normalizer::normalize_input`].
pub trait InputMarshaler: Send + Sync {
    fn marshal(&self, input: &dyn Input, normalizer: &Normalizer) -> Result<Value, BoxError>;
}

impl<F> InputMarshaler for F
where
    F: Fn(&dyn Input, &Normalizer) -> Result<Value, BoxError> + Send + Sync,
{
    fn marshal(&self, input: &dyn Input, normalizer: &Normalizer) -> Result<Value, BoxError> {
        self(input, normalizer)
    }
}

/// The marshaling strategy of a pipeline.
#[derive(Clone, Default)]
pub(crate) enum MarshalStrategy {
    #[default]
    Default,
    #[cfg(feature = "message")]
    Message(MessageMarshaler),
    Custom(Arc<dyn InputMarshaler>),
}

impl MarshalStrategy {
    pub(crate) fn marshal(
        &self,
        input: &dyn Input,
        normalizer: &Normalizer,
    ) -> Result<Value, BoxError> {
        match self {
            MarshalStrategy::Default => default_marshal(input, normalizer),
            #[cfg(feature = "message")]
            MarshalStrategy::Message(m) => m.marshal(input, normalizer),
            MarshalStrategy::Custom(m) => m.marshal(input, normalizer),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            MarshalStrategy::Default => "default",
            #[cfg(feature = "message")]
            MarshalStrategy::Message(_) => "message",
            MarshalStrategy::Custom(_) => "custom",
        }
    }
}

#[cfg(feature = "message")]
fn default_marshal(input: &dyn Input, normalizer: &Normalizer) -> Result<Value, BoxError> {
    MessageMarshaler::default().marshal(input, normalizer)
}

#[cfg(not(feature = "message"))]
fn default_marshal(input: &dyn Input, normalizer: &Normalizer) -> Result<Value, BoxError> {
    Ok(normalizer.normalize_input(input)?)
}

impl fmt::Debug for MarshalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "message")]
            MarshalStrategy::Message(m) => f.debug_tuple("Message").field(m).finish(),
            other => f.write_str(other.name()),
        }
    }
}
