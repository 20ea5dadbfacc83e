//! Structured protobuf messages as pipeline input.
//!
//! [`MessageMarshaler`] recognizes protobuf messages among the pipeline's
//! inputs and renders them following the protobuf JSON mapping, with the
//! field naming, default-field and enum rendering chosen in
//! [`MessageOptions`]. Inputs that are not messages go through the regular
//! [`Normalizer`].
//!
//! `DynamicMessage` is always recognized. Generated message types are
//! recognized once registered with [`MessageMarshaler::register`]. For each
//! recognized message type `M`, these shapes are handled:
//!
//! - `M`, `Box<M>`
//! - `Option<M>` (`None` becomes null)
//! - `Vec<M>`
//! - `HashMap<String, M>`, `BTreeMap<String, M>`, `IndexMap<String, M>`

use core::any::Any;
use core::fmt;
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use prost_reflect::{DynamicMessage, ReflectMessage, SerializeOptions};

use super::{Input, InputMarshaler};
use crate::error::BoxError;
use crate::normalize::{NormalizeError, Normalizer, ValueSerializer};
use crate::value::Value;

/// Rendering options for protobuf messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOptions {
    /// Use the field names from the `.proto` file instead of lowerCamelCase.
    pub use_proto_names: bool,
    /// Emit fields that hold their default value.
    pub emit_unpopulated: bool,
    /// Render enum values as numbers instead of names.
    pub use_enum_numbers: bool,
}

impl Default for MessageOptions {
    fn default() -> Self {
        MessageOptions {
            use_proto_names: true,
            emit_unpopulated: false,
            use_enum_numbers: false,
        }
    }
}

impl MessageOptions {
    fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::new()
            .use_proto_field_name(self.use_proto_names)
            .skip_default_fields(!self.emit_unpopulated)
            .use_enum_numbers(self.use_enum_numbers)
    }
}

type Matcher = fn(&dyn Any, &Normalizer, &SerializeOptions) -> Option<Result<Value, NormalizeError>>;

/// Marshaling strategy that renders protobuf messages with the protobuf JSON
/// mapping.
#[derive(Clone)]
pub struct MessageMarshaler {
    options: MessageOptions,
    serialize: SerializeOptions,
    matchers: Vec<Matcher>,
}

impl MessageMarshaler {
    /// Recognize `DynamicMessage` inputs, rendered with `options`.
    pub fn new(options: MessageOptions) -> Self {
        MessageMarshaler {
            options,
            serialize: options.serialize_options(),
            matchers: vec![try_render::<DynamicMessage>],
        }
    }

    /// Also recognize inputs of the generated message type `M`.
    pub fn register<M: ReflectMessage + 'static>(mut self) -> Self {
        self.matchers.push(try_render::<M>);
        self
    }

    pub fn options(&self) -> &MessageOptions {
        &self.options
    }

    /// Render `input` if it is a recognized message shape.
    fn render(&self, input: &dyn Any, normalizer: &Normalizer) -> Option<Result<Value, NormalizeError>> {
        self.matchers
            .iter()
            .find_map(|matcher| matcher(input, normalizer, &self.serialize))
    }
}

impl Default for MessageMarshaler {
    fn default() -> Self {
        MessageMarshaler::new(MessageOptions::default())
    }
}

impl InputMarshaler for MessageMarshaler {
    fn marshal(&self, input: &dyn Input, normalizer: &Normalizer) -> Result<Value, BoxError> {
        match self.render(input.as_any(), normalizer) {
            Some(rendered) => {
                tracing::trace!(type_name = input.type_name(), "rendering protobuf message");
                Ok(rendered?)
            }
            None => Ok(normalizer.normalize_input(input)?),
        }
    }
}

impl fmt::Debug for MessageMarshaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageMarshaler")
            .field("options", &self.options)
            .field("message_types", &self.matchers.len())
            .finish()
    }
}

fn try_render<M: ReflectMessage + 'static>(
    any: &dyn Any,
    normalizer: &Normalizer,
    options: &SerializeOptions,
) -> Option<Result<Value, NormalizeError>> {
    if let Some(msg) = any.downcast_ref::<M>() {
        return Some(render_message(msg, normalizer, options));
    }
    if let Some(msg) = any.downcast_ref::<Box<M>>() {
        return Some(render_message(msg.as_ref(), normalizer, options));
    }
    if let Some(opt) = any.downcast_ref::<Option<M>>() {
        return Some(match opt {
            Some(msg) => render_message(msg, normalizer, options),
            None => Ok(Value::Null),
        });
    }
    if let Some(list) = any.downcast_ref::<Vec<M>>() {
        return Some(
            list.iter()
                .map(|msg| render_message(msg, normalizer, options))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        );
    }
    if let Some(map) = any.downcast_ref::<HashMap<String, M>>() {
        return Some(render_map(map.iter(), normalizer, options));
    }
    if let Some(map) = any.downcast_ref::<BTreeMap<String, M>>() {
        return Some(render_map(map.iter(), normalizer, options));
    }
    if let Some(map) = any.downcast_ref::<IndexMap<String, M>>() {
        return Some(render_map(map.iter(), normalizer, options));
    }
    None
}

fn render_map<'m, M: ReflectMessage + 'static>(
    entries: impl Iterator<Item = (&'m String, &'m M)>,
    normalizer: &Normalizer,
    options: &SerializeOptions,
) -> Result<Value, NormalizeError> {
    entries
        .map(|(k, msg)| Ok((k.clone(), render_message(msg, normalizer, options)?)))
        .collect::<Result<IndexMap<_, _>, NormalizeError>>()
        .map(Value::Object)
}

fn render_message<M: ReflectMessage + 'static>(
    msg: &M,
    normalizer: &Normalizer,
    options: &SerializeOptions,
) -> Result<Value, NormalizeError> {
    let serializer = ValueSerializer::new(normalizer);
    match (msg as &dyn Any).downcast_ref::<DynamicMessage>() {
        Some(dynamic) => dynamic.serialize_with_options(serializer, options),
        None => msg
            .transcode_to_dynamic()
            .serialize_with_options(serializer, options),
    }
}
