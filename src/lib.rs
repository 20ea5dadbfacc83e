//! # jqpipe
//!
//! Run jq filters over Rust values and stream the results as JSON, YAML or
//! callbacks.
//!
//! Any `serde::Serialize` value can be the input of a [`Pipeline`]. The input
//! is normalized into the jq value model, the query runs lazily, and each
//! result is handed to an [`Encoder`] or a callback as soon as it is produced.
//!
//! ## Quick Start
//!
//! ```
//! use jqpipe::{Context, ExecuteOptions, Format, Pipeline};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(".items[] | select(.active)")?;
//! let input = json!({
//!     "items": [
//!         {"id": 1, "active": true},
//!         {"id": 2, "active": false},
//!         {"id": 3, "active": true},
//!     ]
//! });
//!
//! let mut out = Vec::new();
//! pipeline.execute(
//!     &Context::background(),
//!     &input,
//!     ExecuteOptions::new().writer(&mut out, Format::Json),
//! )?;
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "{\"active\":true,\"id\":1}\n{\"active\":true,\"id\":3}\n"
//! );
//! # Ok::<(), jqpipe::Error>(())
//! ```
//!
//! ## Consuming results
//!
//! | Option | Results go to |
//! |--------|---------------|
//! | [`ExecuteOptions::writer`] | the built-in [`JsonEncoder`] or [`YamlEncoder`] |
//! | [`ExecuteOptions::encoder`] | any [`Encoder`] |
//! | [`ExecuteOptions::callback`] | a closure receiving each [`Value`] |
//!
//! Exactly one of encoder (or writer) and callback must be given.
//!
//! ## Features
//!
//! - `message` (default) - render protobuf messages with the protobuf JSON
//!   mapping, see [`marshal::message`]
//! - `cli` - build the `jqpipe` command-line tool

pub mod context;
pub mod encode;
pub mod error;
pub mod marshal;
pub mod normalize;
pub mod options;
pub mod pipeline;
mod query;
pub mod value;

pub use context::{Context, Interrupt};
pub use encode::{Encoder, JsonEncoder, YamlEncoder};
pub use error::{BoxError, ConversionError, Error, QueryCause, QueryError, TimeoutError};
pub use marshal::{Input, InputMarshaler};
pub use normalize::{NormalizeError, Normalizer};
pub use options::{
    CompilerOption, EncodeOption, ExecuteOptions, Format, JsonStyle, MarshalFn, DEFAULT_TIMEOUT,
};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use value::Value;

#[cfg(feature = "message")]
pub use marshal::message::{MessageMarshaler, MessageOptions};
