//! clipweave core: compiles arbitrary HTML + CSS into the clipboard
//! document model of a visual design tool.
//!
//! The pipeline degrades gracefully rather than rejecting input: what
//! the target format can express becomes native style objects and
//! nodes, everything else is preserved as raw code through the embed
//! escape hatch.

pub mod dom;
pub mod graph;
pub mod parser;
pub mod schema;
pub mod style;
pub mod weave_generate;

pub use schema::{ClipDocument, FORMAT_MARKER};
pub use style::dedupe::{ClassRegistry, EmptyRegistry, RegistryError, StaticRegistry};
pub use weave_generate::{
    convert, convert_simple, CancelToken, ConversionResult, ConversionStatus, ConvertError,
    ConvertRequest, Phase, ProgressEvent, SectionInput,
};
