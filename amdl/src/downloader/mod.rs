//! Stream resolution and the external programs that fetch and tag media.

pub mod engine;
mod resolver;

pub use engine::{ExternalTool, FetchRequest, FetchSource, ProcessTool, TagRequest};
pub use resolver::{ManifestResolver, ResolvedStream, ResolvedVideo, StreamResolver};
