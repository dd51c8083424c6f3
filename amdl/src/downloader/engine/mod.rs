mod process;
mod traits;

pub use process::ProcessTool;
pub use traits::{ExternalTool, FetchRequest, FetchSource, TagRequest};
