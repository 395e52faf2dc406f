//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by both services, independent of what the
//! services do with the filesystem.

pub mod body;
pub mod cache;
pub mod mime;
pub mod path;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    build_304_response, build_405_response, build_416_response, build_file_response,
    build_health_response, build_options_response, build_partial_response, json_error,
    json_message, json_response, Validators,
};
