//! Response body type
//!
//! Small responses are a single in-memory chunk; file responses stream from
//! disk so only one chunk per connection is held in memory at a time.

use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Read size for streamed files
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Body of every response either service produces
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Body holding `data` in memory
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body that reads `reader` to its end in `STREAM_CHUNK_SIZE` chunks
pub fn stream<R>(reader: R) -> ResponseBody
where
    R: AsyncRead + Send + 'static,
{
    let frames = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).map_ok(Frame::data);
    StreamBody::new(frames).boxed_unsync()
}
