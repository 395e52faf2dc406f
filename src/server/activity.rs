// Connection activity module
// Tracks when a connection last moved bytes and how many responses it still owes

use hyper::body::{Body, Frame, SizeHint};
use std::cell::Cell;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;

use crate::config::PerformanceConfig;

/// Per-connection activity, shared between the socket, the service and
/// the response bodies of one connection. Lives on a single `LocalSet` task.
#[derive(Clone)]
pub struct Activity {
    inner: Rc<ActivityState>,
}

struct ActivityState {
    last_io: Cell<Instant>,
    in_flight: Cell<usize>,
}

impl Activity {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ActivityState {
                last_io: Cell::new(Instant::now()),
                in_flight: Cell::new(0),
            }),
        }
    }

    pub fn last_io(&self) -> Instant {
        self.inner.last_io.get()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.get()
    }

    fn touch(&self) {
        self.inner.last_io.set(Instant::now());
    }

    /// Count a response as in flight until the returned guard is dropped
    pub fn begin_response(&self) -> ResponseGuard {
        self.inner.in_flight.set(self.in_flight() + 1);
        ResponseGuard {
            activity: self.clone(),
        }
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ResponseGuard {
    activity: Activity,
}

impl Drop for ResponseGuard {
    fn drop(&mut self) {
        let state = &self.activity.inner;
        state.in_flight.set(state.in_flight.get().saturating_sub(1));
        self.activity.touch();
    }
}

/// Socket wrapper that records every read or write that moved bytes
pub struct TrackedStream<S> {
    inner: S,
    activity: Activity,
}

impl<S> TrackedStream<S> {
    pub const fn new(inner: S, activity: Activity) -> Self {
        Self { inner, activity }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TrackedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(result, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.activity.touch();
        }
        result
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TrackedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            self.activity.touch();
        }
        result
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write_vectored(cx, bufs);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            self.activity.touch();
        }
        result
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Response body that keeps its response counted as in flight until hyper
/// has written the last frame and dropped it
pub struct TrackedBody<B> {
    inner: B,
    _guard: ResponseGuard,
}

impl<B> TrackedBody<B> {
    pub const fn new(inner: B, guard: ResponseGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl<B: Body + Unpin> Body for TrackedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// What the connection watchdog should do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Within limits
    Active,
    /// Kept alive with nothing to do for too long: close gracefully
    Idle,
    /// A response is owed but no byte moved for too long: drop the connection
    Stalled,
}

/// Timeouts applied to one connection. `None` disables a limit.
///
/// None of them bound the total length of a transfer: a slow client that keeps
/// reading is never cut off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Time allowed to receive a complete request head (`read_timeout`)
    pub header_read: Option<Duration>,
    /// Idle time between requests before the connection is closed (`keep_alive_timeout`)
    pub keep_alive: Option<Duration>,
    /// Time without progress while a response is in flight (`write_timeout`)
    pub stall: Option<Duration>,
}

const fn secs(n: u64) -> Option<Duration> {
    if n > 0 {
        Some(Duration::from_secs(n))
    } else {
        None
    }
}

impl ConnectionLimits {
    pub const fn from_config(perf: &PerformanceConfig) -> Self {
        Self {
            header_read: secs(perf.read_timeout),
            keep_alive: secs(perf.keep_alive_timeout),
            stall: secs(perf.write_timeout),
        }
    }

    pub fn check(&self, in_flight: usize, since_io: Duration) -> Verdict {
        if in_flight > 0 {
            match self.stall {
                Some(limit) if since_io >= limit => Verdict::Stalled,
                _ => Verdict::Active,
            }
        } else {
            match self.keep_alive {
                Some(limit) if since_io >= limit => Verdict::Idle,
                _ => Verdict::Active,
            }
        }
    }

    /// When the watchdog should look again; `None` means never
    pub fn next_deadline(&self, in_flight: usize, last_io: Instant, closing: bool) -> Option<Instant> {
        let wait = if in_flight > 0 {
            self.stall
        } else if closing {
            None
        } else {
            self.keep_alive
        };
        wait.map(|w| last_io + w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn limits() -> ConnectionLimits {
        ConnectionLimits {
            header_read: Some(Duration::from_secs(5)),
            keep_alive: Some(Duration::from_secs(10)),
            stall: Some(Duration::from_secs(3)),
        }
    }

    #[test]
    fn test_from_config_zero_disables() {
        let perf = PerformanceConfig {
            keep_alive_timeout: 0,
            read_timeout: 30,
            write_timeout: 0,
            max_connections: None,
        };
        let limits = ConnectionLimits::from_config(&perf);
        assert_eq!(limits.header_read, Some(Duration::from_secs(30)));
        assert_eq!(limits.keep_alive, None);
        assert_eq!(limits.stall, None);
    }

    #[test]
    fn test_check_verdicts() {
        let limits = limits();
        assert_eq!(limits.check(0, Duration::from_secs(9)), Verdict::Active);
        assert_eq!(limits.check(0, Duration::from_secs(10)), Verdict::Idle);
        // an in-flight response is judged by progress, not by idle time
        assert_eq!(limits.check(1, Duration::from_secs(2)), Verdict::Active);
        assert_eq!(limits.check(1, Duration::from_secs(3)), Verdict::Stalled);
    }

    #[test]
    fn test_next_deadline() {
        let limits = limits();
        let now = Instant::now();
        assert_eq!(limits.next_deadline(0, now, false), Some(now + Duration::from_secs(10)));
        assert_eq!(limits.next_deadline(2, now, false), Some(now + Duration::from_secs(3)));
        assert_eq!(limits.next_deadline(0, now, true), None);
        assert_eq!(limits.next_deadline(1, now, true), Some(now + Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_stream_records_progress() {
        let activity = Activity::new();
        let start = activity.last_io();
        let (client, server) = tokio::io::duplex(64);
        let mut tracked = TrackedStream::new(server, activity.clone());
        let mut client = client;

        tokio::time::sleep(Duration::from_millis(5)).await;
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        tracked.read_exact(&mut buf).await.unwrap();
        let after_read = activity.last_io();
        assert!(after_read > start);

        tokio::time::sleep(Duration::from_millis(5)).await;
        tracked.write_all(b"pong").await.unwrap();
        assert!(activity.last_io() > after_read);
    }

    #[tokio::test]
    async fn test_body_guard_counts_in_flight() {
        let activity = Activity::new();
        let body = TrackedBody::new(
            http_body_util::Full::new(Bytes::from_static(b"abc")),
            activity.begin_response(),
        );
        assert_eq!(activity.in_flight(), 1);

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes, "abc");
        assert_eq!(activity.in_flight(), 0);
    }
}
