//! Request body that reports its progress to the exchange.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

use crate::entity::Body;
use crate::error::EntityError;
use crate::request::exchange::{BodyEvent, Exchange};

/// Wrap `body` so reads drive the exchange's body state and stop once the
/// response has begun.
pub fn track_body(body: Body, exchange: Arc<Exchange>) -> Body {
    Body::from_stream(TrackedStream {
        inner: body,
        exchange,
        finished: false,
    })
}

struct TrackedStream {
    inner: Body,
    exchange: Arc<Exchange>,
    finished: bool,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, EntityError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if this.exchange.is_responded() {
            return Poll::Ready(Some(Err(EntityError::Responded)));
        }
        this.exchange.record_body(BodyEvent::ReadStarted);
        let poll = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(None) = poll {
            this.finished = true;
            this.exchange.record_body(BodyEvent::Exhausted);
        }
        poll
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        if !self.finished {
            self.exchange.record_body(BodyEvent::Closed);
        }
    }
}
