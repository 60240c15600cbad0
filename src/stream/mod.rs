//! Event stream parsing: turns a raw byte stream into normalized,
//! back-pressured [`StreamEvent`]s.

mod events;
mod parser;

pub use events::{EventKind, StreamError, StreamEvent};
pub use parser::StreamParser;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::transport::TransportError;

/// An item delivered on the channel returned by [`drive`]: either a parsed
/// event, a parser-level error, or a transport failure that ends the stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Drains `byte_stream` through a [`StreamParser`], delivering every
/// produced event on a bounded `tokio::sync::mpsc` channel of the given
/// capacity. The returned receiver provides the backpressure: a slow
/// consumer stalls the underlying HTTP read, never buffers unboundedly.
pub fn drive(
    mut byte_stream: impl Stream<Item = Result<Bytes, TransportError>> + Unpin + Send + 'static,
    max_line_bytes: usize,
    channel_capacity: usize,
) -> mpsc::Receiver<Result<StreamEvent, DeliveryError>> {
    let (tx, rx) = mpsc::channel(channel_capacity);

    tokio::spawn(async move {
        use futures::StreamExt;

        let mut parser = StreamParser::new(max_line_bytes);
        loop {
            match byte_stream.next().await {
                Some(Ok(chunk)) => {
                    for result in parser.feed(&chunk) {
                        let mapped = result.map_err(DeliveryError::from);
                        if tx.send(mapped).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Err(err)) => {
                    let _ = tx
                        .send(Err(DeliveryError::Transport(err.to_string())))
                        .await;
                    return;
                }
                None => {
                    for result in parser.finish() {
                        let mapped = result.map_err(DeliveryError::from);
                        if tx.send(mapped).await.is_err() {
                            return;
                        }
                    }
                    return;
                }
            }
        }
    });

    rx
}
