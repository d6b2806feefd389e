//! Bounded producer/consumer pipe between an upstream body and a client.
//!
//! The producer task pulls chunks from upstream and pushes them into a
//! bounded channel. It suspends while the channel is full, so a slow client
//! throttles upstream reads instead of growing a buffer. Dropping the
//! consumer closes the channel and the producer stops reading.

use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Error)]
#[error("upstream body failed: {0}")]
pub struct RelayError(pub String);

pub type RelayStream = BoxStream<'static, Result<Bytes, RelayError>>;

pub fn pipe<S, E>(upstream: S, capacity: usize) -> RelayStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut upstream = Box::pin(upstream);
        while let Some(chunk) = upstream.next().await {
            let chunk = chunk.map_err(|e| RelayError(e.to_string()));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() {
                debug!("Client went away, stopping upstream read");
                return;
            }
            if failed {
                return;
            }
        }
    });

    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}
