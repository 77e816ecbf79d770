//! The long-lived subscription to the node's event stream.

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::fetch::Fetcher;
use crate::oracle::Transition;
use crate::report::Reporter;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Connect to the event stream at `uri` and dispatch messages until the
/// stream closes.
///
/// The connection is established exactly once: an initial failure is returned
/// to the caller (fatal to the process), while a close of an established
/// stream is a normal shutdown. Messages are pulled one at a time in receipt
/// order; each dispatched verification runs concurrently with the next
/// receive.
pub async fn listen<F, T, R>(uri: &str, dispatcher: Dispatcher<F, T, R>) -> Result<(), Error>
where
    F: Fetcher,
    T: Transition,
    R: Reporter,
{
    let (mut stream, _) = connect_async(uri).await?;
    info!(uri, "connected to event stream");
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => dispatcher.dispatch(&text),
            Message::Close(_) => {
                info!("event stream closed by server");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => debug!(?other, "ignoring non-text frame"),
        }
    }
    info!("event stream ended");
    Ok(())
}
