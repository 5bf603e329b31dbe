//! Change-feed subscriber client
//!
//! Subscribes to a feed server and surfaces its signals as events.
//! On `Changed` the caller is expected to re-fetch full lobby state
//! through the API, so replayed or coalesced signals need no handling.

use std::net::SocketAddr;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Event received from the feed
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Subscription accepted
    Subscribed,
    /// Subscription turned away
    Rejected { reason: String },
    /// Lobby state changed somewhere; re-fetch
    Changed,
    /// Server is shutting down
    ServerShutdown,
    /// Connection lost
    Disconnected,
}

/// Client handle for a feed subscription
pub struct FeedClient {
    event_rx: mpsc::Receiver<FeedEvent>,
}

impl FeedClient {
    /// Connect to a feed server and subscribe
    pub async fn connect(addr: SocketAddr, client_id: Uuid, display_name: String) -> Result<Self> {
        info!(addr = %addr, client_id = %client_id, "Connecting to change feed");

        let stream = TcpStream::connect(addr).await?;
        let (reader, mut writer) = tokio::io::split(stream);

        let subscribe = Message::Subscribe {
            client_id,
            display_name,
        };
        write_frame(&mut writer, &subscribe).await?;

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(feed_task(reader, writer, event_tx));

        Ok(Self { event_rx })
    }

    /// Next event from the feed; `None` once the connection task ends
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }
}

/// Connection task - turns frames into events, answers keepalives
async fn feed_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    event_tx: mpsc::Sender<FeedEvent>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Message::Subscribed) => {
                if event_tx.send(FeedEvent::Subscribed).await.is_err() {
                    break;
                }
            }
            Ok(Message::SubscribeRejected { reason }) => {
                let _ = event_tx.send(FeedEvent::Rejected { reason }).await;
                break;
            }
            Ok(Message::LobbiesChanged) => {
                if event_tx.send(FeedEvent::Changed).await.is_err() {
                    break;
                }
            }
            Ok(Message::Ping) => {
                if write_frame(&mut writer, &Message::Pong).await.is_err() {
                    break;
                }
            }
            Ok(Message::ServerShutdown) => {
                let _ = event_tx.send(FeedEvent::ServerShutdown).await;
                break;
            }
            Ok(other) => {
                debug!(?other, "Ignoring unexpected message");
            }
            Err(Error::ConnectionClosed) => {
                let _ = event_tx.send(FeedEvent::Disconnected).await;
                break;
            }
            Err(e) => {
                warn!(error = %e, "Feed read error");
                let _ = event_tx.send(FeedEvent::Disconnected).await;
                break;
            }
        }
    }
}
