//! TCP change-feed server
//!
//! Fans the payload-free "lobbies changed" signal out to every
//! subscribed client. Delivery is best-effort: a slow subscriber may
//! see signals coalesced, which is harmless because clients respond by
//! re-fetching full lobby state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use muster_core::Notifier;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Maximum number of subscribed clients
const MAX_SUBSCRIBERS: usize = 64;

/// Buffered change signals; a lagging subscriber coalesces the overflow
const CHANGE_QUEUE: usize = 16;

/// Keepalive ping interval in milliseconds
const HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Connected subscriber state
struct Subscriber {
    display_name: String,
    tx: mpsc::Sender<Message>,
}

struct FeedState {
    subscribers: HashMap<Uuid, Subscriber>,
}

/// Sync handle implementing the core `Notifier` against a running feed.
///
/// Cheap to clone; hand one to the membership engine at construction.
#[derive(Clone)]
pub struct ChangeFeed {
    changed_tx: broadcast::Sender<()>,
}

impl Notifier for ChangeFeed {
    fn lobbies_changed(&self) {
        // Send only fails when nobody is subscribed; not a failure here
        if self.changed_tx.send(()).is_err() {
            debug!("Change signal dropped, no live subscribers");
        }
    }
}

/// Change-feed server handle
pub struct FeedServer {
    addr: SocketAddr,
    state: Arc<RwLock<FeedState>>,
    changed_tx: broadcast::Sender<()>,
    shutdown_tx: broadcast::Sender<()>,
}

impl FeedServer {
    /// Start a feed server on the given port (0 picks a free one)
    pub async fn start(port: u16) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Change feed started");

        let (changed_tx, _) = broadcast::channel(CHANGE_QUEUE);
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(RwLock::new(FeedState {
            subscribers: HashMap::new(),
        }));

        tokio::spawn(accept_loop(
            listener,
            state.clone(),
            changed_tx.clone(),
            shutdown_tx.subscribe(),
        ));
        tokio::spawn(heartbeat_task(state.clone(), shutdown_tx.subscribe()));

        Ok(FeedServer {
            addr: bound_addr,
            state,
            changed_tx,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Notifier handle for the membership engine
    pub fn feed(&self) -> ChangeFeed {
        ChangeFeed {
            changed_tx: self.changed_tx.clone(),
        }
    }

    /// Number of currently subscribed clients
    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    /// Tell subscribers the feed is going away and stop accepting
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        let state = self.state.read().await;
        for sub in state.subscribers.values() {
            let _ = sub.tx.send(Message::ServerShutdown).await;
        }
        info!("Change feed shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<FeedState>>,
    changed_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let state = state.clone();
                        // Subscribe before the handshake so no signal
                        // sent during it can be missed
                        let changed_rx = changed_tx.subscribe();
                        tokio::spawn(handle_connection(stream, addr, state, changed_rx));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single subscriber connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<RwLock<FeedState>>,
    changed_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let (client_id, tx, rx) = match handle_subscribe(&mut reader, &state).await {
        Ok(admitted) => admitted,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Subscription failed");
            let reject = Message::SubscribeRejected {
                reason: e.to_string(),
            };
            let _ = write_frame(&mut writer, &reject).await;
            return;
        }
    };

    info!(addr = %addr, client_id = %client_id, "Subscriber joined");

    let writer_handle = tokio::spawn(writer_task(writer, rx, changed_rx));
    let _ = tx.send(Message::Subscribed).await;

    // Read loop: the feed is one-way, clients only ping
    loop {
        match read_frame(&mut reader).await {
            Ok(Message::Ping) => {
                let _ = tx.send(Message::Pong).await;
            }
            Ok(Message::Pong) => {}
            Ok(other) => {
                debug!(client_id = %client_id, ?other, "Ignoring unexpected message");
            }
            Err(Error::ConnectionClosed) => {
                debug!(client_id = %client_id, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Read error");
                break;
            }
        }
    }

    writer_handle.abort();
    if let Some(sub) = state.write().await.subscribers.remove(&client_id) {
        debug!(client_id = %client_id, name = %sub.display_name, "Subscriber removed");
    }

    info!(client_id = %client_id, "Subscriber disconnected");
}

/// Validate the handshake and register the subscriber
async fn handle_subscribe(
    reader: &mut ReadHalf<TcpStream>,
    state: &Arc<RwLock<FeedState>>,
) -> Result<(Uuid, mpsc::Sender<Message>, mpsc::Receiver<Message>)> {
    let msg = read_frame(reader).await?;

    match msg {
        Message::Subscribe {
            client_id,
            display_name,
        } => {
            let mut s = state.write().await;

            if s.subscribers.len() >= MAX_SUBSCRIBERS {
                return Err(Error::FeedFull);
            }
            if s.subscribers.contains_key(&client_id) {
                return Err(Error::Rejected("Already subscribed".into()));
            }

            let (tx, rx) = mpsc::channel(16);
            s.subscribers.insert(
                client_id,
                Subscriber {
                    display_name,
                    tx: tx.clone(),
                },
            );

            Ok((client_id, tx, rx))
        }
        _ => Err(Error::Protocol("Expected Subscribe".into())),
    }
}

/// Writer task - interleaves direct replies with fanned-out signals
async fn writer_task(
    mut writer: WriteHalf<TcpStream>,
    mut rx: mpsc::Receiver<Message>,
    mut changed_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(msg) => {
                        if write_frame(&mut writer, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            changed = changed_rx.recv() => {
                match changed {
                    // Lagged still means "something changed"; one
                    // coalesced signal is enough
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if write_frame(&mut writer, &Message::LobbiesChanged).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Heartbeat task - pings all subscribers so dead peers surface
async fn heartbeat_task(state: Arc<RwLock<FeedState>>, mut shutdown_rx: broadcast::Receiver<()>) {
    let interval = std::time::Duration::from_millis(HEARTBEAT_INTERVAL_MS);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let s = state.read().await;
                for sub in s.subscribers.values() {
                    let _ = sub.tx.send(Message::Ping).await;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Heartbeat task shutting down");
                break;
            }
        }
    }
}
