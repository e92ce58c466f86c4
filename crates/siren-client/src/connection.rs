//! Connection lifecycle: open, authenticate, receive, close, reconnect.
//!
//! One persistent WebSocket is owned here. The state machine runs
//! `closed -> connecting -> open -> closed -> ...` forever; every transport
//! fault resolves into the closed state and a single fixed-delay reconnect
//! timer. Nothing here blocks the caller: sends go through an mpsc-fed
//! write task and results surface later as dispatched events.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use siren_types::{AlertRecord, ClientCommand, GeoPoint, Identity, ServerEvent};

use crate::bus::{Channel, EventBus, ObserverId, SyncEvent};
use crate::config::ClientConfig;
use crate::notify;
use crate::reconcile::AlertCollection;
use crate::subscription::InterestSet;

/// Connection state, observable by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Transport-facing state: the live outbound channel plus the reconnect
/// timer flag. At most one timer is ever outstanding.
struct Link {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reconnect_pending: bool,
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    bus: EventBus,
    link: Mutex<Link>,
    identity: Arc<Mutex<Option<Identity>>>,
    alerts: Arc<Mutex<AlertCollection>>,
    interests: Mutex<InterestSet>,
}

/// Handle to the sync client. Cheap to clone; all clones share one
/// connection, one identity, and one alert collection.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

impl SyncClient {
    pub fn new(config: ClientConfig) -> Self {
        let bus = EventBus::new();
        let identity = Arc::new(Mutex::new(None));
        let alerts = Arc::new(Mutex::new(AlertCollection::new()));

        // The reconciler observes every record channel. Registered before
        // any caller observer, so UI callbacks reading `alerts()` always see
        // the post-apply collection.
        for channel in [
            Channel::InitialSnapshot,
            Channel::RecordCreated,
            Channel::RecordUpdated,
            Channel::RecordDeleted,
        ] {
            let alerts = alerts.clone();
            bus.on(channel, move |event| {
                alerts
                    .lock()
                    .expect("alert collection lock poisoned")
                    .apply(event);
            });
        }

        // The notification deriver re-emits onto the notify channel.
        for channel in [Channel::RecordCreated, Channel::RecordUpdated] {
            let identity = identity.clone();
            let bus_handle = bus.clone();
            bus.on(channel, move |event| {
                let identity = identity.lock().expect("identity lock poisoned").clone();
                if let Some(notification) = notify::derive(event, identity.as_ref()) {
                    bus_handle.emit(SyncEvent::Notify(notification));
                }
            });
        }

        Self {
            inner: Arc::new(ClientInner {
                config,
                bus,
                link: Mutex::new(Link {
                    state: ConnectionState::Closed,
                    outbound: None,
                    reconnect_pending: false,
                }),
                identity,
                alerts,
                interests: Mutex::new(InterestSet::new()),
            }),
        }
    }

    /// Open the connection if it is closed and no reconnect timer is
    /// pending. No-op while connecting or open.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Bind `identity` to the connection. Resets the alert collection; the
    /// auth frame goes out now if the link is open, otherwise on the next
    /// successful open (a lost link is re-established immediately unless a
    /// reconnect timer is already pending).
    pub fn authenticate(&self, identity: Identity) {
        info!("authenticating {} ({:?})", identity.id, identity.role);
        *self
            .inner
            .identity
            .lock()
            .expect("identity lock poisoned") = Some(identity.clone());
        self.inner
            .alerts
            .lock()
            .expect("alert collection lock poisoned")
            .clear();

        if self.connection_state() == ConnectionState::Open {
            self.inner.send(&ClientCommand::Auth {
                role: identity.role,
                id: identity.id,
            });
        } else {
            self.inner.start();
        }
    }

    /// Clear the active identity and all interest regions. The connection
    /// itself stays up; it is a process-lifetime resource.
    pub fn deauthenticate(&self) {
        info!("deauthenticating");
        *self
            .inner
            .identity
            .lock()
            .expect("identity lock poisoned") = None;
        self.inner
            .alerts
            .lock()
            .expect("alert collection lock poisoned")
            .clear();
        self.update_location_subscription(None);
    }

    /// Recompute interest regions for a location (`None` on logout) and send
    /// the minimal subscribe/unsubscribe delta. Movement within one geocell
    /// causes no traffic.
    pub fn update_location_subscription(&self, location: Option<GeoPoint>) {
        let delta = self
            .inner
            .interests
            .lock()
            .expect("interest set lock poisoned")
            .rebuild(location, self.inner.config.geocell_precision);

        let Some(delta) = delta else {
            return;
        };
        if !delta.unsubscribe.is_empty() {
            self.inner.send(&ClientCommand::Unsubscribe {
                topics: delta.unsubscribe,
            });
        }
        if !delta.subscribe.is_empty() {
            self.inner.send(&ClientCommand::Subscribe {
                topics: delta.subscribe,
            });
        }
    }

    /// Register an observer on a named channel.
    pub fn on(
        &self,
        channel: Channel,
        observer: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.inner.bus.on(channel, observer)
    }

    /// Unregister an observer.
    pub fn off(&self, channel: Channel, id: ObserverId) -> bool {
        self.inner.bus.off(channel, id)
    }

    /// Snapshot of the current alert collection, most recent first.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.inner
            .alerts
            .lock()
            .expect("alert collection lock poisoned")
            .records()
            .to_vec()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.link.lock().expect("link lock poisoned").state
    }
}

impl ClientInner {
    fn start(self: &Arc<Self>) {
        {
            let mut link = self.link.lock().expect("link lock poisoned");
            if link.state != ConnectionState::Closed || link.reconnect_pending {
                return;
            }
            link.state = ConnectionState::Connecting;
        }
        let inner = self.clone();
        tokio::spawn(async move {
            run_connection(inner).await;
        });
    }

    /// Send a command if the link is open. Otherwise the command is dropped,
    /// not queued: there is no delivery guarantee while disconnected, and
    /// auth plus the full interest set are replayed on reopen anyway.
    fn send(&self, command: &ClientCommand) {
        let json = match serde_json::to_string(command) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to encode command: {e}");
                return;
            }
        };
        let link = self.link.lock().expect("link lock poisoned");
        if link.state == ConnectionState::Open {
            if let Some(tx) = &link.outbound {
                let _ = tx.send(Message::Text(json.into()));
                return;
            }
        }
        debug!("link not open, dropping outbound command");
    }

    fn send_raw(&self, message: Message) {
        let link = self.link.lock().expect("link lock poisoned");
        if let Some(tx) = &link.outbound {
            let _ = tx.send(message);
        }
    }

    /// Transport handshake finished: go open and replay session state —
    /// pending identity first, then the full interest set.
    fn on_transport_open(&self, tx: mpsc::UnboundedSender<Message>) {
        {
            let mut link = self.link.lock().expect("link lock poisoned");
            link.state = ConnectionState::Open;
            link.outbound = Some(tx);
        }

        let identity = self
            .identity
            .lock()
            .expect("identity lock poisoned")
            .clone();
        if let Some(identity) = identity {
            self.send(&ClientCommand::Auth {
                role: identity.role,
                id: identity.id,
            });
        }

        let topics = self
            .interests
            .lock()
            .expect("interest set lock poisoned")
            .topics();
        if !topics.is_empty() {
            self.send(&ClientCommand::Subscribe { topics });
        }
    }

    /// Transport gone (error, remote close, or failed connect): go closed
    /// and arm the reconnect timer unless one is already pending.
    fn on_transport_closed(self: &Arc<Self>) {
        let arm_timer = {
            let mut link = self.link.lock().expect("link lock poisoned");
            link.state = ConnectionState::Closed;
            link.outbound = None;
            if link.reconnect_pending {
                false
            } else {
                link.reconnect_pending = true;
                true
            }
        };

        if arm_timer {
            let inner = self.clone();
            let delay = self.config.reconnect_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner
                    .link
                    .lock()
                    .expect("link lock poisoned")
                    .reconnect_pending = false;
                inner.start();
            });
        }
    }

    /// Decode one inbound text frame and dispatch it. Undecodable frames
    /// (bad JSON, unrecognized type) are logged and discarded; the
    /// connection stays open.
    fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => self.bus.emit(SyncEvent::from(event)),
            Err(e) => {
                warn!(
                    "discarding undecodable frame: {} -- raw: {}",
                    e,
                    truncate_frame(text, 200)
                );
            }
        }
    }
}

/// Truncate a frame for logging to at most `limit` bytes, backing off to the
/// nearest char boundary so multi-byte UTF-8 never splits (and panics).
fn truncate_frame(text: &str, limit: usize) -> &str {
    let mut end = text.len().min(limit);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn run_connection(inner: Arc<ClientInner>) {
    debug!("connecting to {}", inner.config.url);
    match connect_async(inner.config.url.as_str()).await {
        Ok((stream, _)) => {
            info!("connection open");
            let (mut write, mut read) = stream.split();
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
            inner.on_transport_open(tx);

            let mut send_task = tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    if write.send(message).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => inner.handle_frame(text.as_str()),
                        Some(Ok(Message::Ping(payload))) => inner.send_raw(Message::Pong(payload)),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("transport error: {e}");
                            break;
                        }
                    },
                    _ = &mut send_task => break,
                }
            }
            send_task.abort();
            info!("connection closed");
        }
        Err(e) => {
            warn!("connect to {} failed: {e}", inner.config.url);
        }
    }
    inner.on_transport_closed();
}
