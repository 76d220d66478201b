use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender};
use futures_util::{SinkExt, StreamExt};
use once_cell::sync::Lazy;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::ClientResult;
use crate::logger::Logger;
use crate::notifications::model::ConnectionStatus;
use crate::notifications::protocol::{parse_frame, InboundFrame, NormalizeContext, HISTORY_REQUEST};
use crate::notifications::store::NotificationStore;
use crate::platform::runtime::{sleep, spawn_task, TaskHandle};
use crate::util::BackoffConfig;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("escrow-client/notifications"));

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Resolves the socket URL for each connection attempt, so a refreshed access
/// token is used on reconnect.
pub type EndpointFn = Arc<dyn Fn() -> ClientResult<Url> + Send + Sync>;

/// Keeps one notification WebSocket open and feeds a [`NotificationStore`].
///
/// Every (re)connection sends a history request; the history response
/// replaces the store, so replayed notifications never appear twice.
#[derive(Clone)]
pub struct NotificationListener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    store: NotificationStore,
    endpoint: EndpointFn,
    reconnect: BackoffConfig,
    max_reconnect_attempts: Option<u32>,
    fallback_user_id: AtomicI64,
    status: Mutex<ConnectionStatus>,
    running: Mutex<Option<Running>>,
}

struct Running {
    shutdown: Sender<()>,
    task: TaskHandle,
}

enum ConnectionEnd {
    Shutdown,
    /// `delivered` is set once the server sent at least one data frame; only
    /// such a connection resets the reconnect backoff.
    Lost { reason: String, delivered: bool },
}

impl std::fmt::Debug for NotificationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationListener")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl NotificationListener {
    pub fn new(
        store: NotificationStore,
        endpoint: EndpointFn,
        reconnect: BackoffConfig,
        max_reconnect_attempts: Option<u32>,
    ) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                store,
                endpoint,
                reconnect,
                max_reconnect_attempts,
                fallback_user_id: AtomicI64::new(0),
                status: Mutex::new(ConnectionStatus::Idle),
                running: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.inner.store
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.lock().unwrap()
    }

    /// User id stamped on records that arrive without one.
    pub fn set_fallback_user_id(&self, user_id: i64) {
        self.inner.fallback_user_id.store(user_id, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Starts the connection loop. No-op while a loop is already running.
    pub fn connect(&self) {
        let mut running = self.inner.running.lock().unwrap();
        if running
            .as_ref()
            .is_some_and(|current| !current.task.is_finished())
        {
            return;
        }

        let (shutdown, shutdown_rx) = async_channel::bounded(1);
        let inner = self.inner.clone();
        let task = spawn_task(async move {
            run(inner, shutdown_rx).await;
        });
        *running = Some(Running { shutdown, task });
    }

    /// Stops the loop and closes the socket with a close frame.
    pub fn disconnect(&self) {
        let Some(running) = self.inner.running.lock().unwrap().take() else {
            return;
        };
        // Closing wakes the loop wherever it is waiting.
        running.shutdown.close();
        LOGGER.debug("notification listener stopping");
    }
}

impl ListenerInner {
    fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn handle_payload(&self, payload: &str) {
        let context = NormalizeContext::new(self.fallback_user_id.load(Ordering::SeqCst));
        match parse_frame(payload, &context) {
            Ok(InboundFrame::History(records)) => {
                LOGGER.debug(format!("received {} historical notifications", records.len()));
                self.store.replace_all(records);
            }
            Ok(InboundFrame::Notification(record)) => self.store.insert(record),
            Ok(InboundFrame::Ignored(reason)) => {
                LOGGER.debug(format!("ignoring notification frame: {reason}"));
            }
            Err(err) => LOGGER.error(format!("failed to parse notification message: {err}")),
        }
    }
}

async fn run(inner: Arc<ListenerInner>, shutdown: Receiver<()>) {
    let mut failures: u32 = 0;

    loop {
        let url = match (inner.endpoint)() {
            Ok(url) => url,
            Err(err) => {
                LOGGER.warn(format!("notification channel unavailable: {err}"));
                inner.set_status(ConnectionStatus::Failed);
                return;
            }
        };

        inner.set_status(ConnectionStatus::Connecting);
        let connected = tokio::select! {
            _ = shutdown.recv() => {
                inner.set_status(ConnectionStatus::Closed);
                return;
            }
            result = connect_async(url.to_string()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                inner.set_status(ConnectionStatus::Connected);
                LOGGER.info("notification socket connected");
                match run_connection(&inner, stream, &shutdown).await {
                    ConnectionEnd::Shutdown => {
                        inner.set_status(ConnectionStatus::Closed);
                        return;
                    }
                    ConnectionEnd::Lost { reason, delivered } => {
                        LOGGER.warn(format!("notification socket closed: {reason}"));
                        if delivered {
                            failures = 0;
                        }
                    }
                }
            }
            Err(err) => {
                LOGGER.warn(format!("failed to connect notification socket: {err}"));
            }
        }

        failures += 1;
        if inner
            .max_reconnect_attempts
            .is_some_and(|max| failures > max)
        {
            LOGGER.error(format!(
                "giving up on notification socket after {} attempts",
                failures - 1
            ));
            inner.set_status(ConnectionStatus::Failed);
            return;
        }

        let delay = inner.reconnect.delay(failures - 1);
        inner.set_status(ConnectionStatus::Reconnecting);
        LOGGER.debug(format!("reconnecting notification socket in {delay:?}"));
        tokio::select! {
            _ = shutdown.recv() => {
                inner.set_status(ConnectionStatus::Closed);
                return;
            }
            _ = sleep(delay) => {}
        }
    }
}

async fn run_connection(
    inner: &ListenerInner,
    stream: WsStream,
    shutdown: &Receiver<()>,
) -> ConnectionEnd {
    let (mut sink, mut reader) = stream.split();

    if let Err(err) = sink.send(Message::Text(HISTORY_REQUEST.to_string())).await {
        return ConnectionEnd::Lost {
            reason: format!("failed to request history: {err}"),
            delivered: false,
        };
    }

    let mut delivered = false;
    let lost = |reason: String, delivered: bool| ConnectionEnd::Lost { reason, delivered };
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                if let Err(err) = sink.send(Message::Close(None)).await {
                    LOGGER.debug(format!("close frame not delivered: {err}"));
                }
                let _ = sink.close().await;
                return ConnectionEnd::Shutdown;
            }
            message = reader.next() => match message {
                Some(Ok(Message::Text(payload))) => {
                    delivered = true;
                    inner.handle_payload(&payload);
                }
                Some(Ok(Message::Binary(payload))) => {
                    delivered = true;
                    match String::from_utf8(payload) {
                        Ok(text) => inner.handle_payload(&text),
                        Err(_) => LOGGER.warn("dropping non-UTF8 notification frame"),
                    }
                }
                Some(Ok(Message::Close(_))) => return lost("closed by server".into(), delivered),
                Some(Ok(_)) => {}
                Some(Err(err)) => return lost(err.to_string(), delivered),
                None => return lost("stream ended".into(), delivered),
            }
        }
    }
}
