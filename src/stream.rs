use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{FlightData, FrameError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_BUFFER_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

impl LinkState {
    pub fn is_online(self) -> bool {
        self == LinkState::Open
    }

    pub fn label(self) -> &'static str {
        if self.is_online() {
            "ONLINE"
        } else {
            "OFFLINE"
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Link(LinkState),
    Frame(FlightData),
}

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    pub buffer_size: usize,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

pub struct StreamClient {
    config: StreamConfig,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("url", &self.config.url)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.buffer_size.max(1));
        let client = Self {
            config,
            event_tx,
            cancel_token: CancellationToken::new(),
            task: None,
        };
        (client, event_rx)
    }

    // Must be called inside a tokio runtime.
    pub fn connect(&mut self) {
        self.release();
        let cancel_token = CancellationToken::new();
        self.cancel_token = cancel_token.clone();
        let config = self.config.clone();
        let event_tx = self.event_tx.clone();
        self.task = Some(tokio::spawn(async move {
            connection_loop(config, event_tx, cancel_token).await;
        }));
    }

    pub fn shutdown(&mut self) {
        if self.task.is_some() {
            info!("stream client shutting down");
        }
        self.release();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn release(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.release();
    }
}

enum SessionEnd {
    Closed,
    Cancelled,
    ReceiverGone,
}

async fn connection_loop(
    config: StreamConfig,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        if cancel_token.is_cancelled() {
            return;
        }
        if event_tx
            .send(StreamEvent::Link(LinkState::Connecting))
            .await
            .is_err()
        {
            return;
        }

        info!("connecting to {}", config.url);
        let end = tokio::select! {
            result = connect_async(config.url.as_str()) => match result {
                Ok((ws, _)) => {
                    info!("connected to {}", config.url);
                    run_session(ws, &event_tx, &cancel_token).await
                }
                Err(err) => {
                    warn!("connect to {} failed: {err}", config.url);
                    SessionEnd::Closed
                }
            },
            () = cancel_token.cancelled() => SessionEnd::Cancelled,
        };

        match end {
            SessionEnd::Closed => {}
            SessionEnd::Cancelled => {
                debug!("connection cancelled");
                return;
            }
            SessionEnd::ReceiverGone => {
                debug!("event receiver dropped, exiting stream task");
                return;
            }
        }

        if event_tx
            .send(StreamEvent::Link(LinkState::Closed))
            .await
            .is_err()
        {
            return;
        }

        info!(
            "reconnecting in {} ms",
            config.reconnect_delay.as_millis()
        );
        tokio::select! {
            () = sleep(config.reconnect_delay) => {}
            () = cancel_token.cancelled() => {
                debug!("reconnect timer cancelled");
                return;
            }
        }
    }
}

async fn run_session(
    mut ws: WsStream,
    event_tx: &mpsc::Sender<StreamEvent>,
    cancel_token: &CancellationToken,
) -> SessionEnd {
    if event_tx
        .send(StreamEvent::Link(LinkState::Open))
        .await
        .is_err()
    {
        return SessionEnd::ReceiverGone;
    }

    loop {
        tokio::select! {
            maybe_msg = ws.next() => match maybe_msg {
                Some(Ok(msg)) => match decode_message(msg) {
                    Incoming::Frame(frame) => {
                        if event_tx.send(StreamEvent::Frame(frame)).await.is_err() {
                            return SessionEnd::ReceiverGone;
                        }
                    }
                    Incoming::Rejected(err) => warn!("dropping frame: {err}"),
                    Incoming::Close => {
                        info!("server closed stream");
                        return SessionEnd::Closed;
                    }
                    Incoming::Control => {}
                },
                Some(Err(err)) => {
                    warn!("stream read failed: {err}");
                    return SessionEnd::Closed;
                }
                None => {
                    info!("stream ended");
                    return SessionEnd::Closed;
                }
            },
            () = cancel_token.cancelled() => {
                let _ = ws.close(None).await;
                return SessionEnd::Cancelled;
            }
        }
    }
}

enum Incoming {
    Frame(FlightData),
    Rejected(FrameError),
    Close,
    Control,
}

fn decode_message(msg: Message) -> Incoming {
    let parsed = match msg {
        Message::Text(text) => FlightData::from_json(text.as_str()),
        Message::Binary(bytes) => FlightData::from_bytes(&bytes),
        Message::Close(_) => return Incoming::Close,
        _ => return Incoming::Control,
    };
    match parsed {
        Ok(frame) => Incoming::Frame(frame),
        Err(err) => Incoming::Rejected(err),
    }
}
