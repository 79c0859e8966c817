use anyhow::{Context, Result, anyhow, bail};
use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = std::result::Result<Value, String>;
type Pending = Arc<DashMap<u64, oneshot::Sender<Reply>>>;

const EVENT_BUFFER: usize = 64;

/// A protocol event pushed by the browser, e.g. `Page.loadEventFired`.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

/// What one inbound frame turned out to be.
#[derive(Debug, PartialEq)]
enum Inbound {
    Reply(u64, Reply),
    Event(CdpEvent),
    Unknown,
}

fn classify(payload: Value) -> Inbound {
    if let Some(id) = payload.get("id").and_then(Value::as_u64) {
        let reply = match payload.get("error") {
            Some(error) => Err(error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("DevTools error")
                .to_string()),
            None => Ok(payload.get("result").cloned().unwrap_or(Value::Null)),
        };
        return Inbound::Reply(id, reply);
    }
    match payload.get("method").and_then(Value::as_str) {
        Some(method) => Inbound::Event(CdpEvent {
            method: method.to_string(),
            params: payload.get("params").cloned().unwrap_or(Value::Null),
        }),
        None => Inbound::Unknown,
    }
}

/// Wait until one of `methods` arrives on `events`.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<CdpEvent>,
    methods: &[&str],
    timeout: Duration,
) -> Result<CdpEvent> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if methods.contains(&event.method.as_str()) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "DevTools event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    bail!("DevTools connection closed while waiting for {:?}", methods)
                }
            }
        }
    };
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| anyhow!("no {:?} within {}ms", methods, timeout.as_millis()))?
}

/// One DevTools WebSocket: numbered requests matched to responses by a
/// background reader task, with protocol events fanned out to subscribers.
pub struct CdpConnection {
    write: Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    events: broadcast::Sender<CdpEvent>,
    next_id: AtomicU64,
    command_timeout: Duration,
    reader: JoinHandle<()>,
}

impl CdpConnection {
    pub async fn connect(
        ws_url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self> {
        let (stream, _) = tokio::time::timeout(
            connect_timeout,
            tokio_tungstenite::connect_async(ws_url),
        )
        .await
        .map_err(|_| anyhow!("DevTools connect timed out: {}", ws_url))?
        .with_context(|| format!("DevTools connect failed: {}", ws_url))?;

        let (write, read) = stream.split();
        let pending: Pending = Arc::new(DashMap::new());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let reader = tokio::spawn(Self::read_loop(read, pending.clone(), events.clone()));

        Ok(Self {
            write: Mutex::new(write),
            pending,
            events,
            next_id: AtomicU64::new(1),
            command_timeout,
            reader,
        })
    }

    async fn read_loop(
        mut read: SplitStream<WsStream>,
        pending: Pending,
        events: broadcast::Sender<CdpEvent>,
    ) {
        while let Some(message) = read.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Err(error) => {
                    debug!(error = %error, "DevTools socket read failed");
                    break;
                }
                _ => continue,
            };

            let Ok(payload) = serde_json::from_str::<Value>(text.as_str()) else {
                continue;
            };
            match classify(payload) {
                Inbound::Reply(id, reply) => {
                    if let Some((_, sender)) = pending.remove(&id) {
                        let _ = sender.send(reply);
                    }
                }
                // No subscribers is normal between navigations.
                Inbound::Event(event) => {
                    let _ = events.send(event);
                }
                Inbound::Unknown => {}
            }
        }

        // Wake every caller still waiting on a response.
        pending.clear();
    }

    /// Receive protocol events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Send one command and wait for its result.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = json!({ "id": id, "method": method, "params": params });
        if let Err(error) = self
            .write
            .lock()
            .await
            .send(Message::Text(request.to_string().into()))
            .await
        {
            self.pending.remove(&id);
            return Err(error).with_context(|| format!("Failed to send {}", method));
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => bail!("{} failed: {}", method, message),
            Ok(Err(_)) => bail!("DevTools connection closed during {}", method),
            Err(_) => {
                self.pending.remove(&id);
                bail!(
                    "{} timed out after {}ms",
                    method,
                    self.command_timeout.as_millis()
                )
            }
        }
    }

    /// Evaluate `expression` in the page and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let description = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            bail!("Script error: {}", description);
        }

        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reply_and_error() {
        let reply = classify(json!({"id": 7, "result": {"frameId": "F"}}));
        assert_eq!(reply, Inbound::Reply(7, Ok(json!({"frameId": "F"}))));

        let error = classify(json!({"id": 8, "error": {"code": -32000, "message": "No node"}}));
        assert_eq!(error, Inbound::Reply(8, Err("No node".to_string())));
    }

    #[test]
    fn test_classify_event() {
        let event = classify(json!({
            "method": "Page.loadEventFired",
            "params": {"timestamp": 1.5}
        }));
        assert_eq!(
            event,
            Inbound::Event(CdpEvent {
                method: "Page.loadEventFired".to_string(),
                params: json!({"timestamp": 1.5}),
            })
        );
        assert_eq!(classify(json!({"unexpected": true})), Inbound::Unknown);
    }

    #[tokio::test]
    async fn test_wait_for_event_skips_unrelated_events() {
        let (tx, mut rx) = broadcast::channel(8);
        for method in ["Network.requestWillBeSent", "Page.domContentEventFired"] {
            tx.send(CdpEvent {
                method: method.to_string(),
                params: Value::Null,
            })
            .unwrap();
        }

        let event = wait_for_event(
            &mut rx,
            &["Page.domContentEventFired", "Page.loadEventFired"],
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(event.method, "Page.domContentEventFired");
    }

    #[tokio::test]
    async fn test_wait_for_event_times_out() {
        let (_tx, mut rx) = broadcast::channel::<CdpEvent>(8);
        let err = wait_for_event(&mut rx, &["Page.loadEventFired"], Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("20ms"));
    }

    #[tokio::test]
    async fn test_wait_for_event_fails_when_connection_drops() {
        let (tx, mut rx) = broadcast::channel::<CdpEvent>(8);
        drop(tx);
        let err = wait_for_event(&mut rx, &["Page.loadEventFired"], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
