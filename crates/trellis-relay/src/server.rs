use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use trellis_protocol::{LineCodec, RelayMessage};
use trellis_types::{ItemId, SenderId};

use crate::config::ServerConfig;
use crate::error::{RelayError, RelayResult};
use crate::registry::{RelayRegistry, RelaySession};

/// TCP front end for the relay registry.
///
/// Speaks the newline-delimited JSON protocol. Each connection gets one
/// writer task; joining a room registers a session that queues onto that
/// writer. A dropped socket deregisters its session immediately — there
/// is no grace period.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<RelayRegistry>,
}

impl RelayServer {
    /// Create a server owning a fresh registry.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(RelayRegistry::new()))
    }

    /// Create a server over an injected registry (shared with other
    /// in-process producers).
    pub fn with_registry(config: ServerConfig, registry: Arc<RelayRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The registry this server fans out through.
    pub fn registry(&self) -> Arc<RelayRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn serve(self) -> RelayResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("relay listening on {}", self.config.bind_addr);
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener (useful for tests binding port 0).
    pub async fn serve_on(self, listener: TcpListener) -> RelayResult<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let registry = Arc::clone(&self.registry);
            let config = self.config.clone();
            tokio::spawn(async move {
                tracing::debug!(%peer, "relay connection opened");
                if let Err(e) = handle_connection(stream, registry, config).await {
                    // Socket trouble is connectivity, not a session fault;
                    // log and let the client's reconnect policy handle it.
                    tracing::warn!(%peer, error = %e, "relay connection closed");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: Arc<RelayRegistry>,
    config: ServerConfig,
) -> RelayResult<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // One outbound queue per connection; every room this connection joins
    // shares it.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<RelayMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let frame = match LineCodec::encode(&msg) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unencodable frame");
                    continue;
                }
            };
            if write_half.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut joined: Option<(ItemId, SenderId)> = None;
    let result = connection_loop(
        &mut lines,
        &registry,
        &config,
        &outbound_tx,
        &mut joined,
    )
    .await;

    // Immediate deregistration, clean close or not.
    if let Some((item, sender)) = joined {
        registry.leave(item, sender);
    }
    writer.abort();
    result
}

async fn connection_loop(
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
    registry: &Arc<RelayRegistry>,
    config: &ServerConfig,
    outbound_tx: &mpsc::UnboundedSender<RelayMessage>,
    joined: &mut Option<(ItemId, SenderId)>,
) -> RelayResult<()> {
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let msg = match LineCodec::decode_line(&line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed frame");
                continue;
            }
        };
        match msg {
            RelayMessage::Join { item_id, sender_id } => {
                if registry.session_count(item_id) >= config.max_sessions_per_item {
                    return Err(RelayError::RoomFull {
                        item: item_id,
                        max: config.max_sessions_per_item,
                    });
                }
                // A connection follows one item at a time; switching rooms
                // leaves the old one.
                if let Some((old_item, old_sender)) = joined.take() {
                    if old_item != item_id || old_sender != sender_id {
                        registry.leave(old_item, old_sender);
                    }
                }
                let session = RelaySession::with_outbound(sender_id, outbound_tx.clone());
                registry.join(item_id, session);
                *joined = Some((item_id, sender_id));
            }
            RelayMessage::Leave { item_id, sender_id } => {
                registry.leave(item_id, sender_id);
                if *joined == Some((item_id, sender_id)) {
                    *joined = None;
                }
            }
            RelayMessage::Content { .. } | RelayMessage::Cursor { .. } => {
                registry.broadcast(msg.item_id(), msg.sender_id(), &msg);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::time::timeout;

    async fn spawn_server(max_sessions: usize) -> (SocketAddr, Arc<RelayRegistry>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = RelayServer::new(ServerConfig {
            bind_addr: addr,
            max_sessions_per_item: max_sessions,
        });
        let registry = server.registry();
        tokio::spawn(server.serve_on(listener));
        (addr, registry)
    }

    struct TestClient {
        stream: TcpStream,
        buf: Vec<u8>,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.unwrap(),
                buf: Vec::new(),
            }
        }

        async fn send(&mut self, msg: &RelayMessage) {
            let frame = LineCodec::encode(msg).unwrap();
            self.stream.write_all(frame.as_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> RelayMessage {
            loop {
                if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = self.buf.drain(..=pos).collect();
                    return LineCodec::decode_line(std::str::from_utf8(&line).unwrap()).unwrap();
                }
                let mut chunk = [0u8; 4096];
                let n = self.stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed while awaiting frame");
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }

        async fn expect_silence(&mut self) {
            let mut chunk = [0u8; 64];
            let read = timeout(Duration::from_millis(150), self.stream.read(&mut chunk)).await;
            assert!(read.is_err(), "expected no frame, got data");
        }
    }

    async fn wait_for_sessions(registry: &RelayRegistry, item: ItemId, count: usize) {
        for _ in 0..100 {
            if registry.session_count(item) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("registry never reached {count} sessions");
    }

    #[tokio::test]
    async fn content_fans_out_without_self_echo() {
        let (addr, registry) = spawn_server(8).await;
        let item = ItemId::new();
        let s1 = SenderId::new();
        let s2 = SenderId::new();

        let mut c1 = TestClient::connect(addr).await;
        let mut c2 = TestClient::connect(addr).await;
        c1.send(&RelayMessage::Join {
            item_id: item,
            sender_id: s1,
        })
        .await;
        c2.send(&RelayMessage::Join {
            item_id: item,
            sender_id: s2,
        })
        .await;
        wait_for_sessions(&registry, item, 2).await;

        let payload = serde_json::json!({ "text": "P" });
        c1.send(&RelayMessage::Content {
            item_id: item,
            sender_id: s1,
            content: payload.clone(),
        })
        .await;

        let received = c2.recv().await;
        match received {
            RelayMessage::Content { content, sender_id, .. } => {
                assert_eq!(content, payload);
                assert_eq!(sender_id, s1);
            }
            other => panic!("expected content frame, got {}", other.type_name()),
        }
        // S1 never hears its own broadcast.
        c1.expect_silence().await;
    }

    #[tokio::test]
    async fn cursor_frames_fan_out() {
        let (addr, registry) = spawn_server(8).await;
        let item = ItemId::new();
        let s1 = SenderId::new();
        let s2 = SenderId::new();

        let mut c1 = TestClient::connect(addr).await;
        let mut c2 = TestClient::connect(addr).await;
        c1.send(&RelayMessage::Join { item_id: item, sender_id: s1 }).await;
        c2.send(&RelayMessage::Join { item_id: item, sender_id: s2 }).await;
        wait_for_sessions(&registry, item, 2).await;

        c1.send(&RelayMessage::Cursor {
            item_id: item,
            sender_id: s1,
            from: 3,
            to: 7,
            name: "Ada".into(),
            color: "#123456".into(),
        })
        .await;
        let received = c2.recv().await;
        assert_eq!(received.type_name(), "cursor");
    }

    #[tokio::test]
    async fn leave_frame_deregisters() {
        let (addr, registry) = spawn_server(8).await;
        let item = ItemId::new();
        let sender = SenderId::new();

        let mut client = TestClient::connect(addr).await;
        client
            .send(&RelayMessage::Join { item_id: item, sender_id: sender })
            .await;
        wait_for_sessions(&registry, item, 1).await;

        client
            .send(&RelayMessage::Leave { item_id: item, sender_id: sender })
            .await;
        wait_for_sessions(&registry, item, 0).await;
        assert_eq!(registry.item_count(), 0);
    }

    #[tokio::test]
    async fn dropped_socket_deregisters() {
        let (addr, registry) = spawn_server(8).await;
        let item = ItemId::new();
        let sender = SenderId::new();

        let mut client = TestClient::connect(addr).await;
        client
            .send(&RelayMessage::Join { item_id: item, sender_id: sender })
            .await;
        wait_for_sessions(&registry, item, 1).await;

        drop(client);
        wait_for_sessions(&registry, item, 0).await;
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let (addr, registry) = spawn_server(8).await;
        let item = ItemId::new();
        let s1 = SenderId::new();
        let s2 = SenderId::new();

        let mut c1 = TestClient::connect(addr).await;
        let mut c2 = TestClient::connect(addr).await;
        c1.send(&RelayMessage::Join { item_id: item, sender_id: s1 }).await;
        c2.send(&RelayMessage::Join { item_id: item, sender_id: s2 }).await;
        wait_for_sessions(&registry, item, 2).await;

        c1.stream.write_all(b"{broken\n").await.unwrap();
        c1.send(&RelayMessage::Content {
            item_id: item,
            sender_id: s1,
            content: serde_json::json!({"ok": true}),
        })
        .await;
        // The malformed line was skipped; the next frame still flows.
        let received = c2.recv().await;
        assert_eq!(received.type_name(), "content");
    }

    #[tokio::test]
    async fn full_room_rejects_new_sessions() {
        let (addr, registry) = spawn_server(1).await;
        let item = ItemId::new();

        let mut c1 = TestClient::connect(addr).await;
        c1.send(&RelayMessage::Join {
            item_id: item,
            sender_id: SenderId::new(),
        })
        .await;
        wait_for_sessions(&registry, item, 1).await;

        let mut c2 = TestClient::connect(addr).await;
        c2.send(&RelayMessage::Join {
            item_id: item,
            sender_id: SenderId::new(),
        })
        .await;
        // The server closes the over-capacity connection.
        let mut chunk = [0u8; 16];
        let n = timeout(Duration::from_secs(1), c2.stream.read(&mut chunk))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(registry.session_count(item), 1);
    }
}
