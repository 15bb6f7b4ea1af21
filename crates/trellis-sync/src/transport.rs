use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use trellis_protocol::{LineCodec, RelayMessage};

use crate::error::{SyncError, SyncResult};

/// One live bidirectional link to the relay.
#[async_trait]
pub trait RelayConnection: Send {
    /// Send one frame.
    async fn send(&mut self, msg: RelayMessage) -> SyncResult<()>;

    /// Receive the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&mut self) -> SyncResult<Option<RelayMessage>>;
}

/// Factory for relay connections. The adapter calls `connect` again after
/// every disconnect, so implementations must support repeated dialing.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn connect(&self) -> SyncResult<Box<dyn RelayConnection>>;
}

// ---------------------------------------------------------------------------
// TCP transport
// ---------------------------------------------------------------------------

/// Dials the relay server over TCP, speaking the line protocol.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl RelayTransport for TcpTransport {
    async fn connect(&self) -> SyncResult<Box<dyn RelayConnection>> {
        let stream = TcpStream::connect(self.addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Box::new(TcpConnection {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
        }))
    }
}

struct TcpConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl RelayConnection for TcpConnection {
    async fn send(&mut self, msg: RelayMessage) -> SyncResult<()> {
        let frame = LineCodec::encode(&msg)?;
        self.writer.write_all(frame.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> SyncResult<Option<RelayMessage>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            match LineCodec::decode_line(&line) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    // A malformed frame is not worth a reconnect cycle.
                    tracing::warn!(error = %e, "skipping malformed frame");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory transport (tests, embedding)
// ---------------------------------------------------------------------------

/// The far end of one in-memory connection: what the adapter sent, and a
/// handle to inject frames as if the relay had broadcast them.
pub struct ChannelPeer {
    inbound: mpsc::UnboundedReceiver<RelayMessage>,
    outbound: mpsc::UnboundedSender<RelayMessage>,
}

impl ChannelPeer {
    /// Next frame the adapter sent, if any has arrived.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.inbound.recv().await
    }

    /// Deliver a frame to the adapter as if broadcast by the relay.
    pub fn send(&self, msg: RelayMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }
}

/// In-memory transport double. Every `connect` yields a fresh channel
/// pair whose far end pops out of the peer receiver handed back by
/// [`ChannelTransport::new`], letting tests play the relay's role and
/// exercise reconnects by dropping peers.
pub struct ChannelTransport {
    peers: mpsc::UnboundedSender<ChannelPeer>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelPeer>) {
        let (peers, peers_rx) = mpsc::unbounded_channel();
        (Self { peers }, peers_rx)
    }
}

#[async_trait]
impl RelayTransport for ChannelTransport {
    async fn connect(&self) -> SyncResult<Box<dyn RelayConnection>> {
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let peer = ChannelPeer {
            inbound: to_peer_rx,
            outbound: to_client_tx,
        };
        self.peers
            .send(peer)
            .map_err(|_| SyncError::Transport("transport shut down".into()))?;
        Ok(Box::new(ChannelConnection {
            tx: to_peer_tx,
            rx: to_client_rx,
        }))
    }
}

struct ChannelConnection {
    tx: mpsc::UnboundedSender<RelayMessage>,
    rx: mpsc::UnboundedReceiver<RelayMessage>,
}

#[async_trait]
impl RelayConnection for ChannelConnection {
    async fn send(&mut self, msg: RelayMessage) -> SyncResult<()> {
        self.tx.send(msg).map_err(|_| SyncError::ConnectionClosed)
    }

    async fn recv(&mut self) -> SyncResult<Option<RelayMessage>> {
        Ok(self.rx.recv().await)
    }
}
