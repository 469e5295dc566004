// WebSocket session with the surveillance server: handshake, then a pump
// that forwards outgoing requests and decodes incoming server messages.

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Debug)]
pub enum SessionError {
    Connect(String),
    Closed,
    Transport(String),
    Serialization(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Connect(e) => write!(f, "failed to connect: {e}"),
            SessionError::Closed => write!(f, "server closed the connection"),
            SessionError::Transport(e) => write!(f, "transport error: {e}"),
            SessionError::Serialization(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// How the session introduces itself after connecting.
#[derive(Debug, Clone, Copy)]
pub enum SessionRole {
    /// Full participant, may place and adjust cameras.
    Participant { id: u64 },
    /// Spectator, receives snapshots but cannot mutate.
    WatchOnly,
}

/// Connects, performs the handshake, then pumps messages until either side
/// ends the session. Outgoing requests arrive on `request_rx`; decoded server
/// messages go out on `event_tx`. Returns when `request_rx` closes (clean
/// shutdown) or the connection drops.
pub async fn run_session(
    url: &str,
    role: SessionRole,
    mut request_rx: mpsc::Receiver<ClientMessage>,
    event_tx: mpsc::Sender<ServerMessage>,
) -> Result<(), SessionError> {
    let (mut socket, _response) = connect_async(url)
        .await
        .map_err(|e| SessionError::Connect(e.to_string()))?;

    let handshake = match role {
        SessionRole::Participant { id } => ClientMessage::Join { participant_id: id },
        SessionRole::WatchOnly => ClientMessage::WatchOnly,
    };
    send_message(&mut socket, &handshake).await?;
    debug!(?role, "session handshake sent");

    loop {
        tokio::select! {
            outgoing = request_rx.recv() => {
                let Some(message) = outgoing else {
                    // Request side dropped: clean shutdown.
                    let _ = socket.close(None).await;
                    return Ok(());
                };
                send_message(&mut socket, &message).await?;
            }
            incoming = socket.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
                    None => return Err(SessionError::Closed),
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                // Event consumer is gone, nothing left to do.
                                let _ = socket.close(None).await;
                                return Ok(());
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "unparseable server message");
                        }
                    },
                    Message::Close(_) => return Err(SessionError::Closed),
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_)
                    | Message::Frame(_) => {}
                }
            }
        }
    }
}

async fn send_message<S>(socket: &mut S, message: &ClientMessage) -> Result<(), SessionError>
where
    S: SinkExt<Message> + Unpin,
    S::Error: fmt::Display,
{
    let json =
        serde_json::to_string(message).map_err(|e| SessionError::Serialization(e.to_string()))?;
    socket
        .send(Message::text(json))
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))
}
