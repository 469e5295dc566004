use crate::interface_adapters::protocol::{
    CameraDto, ClientMessage, PlaceCameraDto, RotationDto, ServerMessage, SnapshotDto, Vec3Dto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{CameraCommand, SurveillanceUpdate};

use futures_util::SinkExt;

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandsClosed,
    SnapshotsClosed,
    ReplyDropped,
    HandshakeRequired,
    HandshakeTimeout,
    ClosedBeforeHandshake,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes each camera snapshot once and broadcasts the shared bytes.
pub async fn snapshot_serializer(
    mut update_rx: broadcast::Receiver<SurveillanceUpdate>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    update_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match update_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::Snapshot(SnapshotDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize camera snapshot");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery and initial state.
                let _ = update_latest_tx.send(bytes.clone());
                let _ = update_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "snapshot serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("snapshot channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Connection id correlates logs and keys external viewer registrations.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, participant_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeHandshake) => {
            info!("client disconnected before handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "handshake failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    if let Some(participant) = ctx.participant {
        span.record("participant_id", participant);
    }
    info!(participant = ?ctx.participant, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    // None for external watch-only connections.
    pub participant: Option<u64>,
    pub conn_id: u64,
    pub command_tx: mpsc::Sender<CameraCommand>,
    pub update_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub update_latest_rx: watch::Receiver<Utf8Bytes>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_lag_log: Instant,
    pub last_invalid_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    conn_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so the connection cannot miss a snapshot
    // between handshake and loop start.
    let update_bytes_rx = state.update_bytes_tx.subscribe();
    let update_latest_rx = state.update_latest_tx.subscribe();

    let handshake = match timeout(HANDSHAKE_TIMEOUT, read_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "handshake timeout").await;
            return Err(NetError::HandshakeTimeout);
        }
    };

    let identity = ServerMessage::Identity {
        participant_id: handshake.map(|id| id.to_string()),
    };
    send_message(socket, &identity).await?;

    // Initial state: replay the latest snapshot if one exists yet.
    let latest = update_latest_rx.borrow().clone();
    if !latest.is_empty() {
        socket
            .send(Message::Text(latest))
            .await
            .map_err(NetError::Ws)?;
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        participant: handshake,
        conn_id,
        command_tx: state.command_tx.clone(),
        update_bytes_rx,
        update_latest_rx,

        msgs_in: 1,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_lag_log: now,
        last_invalid_log: now,

        close_frame: None,
    })
}

/// Reads the first meaningful message, which must be Join or WatchOnly.
async fn read_handshake(socket: &mut WebSocket) -> Result<Option<u64>, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeHandshake);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => Ok(Some(payload.participant_id)),
                    Ok(ClientMessage::WatchOnly) => Ok(None),
                    Ok(_) | Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "handshake required",
                        )
                        .await;
                        Err(NetError::HandshakeRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::HandshakeRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeHandshake),
        }
    }
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn finite_vec(v: &Vec3Dto) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

fn finite_rotation(r: &RotationDto) -> bool {
    r.pitch.is_finite() && r.yaw.is_finite() && r.roll.is_finite()
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming command from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing camera snapshot.
            snapshot = ctx.update_bytes_rx.recv() => {
                match snapshot {
                    Ok(bytes) => match forward_bytes(bytes, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_lag_log) {
                            warn!(missed = n, "snapshots lagged; sending latest");
                        }
                        // Resync strategy: send the latest snapshot bytes.
                        let latest = ctx.update_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            match forward_bytes(latest, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::SnapshotsClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => dispatch_message(socket, message, ctx).await,
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

/// Translates one parsed client message into surveillance commands and sends
/// the reply, if the operation has one.
async fn dispatch_message(
    socket: &mut WebSocket,
    message: ClientMessage,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match message {
        ClientMessage::Join(_) | ClientMessage::WatchOnly => {
            // Repeated handshakes are ignored to keep the session stable.
            if should_log(&mut ctx.last_invalid_log) {
                warn!("duplicate handshake ignored");
            }
            Ok(LoopControl::Continue)
        }
        ClientMessage::PlaceCamera(place) => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            if !finite_vec(&place.position) || !finite_rotation(&place.rotation) {
                return drop_invalid_values(ctx);
            }

            let PlaceCameraDto {
                camera_type,
                position,
                rotation,
                held,
            } = place;
            let (reply_tx, reply_rx) = oneshot::channel();
            send_command(
                ctx,
                CameraCommand::Place {
                    camera_type: camera_type.into(),
                    position: position.into(),
                    rotation: rotation.into(),
                    owner: participant,
                    held,
                    reply: reply_tx,
                },
            )
            .await?;
            let created = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::PlaceResult {
                camera: created.as_ref().map(CameraDto::from),
            };
            send_counted(socket, &msg, ctx).await
        }
        ClientMessage::RemoveCamera { camera_id } => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            let (reply_tx, reply_rx) = oneshot::channel();
            send_command(
                ctx,
                CameraCommand::Remove {
                    camera_id: camera_id.clone(),
                    requester: participant,
                    reply: reply_tx,
                },
            )
            .await?;
            let removed = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::RemoveResult { camera_id, removed };
            send_counted(socket, &msg, ctx).await
        }
        ClientMessage::MoveCamera { camera_id, position } => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            if !finite_vec(&position) {
                return drop_invalid_values(ctx);
            }
            // Drag updates are fire-and-forget; a rejected one just means the
            // camera stays where the server last confirmed it.
            send_command(
                ctx,
                CameraCommand::Move {
                    camera_id,
                    holder: participant,
                    position: position.into(),
                },
            )
            .await?;
            Ok(LoopControl::Continue)
        }
        ClientMessage::RotateCamera { camera_id, rotation } => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            if !finite_rotation(&rotation) {
                return drop_invalid_values(ctx);
            }
            send_command(
                ctx,
                CameraCommand::Rotate {
                    camera_id,
                    holder: participant,
                    rotation: rotation.into(),
                },
            )
            .await?;
            Ok(LoopControl::Continue)
        }
        ClientMessage::AcquireLock { camera_id } => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            let (reply_tx, reply_rx) = oneshot::channel();
            send_command(
                ctx,
                CameraCommand::AcquireLock {
                    camera_id: camera_id.clone(),
                    holder: participant,
                    reply: reply_tx,
                },
            )
            .await?;
            let granted = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::LockResult { camera_id, granted };
            send_counted(socket, &msg, ctx).await
        }
        ClientMessage::ReleaseLock { camera_id } => {
            let Some(participant) = ctx.participant else {
                return reject_watch_only(ctx);
            };
            send_command(
                ctx,
                CameraCommand::ReleaseLock {
                    camera_id,
                    holder: participant,
                },
            )
            .await?;
            Ok(LoopControl::Continue)
        }
        ClientMessage::SetViewer { camera_id } => {
            let (reply_tx, reply_rx) = oneshot::channel();
            let command = match ctx.participant {
                Some(participant) => CameraCommand::SetViewer {
                    viewer: participant,
                    camera_id,
                    reply: reply_tx,
                },
                // Watch-only connections use the external namespace keyed by
                // connection id.
                None => match camera_id {
                    Some(camera_id) => CameraCommand::RegisterExternalViewer {
                        connection_id: ctx.conn_id,
                        camera_id,
                        reply: reply_tx,
                    },
                    None => {
                        send_command(
                            ctx,
                            CameraCommand::UnregisterExternalViewer {
                                connection_id: ctx.conn_id,
                            },
                        )
                        .await?;
                        let msg = ServerMessage::ViewerResult { accepted: true };
                        return send_counted(socket, &msg, ctx).await;
                    }
                },
            };
            send_command(ctx, command).await?;
            let accepted = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::ViewerResult { accepted };
            send_counted(socket, &msg, ctx).await
        }
        ClientMessage::SetLimits { security, stream } => {
            if ctx.participant.is_none() {
                return reject_watch_only(ctx);
            }
            let (reply_tx, reply_rx) = oneshot::channel();
            send_command(
                ctx,
                CameraCommand::SetLimits {
                    security,
                    stream,
                    reply: reply_tx,
                },
            )
            .await?;
            let limits = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::Limits(limits.into());
            send_counted(socket, &msg, ctx).await
        }
        ClientMessage::GetStats => {
            let (reply_tx, reply_rx) = oneshot::channel();
            send_command(ctx, CameraCommand::GetStats { reply: reply_tx }).await?;
            let stats = reply_rx.await.map_err(|_| NetError::ReplyDropped)?;
            let msg = ServerMessage::Stats(stats.into());
            send_counted(socket, &msg, ctx).await
        }
    }
}

fn reject_watch_only(ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    // Watch-only connections cannot mutate world state.
    if should_log(&mut ctx.last_invalid_log) {
        warn!("mutating message from watch-only connection ignored");
    }
    Ok(LoopControl::Continue)
}

fn drop_invalid_values(ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    if should_log(&mut ctx.last_invalid_log) {
        warn!("non-finite values in message; dropping");
    }
    Ok(LoopControl::Continue)
}

async fn send_command(ctx: &ConnCtx, command: CameraCommand) -> Result<(), NetError> {
    ctx.command_tx
        .send(command)
        .await
        .map_err(|_| NetError::CommandsClosed)
}

async fn send_counted(
    socket: &mut WebSocket,
    msg: &ServerMessage,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let bytes = send_message(socket, msg).await?;
    ctx.msgs_out += 1;
    ctx.bytes_out += bytes as u64;
    Ok(LoopControl::Continue)
}

async fn forward_bytes(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Remove owned cameras, release held locks, clear viewer assignments.
    // The surveillance task performs all three even when some find nothing.
    ctx.command_tx
        .send(CameraCommand::Disconnect {
            participant: ctx.participant,
            connection_id: ctx.conn_id,
        })
        .await
        .map_err(|_| NetError::CommandsClosed)?;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!("client disconnected");
    Ok(())
}
