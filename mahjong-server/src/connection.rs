//! The per-connection actor: owns the WebSocket sink for one client and
//! forwards their incoming frames to whichever room they've joined.

use crate::{actor::Handle, registry::RegistryHandle, room::RoomCommand};
use futures::{prelude::*, stream::SplitSink};
use mahjong_core::messages::{ClientMessage, ServerMessage};
use tracing::*;
use warp::{filters::ws::Message as WsMessage, ws::WebSocket};

/// Messages a connection actor accepts.
pub enum ClientCommand {
    /// Push a frame down the socket to this client.
    Send(ServerMessage),
    /// The room has assigned (or reassigned) this client a seat index.
    BindSeat(usize),
}

pub type ClientHandle = Handle<ClientCommand>;

/// Parameters parsed from the initial connection request's query string.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConnectQuery {
    pub name: String,
    pub avatar: String,
    #[serde(default, rename = "reconnectToken")]
    pub reconnect_token: Option<String>,
}

/// Runs the message pump for one client: spawns the outbound actor, joins
/// the named room, then forwards every inbound text frame as a
/// `ClientMessage` to the room until the socket closes.
#[instrument(skip(socket, registry))]
pub async fn run_connection(room_name: String, query: ConnectQuery, socket: WebSocket, registry: RegistryHandle) {
    let (sink, mut stream) = socket.split();

    let client: ClientHandle = crate::actor::spawn(sink, |sink, command| Box::pin(handle_client_command(sink, command)));

    let room = match crate::registry::join_room(&registry, &room_name).await {
        Some(room) => room,
        None => {
            warn!(room = %room_name, "failed to obtain a room handle");
            return;
        }
    };

    let seat = match crate::room::join(
        &room,
        query.name.clone(),
        query.avatar.clone(),
        query.reconnect_token.clone(),
        client.clone(),
    )
    .await
    {
        Some(Ok(seat)) => seat,
        Some(Err(reason)) => {
            let _ = client.tell(ClientCommand::Send(ServerMessage::Error { message: reason }));
            return;
        }
        None => {
            warn!("room actor did not respond to join request");
            return;
        }
    };

    let _ = client.tell(ClientCommand::BindSeat(seat));

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "error reading from socket, closing connection");
                break;
            }
        };

        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }

        let text = frame.to_str().unwrap_or_default();
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => {
                let _ = room.tell(RoomCommand::Incoming { seat, message });
            }
            Err(err) => {
                debug!(%err, "ignoring malformed client message");
            }
        }
    }

    let _ = room.tell(RoomCommand::Disconnected { seat });
}

async fn handle_client_command(sink: &mut SplitSink<WebSocket, WsMessage>, command: ClientCommand) {
    match command {
        ClientCommand::Send(message) => {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    error!(%err, "failed to serialize outgoing message");
                    return;
                }
            };
            if let Err(err) = sink.send(WsMessage::text(text)).await {
                debug!(%err, "failed to deliver message, client likely disconnected");
            }
        }
        ClientCommand::BindSeat(_seat) => {
            // Nothing to do here today; seat binding exists so a future
            // heartbeat/ping loop can address log lines by seat.
        }
    }
}
