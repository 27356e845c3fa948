use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::Replica;
use crate::lobby::Registration;
use crate::protocol::{validation, ClientCommand, GameEvent, RegisterReply, SessionId};

/// WebSocket upgrade endpoint; the session lives in [`handle_socket`].
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(replica): State<Arc<Replica>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, replica))
}

/// One connected client, from upgrade to disconnect.
///
/// Outbound traffic (replies and room broadcasts) goes through an unbounded
/// queue drained by a writer task, so the bus listener never blocks on a
/// slow socket. On disconnect the session is unregistered, which also
/// removes the username from the shared roster.
async fn handle_socket(socket: WebSocket, replica: Arc<Replica>) {
    let session: SessionId = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::debug!(%session, "client connected");
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_frame(&replica, session, &tx, text.as_str()).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            // Pings are answered by axum; other frame kinds are ignored.
            Ok(_) => {}
        }
    }

    if let Some(user) = replica.registry.forget(session).await {
        replica.rooms.leave(&user.room_name, session);
        tracing::info!(%session, username = %user.username, room = %user.room_name, "client disconnected");
    } else {
        tracing::debug!(%session, "client disconnected before registering");
    }
    writer.abort();
}

async fn handle_frame(
    replica: &Arc<Replica>,
    session: SessionId,
    tx: &mpsc::UnboundedSender<String>,
    raw: &str,
) {
    let command = match serde_json::from_str::<ClientCommand>(raw) {
        Ok(command) => command,
        Err(error) => {
            tracing::warn!(%session, %error, frame = raw, "dropping unrecognized client frame");
            return;
        }
    };

    match command {
        ClientCommand::RegisterClient { username } => {
            register_client(replica, session, tx, username.as_deref()).await;
        }
        ClientCommand::ReportRoundAnswer {
            round_answer_key,
            username,
            answer,
        } => {
            if let Err(error) = replica
                .store
                .hset(&round_answer_key, &username, &answer)
                .await
            {
                tracing::error!(%error, %session, round_answer_key, "failed to record answer");
            }
        }
    }
}

async fn register_client(
    replica: &Arc<Replica>,
    session: SessionId,
    tx: &mpsc::UnboundedSender<String>,
    username: Option<&str>,
) {
    let min_players = replica.lobby.min_players();

    let username = username.unwrap_or_default();
    if let Err(reason) = validation::validate_username(username) {
        tracing::warn!(%session, username, "rejecting registration with invalid username");
        send_json(
            tx,
            &RegisterReply::denied("", min_players, GameEvent::Warning { msg: reason }),
        );
        return;
    }

    match replica.lobby.register_player(username).await {
        Ok(registration) => {
            if let Some(room) = &registration.room_name {
                replica.rooms.join(room, session, tx.clone());
                replica.registry.admit(session, username, room).await;
            }
            send_json(tx, &reply_from(registration));
        }
        Err(error) => {
            tracing::error!(%error, %session, username, "admission failed");
            send_json(
                tx,
                &RegisterReply::denied(
                    username,
                    min_players,
                    GameEvent::Warning {
                        msg: "Registration failed, please try again".to_owned(),
                    },
                ),
            );
        }
    }
}

fn reply_from(registration: Registration) -> RegisterReply {
    RegisterReply {
        username: registration.username,
        room_name: registration.room_name,
        other_players: registration.other_players,
        min_players: registration.min_players,
        game_starting: registration.game_starting,
        msg: registration.denial,
    }
}

fn send_json<T: Serialize>(tx: &mpsc::UnboundedSender<String>, payload: &T) {
    match serde_json::to_string(payload) {
        Ok(frame) => {
            let _ = tx.send(frame);
        }
        Err(error) => tracing::error!(%error, "failed to serialize reply"),
    }
}
