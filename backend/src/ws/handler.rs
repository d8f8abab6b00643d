use axum::{
    extract::{ws, State, WebSocketUpgrade},
    response::Response,
    Extension,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::db::models::UserRecord;
use crate::rewards::manager::LeaderboardRow;
use crate::AppState;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Connected { message: String },
    Leaderboard { entries: Vec<LeaderboardRow> },
    Error { message: String },
}

pub async fn leaderboard_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn snapshot(state: &AppState, user: &UserRecord) -> WsMessage {
    match state.rewards.leaderboard(user).await {
        Ok(entries) => WsMessage::Leaderboard { entries },
        Err(e) => {
            tracing::warn!("Failed to build leaderboard snapshot: {}", e);
            WsMessage::Error {
                message: "Leaderboard temporarily unavailable".to_string(),
            }
        }
    }
}

async fn handle_socket(socket: ws::WebSocket, state: Arc<AppState>, user: UserRecord) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = WsMessage::Connected {
        message: "Connected to live leaderboard".to_string(),
    };
    if send(&mut sender, &welcome).await.is_err() {
        return;
    }

    tracing::info!("Live leaderboard opened for user {}", user.id);

    // first tick fires immediately, so the snapshot on connect comes from here
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let message = snapshot(&state, &user).await;
                if send(&mut sender, &message).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(ws::Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(ws::Message::Text(text))) => {
                    tracing::debug!("Ignoring client message on live leaderboard: {}", text);
                }
                Some(Ok(_)) => {}
            }
        }
    }

    tracing::info!("Live leaderboard closed for user {}", user.id);
}

async fn send<S>(sender: &mut S, message: &WsMessage) -> Result<(), ()>
where
    S: futures::Sink<ws::Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|e| {
        tracing::error!("Failed to encode websocket message: {}", e);
    })?;
    sender.send(ws::Message::Text(text)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::ledger::Standing;

    #[test]
    fn messages_are_tagged() {
        let message = WsMessage::Leaderboard {
            entries: vec![LeaderboardRow {
                standing: Standing {
                    rank: 1,
                    user_id: 4,
                    user_name: "Ann".to_string(),
                    points: 250,
                    level: 3,
                },
                is_current_user: true,
            }],
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "leaderboard");
        assert_eq!(value["entries"][0]["rank"], 1);
        assert_eq!(value["entries"][0]["is_current_user"], true);
    }
}
