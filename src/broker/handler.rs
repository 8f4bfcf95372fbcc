//! WebSocket upgrade handler for the rendezvous endpoint

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::protocol::{BrokerMsg, PeerMsg};
use super::BrokerState;
use crate::util::rate_limit::RelayRateLimiter;

/// Query parameters for the rendezvous socket
#[derive(Debug, Deserialize)]
pub struct PairQuery {
    #[serde(rename = "pairCode", default)]
    pub pair_code: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<PairQuery>,
    State(state): State<BrokerState>,
) -> Response {
    let pair_code = query.pair_code.trim().to_string();
    if pair_code.is_empty() {
        warn!("Rendezvous request without pair code");
        return (StatusCode::BAD_REQUEST, "pairCode is required").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, pair_code, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, pair_code: String, state: BrokerState) {
    let peer_id = Uuid::new_v4();
    info!(pair_code = %pair_code, peer_id = %peer_id, "New rendezvous connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<BrokerMsg>();

    if let Err(e) = state.rendezvous.join(&pair_code, peer_id, tx) {
        warn!(pair_code = %pair_code, error = %e, "Rejecting rendezvous connection");
        let _ = send_msg(&mut ws_sink, &BrokerMsg::Error { message: e.to_string() }).await;
        let _ = ws_sink.send(Message::Close(None)).await;
        return;
    }

    // Writer task: counterpart messages -> WebSocket
    let writer_code = pair_code.clone();
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(pair_code = %writer_code, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = RelayRateLimiter::new(state.config.relay_rate_limit);

    // Reader loop: WebSocket -> counterpart
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(peer_id = %peer_id, "Rate limited relay frame");
                    continue;
                }

                match serde_json::from_str::<PeerMsg>(&text) {
                    Ok(msg) => {
                        if !state.rendezvous.relay(&pair_code, peer_id, msg.into()) {
                            debug!(pair_code = %pair_code, "No counterpart yet, frame dropped");
                        }
                    }
                    Err(e) => {
                        warn!(peer_id = %peer_id, error = %e, "Failed to parse peer message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(peer_id = %peer_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(peer_id = %peer_id, "Peer initiated close");
                break;
            }
            Err(e) => {
                error!(peer_id = %peer_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.rendezvous.leave(&pair_code, peer_id);
    writer_handle.abort();

    info!(pair_code = %pair_code, peer_id = %peer_id, "Rendezvous connection closed");
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &BrokerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
