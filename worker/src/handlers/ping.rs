//! Ping handler for health checks

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::services::engine::RouteEngine;

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PongResponse {
    message: String,
    timestamp: String,
    travel_provider: String,
}

/// Handle ping messages
pub async fn handle_ping(client: Client, mut subscriber: Subscriber, engine: Arc<RouteEngine>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        let response_bytes = match pong(&msg.payload, engine.travel_provider_name()) {
            Ok(response) => serde_json::to_vec(&response)?,
            Err(e) => {
                error!("Failed to parse ping request: {}", e);
                let error_response = serde_json::json!({
                    "error": {
                        "code": "INVALID_REQUEST",
                        "message": format!("Failed to parse request: {}", e)
                    }
                });
                error_response.to_string().into_bytes()
            }
        };

        client.publish(reply, response_bytes.into()).await?;
        debug!("Sent pong response");
    }

    Ok(())
}

/// An empty payload counts as a bare ping.
fn pong(payload: &[u8], travel_provider: &str) -> serde_json::Result<PongResponse> {
    let request: PingRequest = if payload.is_empty() {
        PingRequest { message: None }
    } else {
        serde_json::from_slice(payload)?
    };

    Ok(PongResponse {
        message: request.message.map(|m| format!("Pong: {}", m)).unwrap_or_else(|| "Pong".to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
        travel_provider: travel_provider.to_string(),
    })
}
