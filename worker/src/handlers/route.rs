//! Daily route message handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::RouteError;
use crate::services::engine::RouteEngine;
use crate::types::{
    CancelRouteRequest, CancelRouteResponse, DailyRouteRequest, ErrorResponse, Request,
    SuccessResponse,
};

/// Handle route.daily messages
///
/// Each message runs on its own task so a newer request for the same
/// session can supersede one still waiting on travel lookups.
pub async fn handle_daily_route(
    client: Client,
    mut subscriber: Subscriber,
    engine: Arc<RouteEngine>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.daily message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let client = client.clone();
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let response = daily_route_response(&engine, &msg.payload).await;
            match response {
                Ok(bytes) => {
                    if let Err(e) = client.publish(reply, bytes.into()).await {
                        error!("Failed to publish route.daily reply: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize route.daily reply: {}", e),
            }
        });
    }

    Ok(())
}

/// Handle route.cancel messages
pub async fn handle_cancel(
    client: Client,
    mut subscriber: Subscriber,
    engine: Arc<RouteEngine>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.cancel message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let bytes = match cancel_response(&engine, &msg.payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to serialize route.cancel reply: {}", e);
                continue;
            }
        };
        if let Err(e) = client.publish(reply, bytes.into()).await {
            error!("Failed to publish route.cancel reply: {}", e);
        }
    }

    Ok(())
}

/// Serialized reply for a route.daily payload
pub(crate) async fn daily_route_response(engine: &RouteEngine, payload: &[u8]) -> Result<Vec<u8>> {
    let request: Request<DailyRouteRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
            return Ok(serde_json::to_vec(&error)?);
        }
    };

    match engine.compute_daily_route(&request.payload).await {
        Ok(route) => Ok(serde_json::to_vec(&SuccessResponse::new(request.id, route))?),
        Err(e) => {
            match &e {
                RouteError::Cancelled => debug!("Route request {} cancelled", request.id),
                RouteError::Source(_) => error!("Route request {} failed: {}", request.id, e),
                _ => warn!("Route request {} rejected: {}", request.id, e),
            }
            let error = ErrorResponse::new(request.id, e.code(), e.to_string());
            Ok(serde_json::to_vec(&error)?)
        }
    }
}

/// Serialized reply for a route.cancel payload
pub(crate) fn cancel_response(engine: &RouteEngine, payload: &[u8]) -> Result<Vec<u8>> {
    let request: Request<CancelRouteRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
            return Ok(serde_json::to_vec(&error)?);
        }
    };

    let cancelled = engine.cancel(&request.payload.session_key);
    Ok(serde_json::to_vec(&SuccessResponse::new(
        request.id,
        CancelRouteResponse { cancelled },
    ))?)
}
