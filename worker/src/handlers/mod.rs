//! NATS message handlers

pub mod ping;
pub mod route;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::services::engine::RouteEngine;

pub const PING_SUBJECT: &str = "homecare.ping";
pub const ROUTE_DAILY_SUBJECT: &str = "homecare.route.daily";
pub const ROUTE_CANCEL_SUBJECT: &str = "homecare.route.cancel";

/// Start all message handlers
pub async fn start_handlers(client: Client, engine: Arc<RouteEngine>) -> Result<()> {
    info!("Starting message handlers...");
    info!("Travel provider: {}", engine.travel_provider_name());

    // Subscribe to all subjects
    let ping_sub = client.subscribe(PING_SUBJECT).await?;
    let route_daily_sub = client.subscribe(ROUTE_DAILY_SUBJECT).await?;
    let route_cancel_sub = client.subscribe(ROUTE_CANCEL_SUBJECT).await?;

    info!(
        "Subscribed to {}, {}, {}",
        PING_SUBJECT, ROUTE_DAILY_SUBJECT, ROUTE_CANCEL_SUBJECT
    );

    let client_ping = client.clone();
    let client_route_daily = client.clone();
    let client_route_cancel = client.clone();

    let engine_ping = Arc::clone(&engine);
    let engine_route_daily = Arc::clone(&engine);
    let engine_route_cancel = Arc::clone(&engine);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, engine_ping).await
    });

    let route_daily_handle = tokio::spawn(async move {
        route::handle_daily_route(client_route_daily, route_daily_sub, engine_route_daily).await
    });

    let route_cancel_handle = tokio::spawn(async move {
        route::handle_cancel(client_route_cancel, route_cancel_sub, engine_route_cancel).await
    });

    // Wait for any handler to finish (they shouldn't unless there's an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = route_daily_handle => {
            error!("Route daily handler finished: {:?}", result);
        }
        result = route_cancel_handle => {
            error!("Route cancel handler finished: {:?}", result);
        }
    }

    Ok(())
}
