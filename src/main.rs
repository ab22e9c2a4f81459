//! # Order Queue Demo
//!
//! Runs one guest order through the queue with the backend chosen by the environment:
//! 1.  Loading `.env` and the [`Config`].
//! 2.  Starting the [`OrderSystem`].
//! 3.  Submitting a drink order and watching it arrive in the queue.
//! 4.  Completing it and shutting down.

use chrono::Utc;
use order_queue::config::Config;
use order_queue::lifecycle::{setup_tracing, OrderSystem, SystemError};
use order_queue::model::OrderKind;
use order_queue::order_actor::StoreError;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), SystemError> {
    dotenv::dotenv().ok();
    setup_tracing();

    let config = Config::load()?;
    info!(backend = %config.backend.backend(), "Starting order queue demo");
    let system = OrderSystem::start(&config).await?;

    let mut queue = system.queue_view().await?;
    info!(header = %queue.header(), "Queue opened");

    // Guest submits a drink order
    let span = tracing::info_span!("guest_order");
    let order_id = async {
        let mut form = system.order_form(OrderKind::Drink, "Sam");
        let Some(first) = form.menu().items().first().map(|item| item.name.clone()) else {
            warn!("Drink menu is empty, nothing to order");
            return Ok(None);
        };
        form.toggle(&first).map_err(StoreError::from)?;
        form.set_notes("extra lime");
        if let Some(summary) = form.selection_summary() {
            info!(%summary, "Submitting");
        }
        form.submit().await.map(Some)
    }
    .instrument(span)
    .await?;

    // Staff sees it arrive and completes it
    if let Some(order_id) = order_id {
        let span = tracing::info_span!("bar_queue");
        async {
            if !queue.wait_until(|orders| orders.iter().any(|o| o.id == order_id)).await {
                warn!("Store closed before the order arrived");
                return Ok::<(), StoreError>(());
            }
            for entry in queue.entries(Utc::now()) {
                info!(
                    title = %entry.title,
                    items = ?entry.items,
                    placed_at = %entry.placed_at,
                    elapsed = %entry.elapsed,
                    urgency = %entry.urgency,
                    "Queue entry"
                );
            }
            queue.complete(order_id.as_str()).await?;
            if queue.wait_until(|orders| orders.iter().all(|o| o.id != order_id)).await {
                info!(header = %queue.header(), "Order completed");
            }
            Ok(())
        }
        .instrument(span)
        .await?;
    }

    system.shutdown().await?;
    info!("Application completed successfully");
    Ok(())
}
