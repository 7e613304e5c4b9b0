use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the coupon engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CouponCreated(Uuid),
    CouponUpdated(Uuid),
    CouponDeactivated(Uuid),
    CouponDeleted(Uuid),
    CouponRedeemed {
        coupon_id: Uuid,
        customer_id: Uuid,
        order_id: Uuid,
        discount_amount: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes engine events. Downstream integrations (notifications, vendor
/// reporting) hang off this loop; the engine itself only logs.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::CouponRedeemed {
                coupon_id,
                customer_id,
                order_id,
                discount_amount,
            } => {
                info!(
                    %coupon_id,
                    %customer_id,
                    %order_id,
                    %discount_amount,
                    "coupon redeemed"
                );
            }
            other => {
                info!(event = ?other, "coupon event");
            }
        }
    }
    warn!("event channel closed; processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::CouponCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");
        assert!(matches!(rx.recv().await, Some(Event::CouponCreated(_))));
    }
}
