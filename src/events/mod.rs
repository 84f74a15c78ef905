use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Domain events emitted by the services. Delivery is in-process and
/// best-effort: a failed send is logged by the caller, never a request error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(i64),
    OrderDeleted(i64),
    DeliveryStatusChanged {
        order_id: i64,
        delivered: bool,
    },
    CreditNoteCreated(i64),
    CreditNoteStatusChanged {
        credit_note_id: i64,
        old_status: String,
        new_status: String,
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

/// Consumes events from the channel until all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");

    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::OrderDeleted(order_id) => {
                info!(order_id = %order_id, "Order deleted");
            }
            Event::DeliveryStatusChanged {
                order_id,
                delivered,
            } => {
                info!(order_id = %order_id, delivered = %delivered, "Delivery status changed");
            }
            Event::CreditNoteCreated(credit_note_id) => {
                info!(credit_note_id = %credit_note_id, "Credit note created");
            }
            Event::CreditNoteStatusChanged {
                credit_note_id,
                old_status,
                new_status,
            } => {
                info!(
                    credit_note_id = %credit_note_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Credit note status changed"
                );
            }
        }
        debug!(?event, "Event processed");
    }

    info!("Event processor stopped");
}
