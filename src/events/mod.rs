use chrono::NaiveDate;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events published after a state change has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    DeliveryNoteCreated {
        note_id: Uuid,
        document_number: String,
    },
    DeliveryNoteDelivered {
        note_id: Uuid,
        document_number: String,
        delivery_date: NaiveDate,
        quantity_delivered: Decimal,
    },
    DeliveryNoteFailed {
        note_id: Uuid,
        document_number: String,
    },
    DeliveryNoteInvoiced {
        note_id: Uuid,
        invoice_number: String,
    },
    DeliveryNoteDeleted(Uuid),

    CashTransactionRecorded {
        transaction_id: Uuid,
        signed_amount: Decimal,
    },
    CashTransactionDeleted {
        transaction_id: Uuid,
        signed_amount: Decimal,
    },
    /// The cached balance disagreed with the log and was rewritten.
    CashBalanceRepaired {
        cached: Option<Decimal>,
        recomputed: Decimal,
    },

    MasterDataImported {
        entity: String,
        created: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DeliveryNoteCreated { .. } => "delivery_note_created",
            Event::DeliveryNoteDelivered { .. } => "delivery_note_delivered",
            Event::DeliveryNoteFailed { .. } => "delivery_note_failed",
            Event::DeliveryNoteInvoiced { .. } => "delivery_note_invoiced",
            Event::DeliveryNoteDeleted(_) => "delivery_note_deleted",
            Event::CashTransactionRecorded { .. } => "cash_transaction_recorded",
            Event::CashTransactionDeleted { .. } => "cash_transaction_deleted",
            Event::CashBalanceRepaired { .. } => "cash_balance_repaired",
            Event::MasterDataImported { .. } => "master_data_imported",
        }
    }
}

/// Drains the event channel, logging and counting every event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("surat_jalan_events_total", 1, "event" => event.name());

        match &event {
            Event::DeliveryNoteDelivered {
                document_number,
                quantity_delivered,
                ..
            } => {
                info!(
                    document_number = %document_number,
                    quantity_delivered = %quantity_delivered,
                    "Delivery confirmed"
                );
            }
            Event::DeliveryNoteFailed {
                document_number, ..
            } => {
                warn!(document_number = %document_number, "Delivery marked as failed");
            }
            Event::CashBalanceRepaired { cached, recomputed } => {
                warn!(?cached, %recomputed, "Cash balance cache was repaired");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_reaches_receiver() {
        let (sender, mut rx) = EventSender::channel(4);
        let id = Uuid::new_v4();
        sender.send(Event::DeliveryNoteDeleted(id)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::DeliveryNoteDeleted(id)));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        assert!(sender
            .send(Event::DeliveryNoteDeleted(Uuid::new_v4()))
            .await
            .is_err());
        // Must not panic.
        sender
            .send_or_log(Event::DeliveryNoteDeleted(Uuid::new_v4()))
            .await;
    }
}
