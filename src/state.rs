use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::QueueEvent;
use crate::services::admission::AdmissionPolicy;
use crate::services::clock::Clock;
use crate::services::payments::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub policy: AdmissionPolicy,
    pub clock: Box<dyn Clock>,
    pub payments: Box<dyn PaymentGateway>,
    pub queue_tx: broadcast::Sender<QueueEvent>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        clock: Box<dyn Clock>,
        payments: Box<dyn PaymentGateway>,
    ) -> Self {
        let (queue_tx, _) = broadcast::channel(256);
        Self {
            db: Arc::new(Mutex::new(conn)),
            policy: AdmissionPolicy::from_config(&config),
            config,
            clock,
            payments,
            queue_tx,
        }
    }

    /// Locks the shared connection. Ledger writes are single transactions,
    /// so a poisoned lock still guards a consistent database.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
