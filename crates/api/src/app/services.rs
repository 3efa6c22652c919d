use std::sync::Arc;

use orderdesk_infra::store::{CatalogStore, InMemoryStore, OrderStore, PostgresStore};
use orderdesk_orders::{PlacementNotifier, PlacementReceipt};

/// Store backend selected at startup.
pub enum StoreBackend {
    InMemory(Arc<InMemoryStore>),
    Persistent(Arc<PostgresStore>),
}

/// Shared service handles injected into every handler.
pub struct AppServices {
    backend: StoreBackend,
    notifier: Arc<dyn PlacementNotifier>,
    payment_webhook_secret: Vec<u8>,
}

impl AppServices {
    pub fn order_store(&self) -> &dyn OrderStore {
        match &self.backend {
            StoreBackend::InMemory(store) => store.as_ref(),
            StoreBackend::Persistent(store) => store.as_ref(),
        }
    }

    pub fn catalog_store(&self) -> &dyn CatalogStore {
        match &self.backend {
            StoreBackend::InMemory(store) => store.as_ref(),
            StoreBackend::Persistent(store) => store.as_ref(),
        }
    }

    pub fn notifier(&self) -> &dyn PlacementNotifier {
        self.notifier.as_ref()
    }

    pub fn payment_webhook_secret(&self) -> &[u8] {
        &self.payment_webhook_secret
    }
}

/// Notification seam: downstream senders (email/push) are external
/// collaborators, so the in-process implementation just records the fan-out.
struct LogNotifier;

impl PlacementNotifier for LogNotifier {
    fn order_placed(&self, receipt: &PlacementReceipt) {
        tracing::info!(
            order_id = %receipt.order_id,
            retailer_count = receipt.retailer_ids.len(),
            "order placed; notifying affected retailers"
        );
    }
}

/// Select the backend from the environment: `USE_PERSISTENT_STORES=true`
/// plus `DATABASE_URL` picks Postgres; anything else runs in-memory
/// (dev/test).
pub async fn build_services(payment_webhook_secret: String) -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let backend = if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        let pool = sqlx::PgPool::connect(&database_url)
            .await
            .expect("failed to connect to Postgres");
        StoreBackend::Persistent(Arc::new(PostgresStore::new(pool)))
    } else {
        tracing::info!("using in-memory store (set USE_PERSISTENT_STORES=true for Postgres)");
        StoreBackend::InMemory(Arc::new(InMemoryStore::new()))
    };

    AppServices {
        backend,
        notifier: Arc::new(LogNotifier),
        payment_webhook_secret: payment_webhook_secret.into_bytes(),
    }
}

/// In-memory services over a caller-provided store (test seeding surface).
pub fn in_memory_services(
    store: Arc<InMemoryStore>,
    payment_webhook_secret: String,
) -> AppServices {
    AppServices {
        backend: StoreBackend::InMemory(store),
        notifier: Arc::new(LogNotifier),
        payment_webhook_secret: payment_webhook_secret.into_bytes(),
    }
}
