//! In-memory adapters for the document-store and notifier ports.

mod stores;

pub use stores::{
    InMemoryCoupons, InMemoryPaymentIntents, InMemoryProducts, InMemoryPurchases,
    InMemoryReminders, InMemorySubscriptions, InMemoryUsers, InMemoryWebhookEvents,
    RecordingNotifier,
};
