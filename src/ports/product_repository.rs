//! Product repository port.
//!
//! Products are owned by the external document store; the core only reads
//! them and lazily writes back card-rail mirror ids.

use async_trait::async_trait;

use crate::domain::billing::{Product, ProductKind};
use crate::domain::foundation::{DomainError, ProductId};

/// Repository port for Product records.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product.
    async fn save(&self, product: &Product) -> Result<(), DomainError>;

    /// Update an existing product (mirror ids, activity flag).
    async fn update(&self, product: &Product) -> Result<(), DomainError>;

    /// Find a product by id. Returns `None` if absent.
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, DomainError>;

    /// Find a product by id, constrained to the expected kind.
    ///
    /// Checkout resolves products this way so a subscription checkout can
    /// never silently bind to a one-time product with the same id.
    async fn find_by_id_and_kind(
        &self,
        id: &ProductId,
        kind: ProductKind,
    ) -> Result<Option<Product>, DomainError>;

    /// Find the product mirrored to a card-rail price id.
    async fn find_by_card_price_id(
        &self,
        price_id: &str,
    ) -> Result<Option<Product>, DomainError>;

    /// All active products, for the billing overview.
    async fn find_active(&self) -> Result<Vec<Product>, DomainError>;
}
