use chrono::{DateTime, Utc};

/// Order domain entity
///
/// The id is the human-readable allocated order identifier
/// (e.g. `GBA-00042`); `sequence` is the numeric part before padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub factory_key: String,
    pub sequence: u64,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderInput {
    pub factory_key: String,
    pub created_by: String,
}

/// Input for getting an order by its allocated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOrderInput {
    pub order_id: String,
}
