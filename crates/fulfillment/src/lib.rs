//! Order fulfillment coordination.
//!
//! The [`OrderCoordinator`] turns an order request into a consistent set of
//! changes across the order store and the stock ledger, which it reaches
//! through an [`InventoryGateway`].
//!
//! Order creation runs as a small saga:
//! 1. Validate every line against current product data
//! 2. Price the order
//! 3. Reserve stock line by line, recording a release for each success
//! 4. Persist the order as `CONFIRMED`
//!
//! If step 3 or 4 fails, the recorded releases run in reverse order before
//! the error is returned, so no reservation outlives the call.

pub mod compensation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;

pub use compensation::{Compensation, CompensationReport};
pub use config::{CoordinatorConfig, GatewayConfig};
pub use coordinator::OrderCoordinator;
pub use error::{FulfillmentError, GatewayError, Result};
pub use gateway::InventoryGateway;
