//! Order persistence.
//!
//! An [`OrderRepository`] stores whole [`Order`](domain::Order) aggregates,
//! lines included. Writes are guarded by the order's
//! [`Version`](common::Version): a save only succeeds if the stored copy is
//! still at the version the caller loaded.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
pub use query::OrderQuery;
pub use repository::OrderRepository;
