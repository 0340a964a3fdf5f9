// ============================================================================
// Record Store - Customer Persistence
// ============================================================================
//
// `CustomerStore` is the port the command handler talks to. Implementations:
// - InMemoryCustomerStore: default backend, also used by tests
// - ScyllaCustomerStore: durable backend using lightweight transactions
//
// ============================================================================

mod customer_store;
mod in_memory;
mod scylla_store;

pub use customer_store::{CustomerStore, DynCustomerStore, OrderCheckCommit, StoreError, Versioned};
pub use in_memory::InMemoryCustomerStore;
pub use scylla_store::ScyllaCustomerStore;
