// ============================================================================
// Customer Domain - Credit and Limit Management
// ============================================================================
//
// This module contains ALL customer account code:
// - Value objects (CustomerId, CreditLimit, CreditUnits)
// - Commands (SetLimit, RequestCredit)
// - Errors (CustomerError enum)
// - Account engine (CustomerAccount decisions, no I/O)
// - Order check events (inbound order_create, outbound order_checked)
// - Command Handler (load, decide, conditional write)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
