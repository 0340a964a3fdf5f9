// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Account rules and the command handler that drives them against a record
// store. The HTTP surface only decodes requests and renders decisions.
//
// ============================================================================

pub mod customer;
