use super::value_objects::{CreditLimit, CreditUnits, CustomerId};

// ============================================================================
// Customer Domain Commands
// ============================================================================

/// Mutating operations on a customer account. Reads go through
/// `CustomerAccount::lookup` and never produce a command.
#[derive(Debug, Clone)]
pub enum CustomerCommand {
    SetLimit {
        customer_id: CustomerId,
        limit: CreditLimit,
    },
    RequestCredit {
        customer_id: CustomerId,
        units: CreditUnits,
    },
}

impl CustomerCommand {
    pub fn customer_id(&self) -> &CustomerId {
        match self {
            CustomerCommand::SetLimit { customer_id, .. } => customer_id,
            CustomerCommand::RequestCredit { customer_id, .. } => customer_id,
        }
    }

    /// Label used for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            CustomerCommand::SetLimit { .. } => "set_limit",
            CustomerCommand::RequestCredit { .. } => "request_credit",
        }
    }
}
