use super::commands::CustomerCommand;
use super::errors::CustomerError;
use super::value_objects::{CreditLimit, CreditUnits, CustomerId};

// ============================================================================
// Customer Account - Credit/Limit State Engine
// ============================================================================
//
// Pure decision logic. Given the current record (or its absence) and a
// command, computes the next record and the decision to report. Nothing here
// touches the store; the command handler persists what the engine decides.
//
// Invariant: 0 <= credit <= limit for every account this module produces.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAccount {
    customer_id: CustomerId,
    credit: i64,
    limit: i64,
}

/// Outcome of a command that was not rejected with an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// First limit for an unknown customer; account starts at zero credit
    Created(CustomerAccount),
    LimitChanged(CustomerAccount),
    CreditAccepted(CustomerAccount),
    /// Requested credit would exceed the limit; carries the unchanged account
    CreditRejected(CustomerAccount),
}

impl CustomerAccount {
    /// Rebuild an account from stored fields, refusing records that break
    /// the credit/limit invariant.
    pub fn restore(customer_id: CustomerId, credit: i64, limit: i64) -> Result<Self, CustomerError> {
        if credit < 0 || limit < 0 || credit > limit {
            return Err(CustomerError::CorruptRecord(format!(
                "customer {} has credit {} and limit {}",
                customer_id, credit, limit
            )));
        }
        Ok(Self {
            customer_id,
            credit,
            limit,
        })
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn credit(&self) -> i64 {
        self.credit
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn lookup(current: Option<&Self>, customer_id: &CustomerId) -> Result<Self, CustomerError> {
        current
            .cloned()
            .ok_or_else(|| CustomerError::NotFound(customer_id.clone()))
    }

    pub fn handle_command(
        current: Option<&Self>,
        command: &CustomerCommand,
    ) -> Result<Decision, CustomerError> {
        match command {
            CustomerCommand::SetLimit { customer_id, limit } => {
                Self::set_limit(current, customer_id, *limit)
            }
            CustomerCommand::RequestCredit { customer_id, units } => {
                Self::request_credit(current, customer_id, *units)
            }
        }
    }

    fn set_limit(
        current: Option<&Self>,
        customer_id: &CustomerId,
        limit: CreditLimit,
    ) -> Result<Decision, CustomerError> {
        let Some(account) = current else {
            return Ok(Decision::Created(Self {
                customer_id: customer_id.clone(),
                credit: 0,
                limit: limit.value(),
            }));
        };

        // Business rule: the limit can never drop below outstanding credit
        if limit.value() < account.credit {
            return Err(CustomerError::LimitBelowCredit {
                customer_id: customer_id.clone(),
                requested: limit.value(),
                credit: account.credit,
            });
        }

        Ok(Decision::LimitChanged(Self {
            limit: limit.value(),
            ..account.clone()
        }))
    }

    fn request_credit(
        current: Option<&Self>,
        customer_id: &CustomerId,
        units: CreditUnits,
    ) -> Result<Decision, CustomerError> {
        let account = current.ok_or_else(|| CustomerError::NotFound(customer_id.clone()))?;

        let requested_total = units
            .credit()
            .and_then(|amount| account.credit.checked_add(amount));

        match requested_total {
            Some(total) if total <= account.limit => Ok(Decision::CreditAccepted(Self {
                credit: total,
                ..account.clone()
            })),
            _ => Ok(Decision::CreditRejected(account.clone())),
        }
    }
}

impl Decision {
    pub fn account(&self) -> &CustomerAccount {
        match self {
            Decision::Created(account)
            | Decision::LimitChanged(account)
            | Decision::CreditAccepted(account)
            | Decision::CreditRejected(account) => account,
        }
    }

    pub fn into_account(self) -> CustomerAccount {
        match self {
            Decision::Created(account)
            | Decision::LimitChanged(account)
            | Decision::CreditAccepted(account)
            | Decision::CreditRejected(account) => account,
        }
    }

    /// Rejections leave the stored record untouched
    pub fn requires_write(&self) -> bool {
        !matches!(self, Decision::CreditRejected(_))
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, Decision::CreditRejected(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Created(_) => "created",
            Decision::LimitChanged(_) => "limit_changed",
            Decision::CreditAccepted(_) => "accepted",
            Decision::CreditRejected(_) => "rejected",
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
