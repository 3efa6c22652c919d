use orderdesk_auth::PrincipalId;
use orderdesk_core::RetailerId;

/// Retailer context for a request.
///
/// This is immutable and must be present for all order-dashboard routes;
/// every read and write is scoped to this retailer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetailerContext {
    retailer_id: RetailerId,
    principal_id: PrincipalId,
}

impl RetailerContext {
    pub fn new(retailer_id: RetailerId, principal_id: PrincipalId) -> Self {
        Self {
            retailer_id,
            principal_id,
        }
    }

    pub fn retailer_id(&self) -> RetailerId {
        self.retailer_id
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }
}
