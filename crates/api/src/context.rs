use crewdesk_core::DocumentId;

/// Authenticated customer for a request.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerContext {
    customer_id: DocumentId,
    session_id: DocumentId,
}

impl CustomerContext {
    pub fn new(customer_id: DocumentId, session_id: DocumentId) -> Self {
        Self {
            customer_id,
            session_id,
        }
    }

    /// The customer's internal `_id`.
    pub fn customer_id(&self) -> DocumentId {
        self.customer_id
    }

    pub fn session_id(&self) -> DocumentId {
        self.session_id
    }
}
