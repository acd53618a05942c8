use std::sync::Arc;

use tracing::warn;

use super::domain::{AuditLogEntry, NewAuditEntry};
use super::repository::{AuditRepository, RepositoryError};

/// Fire-and-forget writer for administrative actions.
///
/// A failed append is logged and dropped; it never fails the action being recorded.
pub struct AuditLogWriter<A> {
    repository: Arc<A>,
}

impl<A> Clone for AuditLogWriter<A> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<A> AuditLogWriter<A>
where
    A: AuditRepository + 'static,
{
    pub fn new(repository: Arc<A>) -> Self {
        Self { repository }
    }

    pub fn record(&self, action: &str, resource: &str, detail: &str, author: &str) {
        let entry = NewAuditEntry {
            action: action.to_string(),
            resource: resource.to_string(),
            detail: detail.to_string(),
            author: author.to_string(),
        };

        if let Err(error) = self.repository.append(entry) {
            warn!(%action, %resource, %author, %error, "audit entry dropped");
        }
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        self.repository.recent(limit)
    }
}
