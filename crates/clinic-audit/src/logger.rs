//! Audit logger trait

use crate::origin::Origin;
use crate::record::EventRecord;
use crate::store::AppendReceipt;

/// Trait for audit logging (dependency injection)
///
/// The interception layer only needs somewhere to hand finished records and
/// the origin to stamp them with. [`crate::AuditTrail`] is the production
/// implementation; tests can substitute a recorder.
pub trait AuditLogger: Send + Sync {
    /// Append `record` and notify listeners. Must not fail.
    fn log_event(&self, record: EventRecord) -> AppendReceipt;

    /// Origin stamped on records created through this logger
    fn origin(&self) -> &Origin;
}
