// Process table module - snapshot types, reconciliation, rollups, view

mod aggregate;
mod reconcile;
mod snapshot;
mod view;

pub use aggregate::{aggregate, SystemAggregate};
pub use reconcile::reconcile;
pub use snapshot::{ProcStatus, ProcessIdentity, ProcessRow, Snapshot};
pub use view::{status_tier, visible_rows, FilterState, SortDirection, SortKey, StatusTier};
