//! Identity, lifecycle and query primitives shared by every stored entity.

mod filter;
mod id;
mod status;
mod traits;

pub use filter::{
    lookup, Condition, Filter, FindOptions, Projection, SortDirection, SortKey, ID_FIELD,
};
pub use id::DocumentId;
pub use status::{Status, Transition, TransitionError};
pub use traits::{
    format_timestamp, normalize_payload, stamp, stamp_update, Document, STORE_MANAGED_FIELDS,
};
