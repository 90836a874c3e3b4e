//! Tree/cell codec
//!
//! [`flatten`] turns a document into cells, [`unflatten`] puts cells back
//! together, and [`rename`] adjusts field names on either side.

pub mod flatten;
pub mod rename;
pub mod unflatten;

pub use flatten::{flatten, flatten_selected, flatten_under, Cells};
pub use rename::{normalize_keys, rename_keys, RenameMap};
pub use unflatten::{unflatten, Unflattener};
