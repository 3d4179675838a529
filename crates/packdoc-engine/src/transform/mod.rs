//! The operation engine: primitive mutations over a document tree.
//!
//! # Operations
//!
//! `add`, `delete`, `update`, `merge`, `add_unique`, `assert`.
//!
//! Applicators mutate the document they are handed; batch application
//! threads one document through the list and reports the failing index.
//! Atomicity is the executor's job — it hands in a copy and discards it on
//! failure.

pub mod apply;
pub mod codec;
pub mod types;
pub mod validate;

pub use apply::{apply_batch, apply_op};
pub use codec::{decode_op, decode_ops, encode_op, encode_ops};
pub use types::{BatchError, MergeStrategy, Op, OpError};
pub use validate::{validate_operation, validate_operations, ValidationError};
