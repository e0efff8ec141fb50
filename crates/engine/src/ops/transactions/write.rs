//! Balance-mutating transaction writes.
//!
//! Every write follows the same discipline: validate the request, take the
//! asset lock(s), open one database transaction that rewrites the asset
//! balance(s) and then the transaction row, commit, release the locks, and
//! only then run the best-effort budget evaluation.

mod create;
mod delete;
mod update;
