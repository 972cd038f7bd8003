//! Purpose: Library crate behind the `tractorbeam` CLI and its tests.
//! Exports: `api` (staging operations, storage seam, errors), `core`, `storage`.
//! Role: Keeps the tree rewriter and URL rules usable without the binary.
//! Invariants: Callers pass settings explicitly through `api::Context`.
//! Invariants: No process-wide state; the CLI owns logging and exit codes.
pub mod api;
pub mod core;
pub mod storage;
