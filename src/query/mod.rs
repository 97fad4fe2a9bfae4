//! Read-only queries over a loaded attraction collection. Nothing here modifies its input.

pub mod nearby;
pub mod search;
