// ABOUTME: Verbosity levels and banner text for the CLI

/// Diagnostic verbosity, mirroring `--verbosity N` (§6a). Re-exported here
/// (not just on `Context`) so `main.rs` can talk about it without reaching
/// into `context`.
pub use crate::context::Verbosity;

/// Prepended to generated output unless the caller opts out, matching the
/// autogeneration banner convention described in §4.5.
pub const AUTOGENERATED_BANNER: &str =
    "<!-- This document was autogenerated by xacro from a macro-annotated source. \
     Do not edit. -->\n";
