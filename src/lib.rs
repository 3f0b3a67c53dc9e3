#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::float_cmp,               // Sentinel ranks are compared against exact constants
    clippy::missing_errors_doc,      // Internal API
    clippy::must_use_candidate,      // Annotated selectively on critical APIs
    clippy::module_name_repetitions, // e.g. LevelTable in table module
    clippy::doc_markdown             // Internal API
)]

pub mod gate;
pub mod table;

// Re-export main types for easy access
pub use gate::{Decision, LevelGate};
pub use table::{FALLBACK_LEVEL, LevelTable, NOT_FOUND, minimum_level};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
