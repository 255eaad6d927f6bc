//! Chartflow: compiles ASM/FSM charts into synthesizable VHDL.
//!
//! The pipeline validates a chart description, builds a prioritized state table, merges
//! behaviorally equivalent states, assigns a stable binary encoding, minimizes the
//! next-state and output equations to sum-of-products form, and renders the result as
//! one VHDL entity. The whole compilation is a pure function of its inputs: no global
//! state, deterministic byte-identical output, safe to run concurrently one compilation
//! per task.

// # Tries to deny most lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::private_doc_tests)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(elided_lifetimes_in_paths)]

pub mod chart;
pub mod config;
pub mod encode;
pub mod expr;
pub mod logic;
pub mod minimize;
pub mod pipeline;
pub mod qm;
pub mod table;
pub mod utils;
pub mod vhdl;
pub mod vhdlgen;

pub use chart::{Chart, ChartDesc, Direction, Signal, StateDesc, TransitionDesc, UnreachableStateWarning, ValidationError};
pub use config::CompileConfig;
pub use encode::EncodingPolicy;
pub use expr::{Expr, Var};
pub use pipeline::{compile, CompileError, CompileOutput, Diagnostic, DiagnosticKind, Stage};
pub use table::NonDeterminismError;
