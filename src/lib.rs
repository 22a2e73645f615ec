//! HUNT: reads ASCII-art UI mockups and the CBHS pattern language, matches
//! patterns against flood-filled grid regions, and assembles the result
//! into a component model a code generator can walk.
//!
//! ## Pipeline
//!
//! ```text
//! .hunt source  --lex/parse-->  ast::Program
//!                                    |
//!                              pattern::compile
//!                                    v
//!                          pattern::PatternRegistry
//!                                    |
//! grid text  --candidate::extract--> Vec<Candidate>
//!                                    |
//!                              engine::match_all
//!                                    v
//!                           model::Model (components +
//!                                relationships)
//!                                    |
//!                              generator::Generator
//!                                    v
//!                             generated artifact
//! ```
//!
//! `pipeline` wires the above into named, independently retriable stages
//! behind one [`diagnostics::DiagnosticSink`]; `api` is the stable entry
//! point most callers should use instead of driving the stages by hand.

pub mod ast;
pub mod candidate;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod grid;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod pattern;
pub mod pipeline;

mod engine;

pub mod api;

pub use api::{Options, RunResult, run, run_with};
pub use diagnostics::{Diagnostic, DiagnosticKind, Outcome, Severity};
pub use error::{HuntError, Result};
