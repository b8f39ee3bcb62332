//! `weft-syntax` - Scannerless grammar engine for transpiler front ends.
//!
//! This crate turns source text into typed syntax trees and back again,
//! driven by a grammar declared at startup:
//!
//! - **Grammar**: productions and their variants, built once and frozen
//! - **Engine**: parse, unparse, match and force-fit over that grammar
//! - **Events**: the flat push/pop trace that sits between text and trees
//! - **Trees**: immutable, shareable nodes with copy-on-write editing
//!
//! # Design Principles
//!
//! - **Lossless**: Whitespace and comments are recorded as events, so a
//!   parse trace reproduces its input exactly
//! - **Left recursion**: Direct and indirect left recursion are handled by
//!   growing a seed, so grammars can be written the natural way
//! - **Ordered choice**: The first alternative that succeeds wins;
//!   lookahead sets prune alternatives that cannot start at the next
//!   character
//!
//! # Example
//!
//! ```
//! use weft_syntax::{sample, sexpr, Engine};
//!
//! let sample = sample::arithmetic().unwrap();
//! let engine = Engine::new(&sample.grammar);
//!
//! let parse = engine.parse(sample.expr, "1 + 2 + 3").unwrap();
//! let tree = parse.tree().unwrap();
//! assert_eq!(
//!     sexpr(&sample.grammar, tree),
//!     r#"(Expr.Add (Expr.Add (Number.Int "1") (AddOp.Op "+") (Number.Int "2")) (AddOp.Op "+") (Number.Int "3"))"#
//! );
//!
//! let unparsed = engine.unparse(tree).unwrap();
//! assert_eq!(unparsed.tokens(), ["1", "+", "2", "+", "3"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod event;
pub mod grammar;
pub mod intermediates;
pub mod postcondition;
pub mod sample;
pub mod tree;

pub use engine::{Engine, MAX_INPUT_LEN, Parse, ParseError, ParseOptions, ParseStats, UnparseError, Unparsed};
pub use event::{Event, EventKind, Trace};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, ParSer, ProductionId, VariantId};
pub use tree::{ascii_tree, build_tree, flatten_tree, sexpr, Node, ShapeError, TreeError};
