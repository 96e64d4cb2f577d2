//! Attribute-inferring parser combinators.
//!
//! Grammars are trees of shared [`Node`]s built with the functions in
//! [`prelude`] and the `>>`, `|`, `-`, `!` and `%` operators. Every node knows
//! the [`Shape`] of the value it produces, so a parse yields a typed [`Value`]
//! without any user code. Recursive grammars go through named rules declared
//! on a [`GrammarBuilder`].
//!
//! ```ignore
//! use attrparse::prelude::*;
//!
//! let list = Grammar::new(int_() % ',')?;
//! let value = attrparse::Parse::new(&list).skipper(ws()).run(&"1, 2, 3")?;
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod parse;

// Re-exports
pub use analyzer::prelude;
pub use analyzer::{
    ActionContext, Attribute, CallbackSink, CodePoints, CollectingErrorHandler, Commit, Diagnostic,
    ErrorHandler, Grammar, GrammarBuilder, Input, Location, Node, NullTerminated, ParseError,
    Parser, RuleDecl, RuleHandle, RuleId, Severity, Shape, Symbols, TracingErrorHandler, Value,
};
pub use config::ParseOptions;
pub use error::{Error, GrammarError, Result};
pub use parse::{callback_parse, matches, parse, parse_as, prefix_parse, Parse};
