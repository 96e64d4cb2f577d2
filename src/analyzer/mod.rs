pub mod attribute;
pub mod combinators;
pub mod context;
pub mod core;
pub mod error_handling;
pub mod input;
pub mod journal;
pub mod numeric;
pub mod prelude;
pub mod primitives;
pub mod rule;
pub mod symbols;

pub use attribute::{resolve, Attribute, Shape, Value};
pub use context::{ActionContext, Context};
pub use core::{Commit, Node, NodeKind, ParseError, ParseResult, Parser};
pub use error_handling::{
    CollectingErrorHandler, Diagnostic, ErrorHandler, Location, Severity, TracingErrorHandler,
};
pub use input::{CodePoints, Input, NullTerminated};
pub use rule::{CallbackSink, Grammar, GrammarBuilder, RuleDecl, RuleHandle, RuleId};
pub use symbols::Symbols;
