use thiserror::Error;

/// Contract violations detected while a grammar is assembled or before a
/// parse starts. None of these can happen in the middle of a parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("Rule '{name}' is declared but never defined")]
    UnboundRule { name: String },
    #[error("Rule '{name}' is already defined")]
    RuleAlreadyDefined { name: String },
    #[error("Rule '{name}' belongs to a different grammar builder")]
    ForeignRule { name: String },
    #[error("Rule '{rule}' declares attribute {declared}, but its definition produces {found}")]
    IncompatibleRuleAttribute {
        rule: String,
        declared: String,
        found: String,
    },
    #[error("Rule '{rule}' takes {expected} parameter(s), {found} given")]
    ParamCount {
        rule: String,
        expected: usize,
        found: usize,
    },
    #[error("Radix {radix} is not supported by {parser}")]
    InvalidRadix { radix: u32, parser: String },
    #[error("Invalid digit bounds: min {min}, max {max}")]
    InvalidDigitBounds { min: usize, max: usize },
    #[error("Invalid repeat bounds: min {min}, max {max}")]
    InvalidRepeatBounds { min: usize, max: usize },
    #[error("Invalid character range: '{lo}' > '{hi}'")]
    InvalidCharRange { lo: char, hi: char },
    #[error("Literal parsers need at least one character")]
    EmptyLiteral,
    #[error("string_view requires contiguous text input")]
    NonContiguousView,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
