//! Query language front end for bq binary-metadata search.
//!
//! This crate turns analyst queries into a located syntax tree and offers editor tooling over
//! that tree:
//!
//! - **Global search**: `deadbeef` - searches hashes and names across default fields
//! - **Field search**: `file_format:pe`, `size:>=1mb`, `name:"Setup.exe"`
//! - **Prefix search**: `filename:setup*`
//! - **Exists**: `av.result:` - field is present
//! - **Ranges**: `size:[1kb TO 10mb)`
//! - **Boolean logic**: `AND`, `OR`, `NOT`/`!`, `( ... )`, implicit AND between terms
//!
//! # Example
//!
//! ```
//! use bq_query::{Completion, autocomplete, parse};
//!
//! let expr = parse("file_format:pe AND size:>1mb").unwrap();
//! assert!(expr.is_some());
//!
//! assert!(matches!(autocomplete("size:>1mb", 1), Completion::FieldName { .. }));
//! ```

#![warn(missing_docs)]

mod ast;
mod autocomplete;
mod error;
mod lexer;
mod parser;
mod validate;

pub use ast::{
    Comparator, Expression, LogicalOperator, Number, NumberExpression, Operator, Quotes,
    RangeExpression, StringExpression, Tag, TokenLocation, Value,
};
pub use autocomplete::{Completion, EXISTS_PROMPT, autocomplete};
pub use error::{SyntaxError, SyntaxErrorKind};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::parse;
pub use validate::validate;
