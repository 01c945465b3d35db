//! bq: binary query tools
//!
//! Command-line front end for the bq metadata search language. Queries such as
//! `file_format:pe AND size:>1mb` are parsed into a syntax tree, checked against the configured
//! field schema, and compiled into a boolean filter tree for a document search backend.
//! Field targets, the schema, and tag tables come from layered `.bq.toml` files.

#![warn(missing_docs)]

pub mod cli;
