// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod checker;
mod decimal;
mod diag;
mod schema;
mod types;
mod value;

pub use ast::{
    quote_bytes, quote_identifier, BinaryOp, ColumnLookup, ExprKind, ExprNode, Span, UnaryOp,
};
pub use checker::{
    check_expr, CheckOptions, TypeAction, MAX_FRACTIONAL_PART_DIGITS, MAX_INTEGER_PART_DIGITS,
};
pub use decimal::{Decimal, ParseDecimalError};
pub use diag::{Category, Diagnostic, ErrorCode, ErrorList, Severity};
pub use schema::{Column, ColumnDescriptor, ColumnRef, Schema, Table, TableRef};
pub use types::{DataType, Major};
pub use value::{BoolValue, Constant};
