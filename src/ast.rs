// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expression trees.
//!
//! Nodes carry the source span and token text they were parsed from so that
//! diagnostics and folded replacements can point back at the original text.
//! A node produced by folding copies the span and token of the node it
//! replaces.

use std::rc::Rc;

use crate::decimal::Decimal;
use crate::schema::ColumnDescriptor;
use crate::types::DataType;
use crate::value::BoolValue;

/// A half-open byte range in the source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    Paren,
}

impl UnaryOp {
    pub fn describe(self) -> &'static str {
        match self {
            UnaryOp::Pos => "unary operator +",
            UnaryOp::Neg => "unary operator -",
            UnaryOp::Not => "unary operator NOT",
            UnaryOp::Paren => "parentheses",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Is,
}

impl BinaryOp {
    pub fn describe(self) -> &'static str {
        match self {
            BinaryOp::And => "binary operator AND",
            BinaryOp::Or => "binary operator OR",
            BinaryOp::Equal => "binary operator =",
            BinaryOp::NotEqual => "binary operator <>",
            BinaryOp::Greater => "binary operator >",
            BinaryOp::GreaterOrEqual => "binary operator >=",
            BinaryOp::Less => "binary operator <",
            BinaryOp::LessOrEqual => "binary operator <=",
            BinaryOp::Concat => "binary operator ||",
            BinaryOp::Add => "binary operator +",
            BinaryOp::Sub => "binary operator -",
            BinaryOp::Mul => "binary operator *",
            BinaryOp::Div => "binary operator /",
            BinaryOp::Mod => "binary operator %",
            BinaryOp::Is => "operator IS",
        }
    }

    /// Operators whose result is a boolean regardless of operand types.
    pub fn yields_bool(self) -> bool {
        !matches!(
            self,
            BinaryOp::Concat
                | BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod
        )
    }
}

/// A column reference to be resolved against the schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLookup {
    pub name: String,
    pub descriptor: Option<ColumnDescriptor>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// TRUE, FALSE or UNKNOWN.
    Bool(BoolValue),
    /// A 20-byte address constant.
    Address(Vec<u8>),
    /// An integer constant. `address_checksum` records whether the literal
    /// carried a valid address checksum, which permits assigning it the
    /// address type.
    Integer {
        value: Decimal,
        address_checksum: bool,
    },
    /// A constant with a fractional part.
    Fractional(Decimal),
    /// A binary string constant.
    Bytes(Vec<u8>),
    /// The NULL literal.
    Null,
    /// A column reference.
    Column(ColumnLookup),
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        object: Box<ExprNode>,
        subject: Box<ExprNode>,
    },
    Like {
        object: Box<ExprNode>,
        pattern: Box<ExprNode>,
        escape: Option<Box<ExprNode>>,
    },
    In {
        object: Box<ExprNode>,
        subjects: Vec<ExprNode>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub span: Span,
    pub token: Rc<str>,
    pub kind: ExprKind,
    dt: DataType,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: Span, token: &str) -> Self {
        Self {
            span,
            token: Rc::from(token),
            kind,
            dt: DataType::PENDING,
        }
    }

    /// A replacement node produced by folding `from`: same span and token,
    /// new kind and type.
    pub fn folded_from(from: &ExprNode, kind: ExprKind, dt: DataType) -> Self {
        Self::with_token(kind, from.span, Rc::clone(&from.token), dt)
    }

    pub fn with_token(kind: ExprKind, span: Span, token: Rc<str>, dt: DataType) -> Self {
        Self {
            span,
            token,
            kind,
            dt,
        }
    }

    /// The type of this node. Some kinds have an intrinsic type that does
    /// not depend on inference: boolean and address constants, and every
    /// operator that yields a boolean.
    pub fn data_type(&self) -> DataType {
        match &self.kind {
            ExprKind::Bool(_) => DataType::BOOL,
            ExprKind::Address(_) => DataType::ADDRESS,
            ExprKind::Unary {
                op: UnaryOp::Not, ..
            } => DataType::BOOL,
            ExprKind::Binary { op, .. } if op.yields_bool() => DataType::BOOL,
            ExprKind::Like { .. } | ExprKind::In { .. } => DataType::BOOL,
            _ => self.dt,
        }
    }

    pub fn set_type(&mut self, dt: DataType) {
        self.dt = dt;
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Bool(_)
                | ExprKind::Address(_)
                | ExprKind::Integer { .. }
                | ExprKind::Fractional(_)
                | ExprKind::Bytes(_)
                | ExprKind::Null
        )
    }

    /// A short description of a constant node for diagnostics.
    pub fn describe_constant(&self) -> &'static str {
        match self.kind {
            ExprKind::Bool(_) => "boolean constant",
            ExprKind::Address(_) => "address constant",
            ExprKind::Integer { .. } | ExprKind::Fractional(_) => "number constant",
            ExprKind::Bytes(_) => "bytes constant",
            ExprKind::Null => "null constant",
            _ => "non-constant expression",
        }
    }
}

/// Quote an identifier for a diagnostic, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Quote a byte string for a diagnostic. Printable ASCII is kept, everything
/// else is rendered as a hex escape.
pub fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('\'');
    for &b in bytes {
        match b {
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_types() {
        let span = Span::new(0, 4);
        let b = ExprNode::new(ExprKind::Bool(BoolValue::True), span, "TRUE");
        assert_eq!(b.data_type(), DataType::BOOL);

        let mut i = ExprNode::new(
            ExprKind::Integer {
                value: 5.into(),
                address_checksum: false,
            },
            span,
            "5",
        );
        assert_eq!(i.data_type(), DataType::PENDING);
        i.set_type(DataType::INT256);
        assert_eq!(i.data_type(), DataType::INT256);

        let cmp = ExprNode::new(
            ExprKind::Binary {
                op: BinaryOp::GreaterOrEqual,
                object: Box::new(i.clone()),
                subject: Box::new(i),
            },
            span,
            ">=",
        );
        assert_eq!(cmp.data_type(), DataType::BOOL);
    }

    #[test]
    fn folded_nodes_keep_position() {
        let from = ExprNode::new(ExprKind::Null, Span::new(7, 11), "5 + 3");
        let folded = ExprNode::folded_from(
            &from,
            ExprKind::Integer {
                value: 8.into(),
                address_checksum: false,
            },
            DataType::INT256,
        );
        assert_eq!(folded.span, from.span);
        assert_eq!(folded.token, from.token);
        assert_eq!(folded.data_type(), DataType::INT256);
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_identifier("price"), "\"price\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_bytes(b"abc"), "'abc'");
        assert_eq!(quote_bytes(&[0xde, 0xad]), "'\\xde\\xad'");
        assert_eq!(quote_bytes(b"it's"), "'it\\'s'");
    }
}
