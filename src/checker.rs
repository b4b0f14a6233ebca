// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type checking, type inference and constant folding for expressions.
//!
//! [`check_expr`] walks an expression tree bottom-up. Children are always
//! checked without a type action first, so constant literals surface with a
//! pending type, and every operator folds constant operands into a literal
//! replacement node before the caller's type action is applied. The caller's
//! action runs last: it is delegated to the replacement node when the type is
//! still pending, or verified against the node's decided type otherwise.
//!
//! Failure is reported by returning `None` after appending at least one
//! error to the [`ErrorList`]. Checking never stops at the first problem a
//! subtree can report independently.

use core::cmp::Ordering;
use core::fmt::Write as _;
use std::rc::Rc;

use regex::bytes::Regex;

use crate::ast::{quote_bytes, quote_identifier, BinaryOp, ExprKind, ExprNode, Span, UnaryOp};
use crate::decimal::Decimal;
use crate::diag::{Diagnostic, ErrorCode, ErrorList};
use crate::schema::{ColumnCache, Schema, TableRef};
use crate::types::{DataType, Major};
use crate::value::{BoolValue, Constant};

/// Digit cap for the integer part of a folded constant.
pub const MAX_INTEGER_PART_DIGITS: usize = 200;
/// Digit cap for the fractional part of a folded constant, also the
/// precision of constant division.
pub const MAX_FRACTIONAL_PART_DIGITS: u32 = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Reject column references, forcing the expression to be a constant.
    pub constant_only: bool,
    /// Report out-of-range constants as errors instead of cropping them.
    pub safe_math: bool,
}

/// What the caller wants done with the type of the node under check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeAction {
    /// Give the node the default type of its category.
    InferDefault,
    /// Give the node a type of the given width in bytes.
    InferWithSize(u8),
    /// Give the node a type of the given major category.
    InferWithMajor(Major),
    /// The node must have exactly this type.
    Assign(DataType),
}

/// Check one expression tree against a table of `schema`. On success the
/// returned tree has constants folded and types resolved as far as the
/// type action allows; on failure `None` is returned and at least one error
/// has been appended to `el`.
pub fn check_expr(
    node: ExprNode,
    schema: &Schema,
    options: CheckOptions,
    el: &mut ErrorList,
    table: TableRef,
    action: Option<TypeAction>,
) -> Option<ExprNode> {
    let mut checker = Checker {
        schema,
        options,
        cache: ColumnCache::new(),
        el,
        table,
    };
    checker.check(node, action)
}

struct Checker<'a> {
    schema: &'a Schema,
    options: CheckOptions,
    cache: ColumnCache,
    el: &'a mut ErrorList,
    table: TableRef,
}

enum NumberValue {
    Integer(Decimal),
    Fractional(Decimal),
    NullTyped,
    NullUntyped,
}

enum BytesValue {
    Bytes(Vec<u8>),
    NullTyped,
    NullUntyped,
}

impl Checker<'_> {
    fn check(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        match n.kind {
            ExprKind::Column(_) => self.check_column(n, action),
            ExprKind::Bool(_) => self.check_bool_value(n, action),
            ExprKind::Address(_) => self.check_address_value(n, action),
            ExprKind::Integer { .. } => self.check_integer_value(n, action),
            ExprKind::Fractional(_) => self.check_fractional_value(n, action),
            ExprKind::Bytes(_) => self.check_bytes_value(n, action),
            ExprKind::Null => self.check_null_value(n, action),
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::Pos => self.check_pos_operator(n, action),
                UnaryOp::Neg => self.check_neg_operator(n, action),
                UnaryOp::Not => self.check_not_operator(n, action),
                UnaryOp::Paren => self.check_paren_operator(n, action),
            },
            ExprKind::Binary { op, .. } => match op {
                BinaryOp::And | BinaryOp::Or => self.check_logical_operator(n, action, op),
                BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterOrEqual
                | BinaryOp::Less
                | BinaryOp::LessOrEqual => self.check_relational_operator(n, action, op),
                BinaryOp::Concat => self.check_concat_operator(n, action),
                BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod => self.check_arithmetic_operator(n, action, op),
                BinaryOp::Is => self.check_is_operator(n, action),
            },
            ExprKind::Like { .. } => self.check_like_operator(n, action),
            ExprKind::In { .. } => self.check_in_operator(n, action),
        }
    }

    // Type action plumbing.

    /// Check the decided type of a node against a mandatory type action.
    /// Inference hints are no-ops on a node whose type is already known.
    fn verify_type_action(
        &mut self,
        n: ExprNode,
        origin: &'static str,
        dt: DataType,
        action: Option<TypeAction>,
    ) -> Option<ExprNode> {
        if let Some(TypeAction::Assign(expected)) = action {
            if expected != dt {
                self.assign_type_error(n.span, origin, expected, dt);
                return None;
            }
        }
        Some(n)
    }

    /// Operators cannot decide a pending type by themselves, so the action
    /// is re-dispatched to the node being returned, which is a literal
    /// replacement whenever the type can still be pending.
    fn delegate_type_action(
        &mut self,
        n: ExprNode,
        origin: &'static str,
        dt: DataType,
        action: Option<TypeAction>,
    ) -> Option<ExprNode> {
        if action.is_some() && dt.pending() {
            return self.check(n, action);
        }
        self.verify_type_action(n, origin, dt, action)
    }

    // Leaf nodes.

    fn check_column(&mut self, mut n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_column";
        let span = n.span;

        let ExprKind::Column(lookup) = &mut n.kind else {
            unreachable!("node is not a column")
        };
        if self.options.constant_only {
            self.el.append(Diagnostic::error(
                span,
                ErrorCode::NonConstantExpression,
                ORIGIN,
                format!("{} is not a constant", quote_identifier(&lookup.name)),
            ));
            return None;
        }
        let Some(descriptor) = self.cache.find_column(self.schema, self.table, &lookup.name)
        else {
            let message = format!(
                "cannot find column {} in table {}",
                quote_identifier(&lookup.name),
                quote_identifier(&self.schema.table(self.table).name),
            );
            self.el
                .append(Diagnostic::error(span, ErrorCode::ColumnNotFound, ORIGIN, message));
            return None;
        };
        lookup.descriptor = Some(descriptor);
        let dt = self.schema.column(descriptor).dt;
        n.set_type(dt);
        self.verify_type_action(n, ORIGIN, dt, action)
    }

    fn check_bool_value(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_bool_value";
        if let Some(TypeAction::Assign(expected)) = action {
            if expected.major() != Major::BOOL {
                self.assign_constant_error(&n, ORIGIN, expected);
                return None;
            }
        }
        Some(n)
    }

    fn check_address_value(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_address_value";
        if let Some(TypeAction::Assign(expected)) = action {
            if expected.major() != Major::ADDRESS {
                self.assign_constant_error(&n, ORIGIN, expected);
                return None;
            }
        }
        Some(n)
    }

    fn check_integer_value(
        &mut self,
        mut n: ExprNode,
        action: Option<TypeAction>,
    ) -> Option<ExprNode> {
        const ORIGIN: &str = "check_integer_value";
        let span = n.span;
        let token = Rc::clone(&n.token);

        {
            let ExprKind::Integer { value, .. } = &mut n.kind else {
                unreachable!("node is not an integer constant")
            };
            value.normalize();
            if !in_safe_range(value) {
                self.constant_too_long_error(span, &token, ORIGIN);
                return None;
            }
        }

        // An inference hint with a major category pins the category's
        // default type and continues as an assignment.
        let action = match action {
            Some(TypeAction::InferWithMajor(major)) => Some(match major {
                Major::ADDRESS => TypeAction::Assign(DataType::ADDRESS),
                Major::INT => TypeAction::Assign(DataType::INT256),
                Major::UINT => TypeAction::Assign(DataType::UINT256),
                m if m.is_fixed() => TypeAction::Assign(DataType::FIXED128X18),
                m if m.is_ufixed() => TypeAction::Assign(DataType::UFIXED128X18),
                _ => TypeAction::InferDefault,
            }),
            other => other,
        };

        let mut dt = DataType::PENDING;
        match action {
            None => {}
            Some(TypeAction::InferDefault) => {
                dt = self.infer_integer(&mut n, span, &token, 32)?;
            }
            Some(TypeAction::InferWithSize(size)) => {
                dt = self.infer_integer(&mut n, span, &token, size)?;
            }
            Some(TypeAction::InferWithMajor(_)) => unreachable!("hint resolved above"),
            Some(TypeAction::Assign(expected)) => {
                dt = expected;
                let major = expected.major();
                if major == Major::ADDRESS {
                    let (value, checksum) = match &n.kind {
                        ExprKind::Integer {
                            value,
                            address_checksum,
                        } => (value.clone(), *address_checksum),
                        _ => unreachable!("node is not an integer constant"),
                    };
                    if !checksum {
                        self.el.append(Diagnostic::error(
                            span,
                            ErrorCode::InvalidAddressChecksum,
                            ORIGIN,
                            format!(
                                "expect {expected} ({:04x}), but {token} is not an address constant",
                                expected.raw()
                            ),
                        ));
                        return None;
                    }
                    // The checksum implies the value fits in 160 bits.
                    let uint160 = DataType::integer(false, 20);
                    let Some(bytes) = uint160.encode(&value) else {
                        unreachable!("uint160 is numeric")
                    };
                    let address =
                        ExprNode::folded_from(&n, ExprKind::Address(bytes), DataType::ADDRESS);
                    return self.check_address_value(address, action);
                } else if major == Major::INT
                    || major == Major::UINT
                    || major.is_fixed()
                    || major.is_ufixed()
                {
                    let ExprKind::Integer { value, .. } = &mut n.kind else {
                        unreachable!("node is not an integer constant")
                    };
                    let (min, max) = must_min_max(expected);
                    if *value < min || *value > max {
                        if self.options.safe_math {
                            let v = value.clone();
                            self.overflow_error(span, &token, ORIGIN, expected, &v, &min, &max);
                            return None;
                        }
                        let cropped = crop_decimal(expected, value).normalized();
                        self.overflow_warning(span, &token, ORIGIN, expected, value, &cropped);
                        *value = cropped;
                    }
                } else {
                    self.assign_constant_error(&n, ORIGIN, expected);
                    return None;
                }
            }
        }

        if !dt.pending() {
            n.set_type(dt);
        }
        Some(n)
    }

    /// Infer an integer constant at the given width: signed if it fits,
    /// unsigned if it is too big for the signed type, cropped or rejected
    /// if it fits neither.
    fn infer_integer(
        &mut self,
        n: &mut ExprNode,
        span: Span,
        token: &str,
        size: u8,
    ) -> Option<DataType> {
        const ORIGIN: &str = "check_integer_value";
        let ExprKind::Integer { value, .. } = &mut n.kind else {
            unreachable!("node is not an integer constant")
        };

        let dt = DataType::integer(true, size);
        let (min, max) = must_min_max(dt);
        // Below the signed minimum the value is negative, so the unsigned
        // type cannot help.
        if *value < min {
            if self.options.safe_math {
                let v = value.clone();
                self.overflow_error(span, token, ORIGIN, dt, &v, &min, &max);
                return None;
            }
            let cropped = crop_decimal(dt, value).normalized();
            self.overflow_warning(span, token, ORIGIN, dt, value, &cropped);
            *value = cropped;
            return Some(dt);
        }
        if *value <= max {
            return Some(dt);
        }

        let dt = DataType::integer(false, size);
        let (min, max) = must_min_max(dt);
        if *value > max {
            if self.options.safe_math {
                let v = value.clone();
                self.overflow_error(span, token, ORIGIN, dt, &v, &min, &max);
                return None;
            }
            let cropped = crop_decimal(dt, value).normalized();
            self.overflow_warning(span, token, ORIGIN, dt, value, &cropped);
            *value = cropped;
        }
        Some(dt)
    }

    fn check_fractional_value(
        &mut self,
        mut n: ExprNode,
        action: Option<TypeAction>,
    ) -> Option<ExprNode> {
        const ORIGIN: &str = "check_fractional_value";
        let span = n.span;
        let token = Rc::clone(&n.token);

        {
            let ExprKind::Fractional(value) = &mut n.kind else {
                unreachable!("node is not a fractional constant")
            };
            value.normalize();
            if !in_safe_range(value) {
                self.constant_too_long_error(span, &token, ORIGIN);
                return None;
            }
        }

        // A number without a fractional part is an integer constant.
        if let ExprKind::Fractional(value) = &n.kind {
            if value.is_integer() {
                let value = value.clone();
                n.kind = ExprKind::Integer {
                    value,
                    address_checksum: false,
                };
                return self.check_integer_value(n, action);
            }
        }

        let action = match action {
            Some(TypeAction::InferWithMajor(major)) => Some(match major {
                Major::INT => TypeAction::Assign(DataType::INT256),
                Major::UINT => TypeAction::Assign(DataType::UINT256),
                m if m.is_fixed() => TypeAction::Assign(DataType::FIXED128X18),
                m if m.is_ufixed() => TypeAction::Assign(DataType::UFIXED128X18),
                _ => TypeAction::InferDefault,
            }),
            other => other,
        };

        let mut dt = DataType::PENDING;
        match action {
            None => {}
            // A size hint has no clear meaning for fixed-point numbers, so
            // both hints fall back to the default width.
            Some(TypeAction::InferDefault) | Some(TypeAction::InferWithSize(_)) => {
                dt = self.infer_fixed(&mut n, span, &token)?;
            }
            Some(TypeAction::InferWithMajor(_)) => unreachable!("hint resolved above"),
            Some(TypeAction::Assign(expected)) => {
                dt = expected;
                let major = expected.major();
                if major.is_fixed() || major.is_ufixed() {
                    let ExprKind::Fractional(value) = &mut n.kind else {
                        unreachable!("node is not a fractional constant")
                    };
                    let (min, max) = must_min_max(expected);
                    if *value < min || *value > max {
                        if self.options.safe_math {
                            let v = value.clone();
                            self.overflow_error(span, &token, ORIGIN, expected, &v, &min, &max);
                            return None;
                        }
                        let cropped = crop_decimal(expected, value).normalized();
                        self.overflow_warning(span, &token, ORIGIN, expected, value, &cropped);
                        *value = cropped;
                    }
                } else if major == Major::INT || major == Major::UINT {
                    let ExprKind::Fractional(value) = &n.kind else {
                        unreachable!("node is not a fractional constant")
                    };
                    self.el.append(Diagnostic::error(
                        span,
                        ErrorCode::TypeError,
                        ORIGIN,
                        format!(
                            "expect {expected} ({:04x}), but the number {value} has fractional part",
                            expected.raw()
                        ),
                    ));
                    return None;
                } else {
                    self.assign_constant_error(&n, ORIGIN, expected);
                    return None;
                }
            }
        }

        if !dt.pending() {
            n.set_type(dt);
            let ExprKind::Fractional(value) = &mut n.kind else {
                unreachable!("node is not a fractional constant")
            };
            *value = value.round(dt.minor() as u32).normalized();
        }
        Some(n)
    }

    fn infer_fixed(&mut self, n: &mut ExprNode, span: Span, token: &str) -> Option<DataType> {
        const ORIGIN: &str = "check_fractional_value";
        let ExprKind::Fractional(value) = &mut n.kind else {
            unreachable!("node is not a fractional constant")
        };

        let dt = DataType::FIXED128X18;
        let (min, max) = must_min_max(dt);
        if *value < min {
            if self.options.safe_math {
                let v = value.clone();
                self.overflow_error(span, token, ORIGIN, dt, &v, &min, &max);
                return None;
            }
            let cropped = crop_decimal(dt, value).normalized();
            self.overflow_warning(span, token, ORIGIN, dt, value, &cropped);
            *value = cropped;
            return Some(dt);
        }
        if *value <= max {
            return Some(dt);
        }

        let dt = DataType::UFIXED128X18;
        let (min, max) = must_min_max(dt);
        if *value > max {
            if self.options.safe_math {
                let v = value.clone();
                self.overflow_error(span, token, ORIGIN, dt, &v, &min, &max);
                return None;
            }
            let cropped = crop_decimal(dt, value).normalized();
            self.overflow_warning(span, token, ORIGIN, dt, value, &cropped);
            *value = cropped;
        }
        Some(dt)
    }

    fn check_bytes_value(
        &mut self,
        mut n: ExprNode,
        action: Option<TypeAction>,
    ) -> Option<ExprNode> {
        const ORIGIN: &str = "check_bytes_value";
        let span = n.span;
        let (len, quoted) = match &n.kind {
            ExprKind::Bytes(bytes) => (bytes.len(), quote_bytes(bytes)),
            _ => unreachable!("node is not a bytes constant"),
        };

        let expected = match action {
            None => None,
            Some(TypeAction::InferDefault) => Some(DataType::BYTES),
            Some(TypeAction::InferWithSize(size)) => Some(DataType::fixed_bytes(size)),
            Some(TypeAction::InferWithMajor(Major::FIXED_BYTES)) => {
                if !(1..=32).contains(&len) {
                    self.el.append(Diagnostic::error(
                        span,
                        ErrorCode::TypeError,
                        ORIGIN,
                        format!("cannot infer {quoted} (length {len}) as fixed-size bytes"),
                    ));
                    return None;
                }
                Some(DataType::fixed_bytes(len as u8))
            }
            Some(TypeAction::InferWithMajor(_)) => Some(DataType::BYTES),
            Some(TypeAction::Assign(dt)) => Some(dt),
        };

        if let Some(dt) = expected {
            match dt.major() {
                Major::DYNAMIC_BYTES => {}
                Major::FIXED_BYTES => {
                    let expected_len = dt.minor() as usize + 1;
                    if len != expected_len {
                        self.el.append(Diagnostic::error(
                            span,
                            ErrorCode::TypeError,
                            ORIGIN,
                            format!(
                                "expect {dt} ({:04x}), but {quoted} has {len} bytes",
                                dt.raw()
                            ),
                        ));
                        return None;
                    }
                }
                _ => {
                    self.assign_constant_error(&n, ORIGIN, dt);
                    return None;
                }
            }
            n.set_type(dt);
        }
        Some(n)
    }

    fn check_null_value(&mut self, mut n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        match action {
            None => {}
            Some(TypeAction::Assign(dt)) => n.set_type(dt),
            Some(_) => n.set_type(DataType::NULL),
        }
        Some(n)
    }

    // Unary operators.

    fn check_pos_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_pos_operator";
        let op = UnaryOp::Pos.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Unary { operand, .. } = n.kind else {
            unreachable!("node is not a unary operator")
        };

        let operand = self.check(*operand, None)?;
        let dt = operand.data_type();
        if !self.validate_number(dt, &operand, ORIGIN, op) {
            return None;
        }

        // Unary plus is a no-op: fold the constant through or drop the
        // operator node entirely.
        let r = if operand.is_constant() {
            let kind = match self.extract_number(&operand, ORIGIN, op)? {
                NumberValue::Integer(value) => ExprKind::Integer {
                    value,
                    address_checksum: false,
                },
                NumberValue::Fractional(value) => ExprKind::Fractional(value),
                NumberValue::NullTyped => ExprKind::Null,
                NumberValue::NullUntyped => {
                    self.operator_constant_error(&operand, ORIGIN, op);
                    return None;
                }
            };
            ExprNode::with_token(kind, span, token, dt)
        } else {
            operand
        };
        self.delegate_type_action(r, ORIGIN, dt, action)
    }

    fn check_neg_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_neg_operator";
        let op = UnaryOp::Neg.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Unary { operand, .. } = n.kind else {
            unreachable!("node is not a unary operator")
        };

        let operand = self.check(*operand, None)?;
        let dt = operand.data_type();
        if !self.validate_number(dt, &operand, ORIGIN, op) {
            return None;
        }

        let r = if operand.is_constant() {
            let kind = match self.extract_number(&operand, ORIGIN, op)? {
                NumberValue::Integer(value) => {
                    let value = self.range_check_fold(value.neg(), dt, span, &token, ORIGIN)?;
                    ExprKind::Integer {
                        value,
                        address_checksum: false,
                    }
                }
                NumberValue::Fractional(value) => {
                    let value = self.range_check_fold(value.neg(), dt, span, &token, ORIGIN)?;
                    ExprKind::Fractional(value)
                }
                NumberValue::NullTyped => ExprKind::Null,
                NumberValue::NullUntyped => {
                    self.operator_constant_error(&operand, ORIGIN, op);
                    return None;
                }
            };
            ExprNode::with_token(kind, span, token, dt)
        } else {
            ExprNode::with_token(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
                token,
                dt,
            )
        };
        self.delegate_type_action(r, ORIGIN, dt, action)
    }

    fn check_not_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_not_operator";
        let op = UnaryOp::Not.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Unary { operand, .. } = n.kind else {
            unreachable!("node is not a unary operator")
        };

        let operand = self.check(*operand, None)?;
        if !self.validate_bool(operand.data_type(), &operand, ORIGIN, op) {
            return None;
        }

        let r = if operand.is_constant() {
            let v = self.extract_bool(&operand, ORIGIN, op)?;
            ExprNode::with_token(ExprKind::Bool(v.not()), span, token, DataType::BOOL)
        } else {
            ExprNode::with_token(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, ORIGIN, DataType::BOOL, action)
    }

    fn check_paren_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Unary { operand, .. } = n.kind else {
            unreachable!("node is not a unary operator")
        };

        // Parentheses disappear: the action passes straight through and the
        // result takes over this node's position.
        let mut r = self.check(*operand, action)?;
        r.span = span;
        r.token = token;
        Some(r)
    }

    // Binary operators.

    fn check_pair(&mut self, object: ExprNode, subject: ExprNode) -> Option<(ExprNode, ExprNode)> {
        let object = self.check(object, None);
        let subject = self.check(subject, None);
        match (object, subject) {
            (Some(object), Some(subject)) => Some((object, subject)),
            _ => None,
        }
    }

    /// Force both operands to one type: equal types pass, a pending side is
    /// re-checked with the concrete side's type assigned, and two pending
    /// sides stay pending.
    fn unify_binary_types(
        &mut self,
        object: ExprNode,
        subject: ExprNode,
        origin: &'static str,
        op: &str,
    ) -> Option<(ExprNode, ExprNode, DataType)> {
        let dt_object = object.data_type();
        let dt_subject = subject.data_type();
        match (dt_object.pending(), dt_subject.pending()) {
            (false, false) => {
                if dt_object != dt_subject {
                    self.operand_type_error(subject.span, origin, op, dt_object, dt_subject);
                    return None;
                }
                Some((object, subject, dt_object))
            }
            (false, true) => {
                let subject = self.check(subject, Some(TypeAction::Assign(dt_object)))?;
                Some((object, subject, dt_object))
            }
            (true, false) => {
                let object = self.check(object, Some(TypeAction::Assign(dt_subject)))?;
                Some((object, subject, dt_subject))
            }
            (true, true) => Some((object, subject, DataType::PENDING)),
        }
    }

    fn check_logical_operator(
        &mut self,
        n: ExprNode,
        action: Option<TypeAction>,
        op: BinaryOp,
    ) -> Option<ExprNode> {
        let origin: &'static str = match op {
            BinaryOp::And => "check_and_operator",
            BinaryOp::Or => "check_or_operator",
            _ => unreachable!("not a logical operator"),
        };
        let opname = op.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Binary {
            object, subject, ..
        } = n.kind
        else {
            unreachable!("node is not a binary operator")
        };

        let (object, subject) = self.check_pair(*object, *subject)?;
        if !self.validate_bool(object.data_type(), &object, origin, opname) {
            return None;
        }
        if !self.validate_bool(subject.data_type(), &subject, origin, opname) {
            return None;
        }

        let mut v1 = BoolValue::Unknown;
        let mut v2 = BoolValue::Unknown;
        if object.is_constant() {
            v1 = self.extract_bool(&object, origin, opname)?;
        }
        if subject.is_constant() {
            v2 = self.extract_bool(&subject, origin, opname)?;
        }

        // A known absorbing operand decides the result even when the other
        // side is not constant.
        let vo = match op {
            BinaryOp::And => {
                if v1.valid() && v2.valid() {
                    v1.and(v2)
                } else if v1 == BoolValue::False || v2 == BoolValue::False {
                    BoolValue::False
                } else {
                    BoolValue::Unknown
                }
            }
            BinaryOp::Or => {
                if v1.valid() && v2.valid() {
                    v1.or(v2)
                } else if v1 == BoolValue::True || v2 == BoolValue::True {
                    BoolValue::True
                } else {
                    BoolValue::Unknown
                }
            }
            _ => unreachable!("not a logical operator"),
        };

        let r = if vo.valid() {
            ExprNode::with_token(ExprKind::Bool(vo), span, token, DataType::BOOL)
        } else {
            ExprNode::with_token(
                ExprKind::Binary {
                    op,
                    object: Box::new(object),
                    subject: Box::new(subject),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, origin, DataType::BOOL, action)
    }

    fn check_relational_operator(
        &mut self,
        n: ExprNode,
        action: Option<TypeAction>,
        op: BinaryOp,
    ) -> Option<ExprNode> {
        let (origin, ordered): (&'static str, bool) = match op {
            BinaryOp::Equal => ("check_equal_operator", false),
            BinaryOp::NotEqual => ("check_not_equal_operator", false),
            BinaryOp::Greater => ("check_greater_operator", true),
            BinaryOp::GreaterOrEqual => ("check_greater_or_equal_operator", true),
            BinaryOp::Less => ("check_less_operator", true),
            BinaryOp::LessOrEqual => ("check_less_or_equal_operator", true),
            _ => unreachable!("not a relational operator"),
        };
        let opname = op.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Binary {
            object, subject, ..
        } = n.kind
        else {
            unreachable!("node is not a binary operator")
        };

        let (object, subject) = self.check_pair(*object, *subject)?;
        if ordered {
            if !self.validate_ordered(object.data_type(), &object, origin, opname) {
                return None;
            }
            if !self.validate_ordered(subject.data_type(), &subject, origin, opname) {
                return None;
            }
        }
        let (object, subject, _) = self.unify_binary_types(object, subject, origin, opname)?;

        let r = if object.is_constant() && subject.is_constant() {
            self.fold_relational(span, Rc::clone(&token), &object, &subject, origin, opname, op)?
        } else {
            ExprNode::with_token(
                ExprKind::Binary {
                    op,
                    object: Box::new(object),
                    subject: Box::new(subject),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, origin, DataType::BOOL, action)
    }

    fn fold_relational(
        &mut self,
        span: Span,
        token: Rc<str>,
        object: &ExprNode,
        subject: &ExprNode,
        origin: &'static str,
        opname: &str,
        op: BinaryOp,
    ) -> Option<ExprNode> {
        if !compatible_constants(object, subject) {
            self.operand_constant_error(subject, origin, opname, object);
            return None;
        }

        let (c1, c2) = match (constant_of(object), constant_of(subject)) {
            (None, None) => (
                Constant::Bool(BoolValue::Unknown),
                Constant::Bool(BoolValue::Unknown),
            ),
            (Some(a), None) => {
                let b = a.null_of_same_kind();
                (a, b)
            }
            (None, Some(b)) => {
                let a = b.null_of_same_kind();
                (a, b)
            }
            (Some(a), Some(b)) => (a, b),
        };

        let pick: fn(Ordering) -> bool = match op {
            BinaryOp::Equal => Ordering::is_eq,
            BinaryOp::NotEqual => Ordering::is_ne,
            BinaryOp::Greater => Ordering::is_gt,
            BinaryOp::GreaterOrEqual => Ordering::is_ge,
            BinaryOp::Less => Ordering::is_lt,
            BinaryOp::LessOrEqual => Ordering::is_le,
            _ => unreachable!("not a relational operator"),
        };
        let vo = match (&c1, &c2) {
            (Constant::Bool(a), Constant::Bool(b)) => a.compare(*b, pick),
            (Constant::Bytes(a), Constant::Bytes(b)) => {
                compare_options(a.as_deref(), b.as_deref(), pick)
            }
            (Constant::Number(a), Constant::Number(b)) => {
                compare_options(a.as_ref(), b.as_ref(), pick)
            }
            _ => unreachable!("operands have incompatible kinds"),
        };
        Some(ExprNode::with_token(
            ExprKind::Bool(vo),
            span,
            token,
            DataType::BOOL,
        ))
    }

    fn check_concat_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_concat_operator";
        let op = BinaryOp::Concat.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Binary {
            object, subject, ..
        } = n.kind
        else {
            unreachable!("node is not a binary operator")
        };

        let (mut object, mut subject) = self.check_pair(*object, *subject)?;
        if !self.validate_bytes(object.data_type(), &object, ORIGIN, op) {
            return None;
        }
        if !self.validate_bytes(subject.data_type(), &subject, ORIGIN, op) {
            return None;
        }

        // The two sides are allowed to have different types, so the usual
        // unification does not apply. A pending side follows the flavor of
        // the concrete side: a fixed-size partner keeps the constant's own
        // length, a dynamically-sized partner forces its exact type.
        let partner_action = |dt: DataType| match dt.major() {
            Major::FIXED_BYTES => TypeAction::InferWithMajor(Major::FIXED_BYTES),
            Major::DYNAMIC_BYTES => TypeAction::Assign(dt),
            _ => unreachable!("operand is not bytes"),
        };
        match (
            object.data_type().pending(),
            subject.data_type().pending(),
        ) {
            (false, true) => {
                subject = self.check(subject, Some(partner_action(object.data_type())))?;
            }
            (true, false) => {
                object = self.check(object, Some(partner_action(subject.data_type())))?;
            }
            _ => {}
        }

        let dt_object = object.data_type();
        let dt_subject = subject.data_type();
        let dt = if !dt_object.pending() && !dt_subject.pending() {
            self.combine_bytes_types(span, ORIGIN, op, dt_object, dt_subject)?
        } else {
            DataType::PENDING
        };

        let r = if object.is_constant() && subject.is_constant() {
            let mut null = false;
            let v1 = match self.extract_bytes(&object, ORIGIN, op)? {
                BytesValue::Bytes(v) => v,
                BytesValue::NullTyped => {
                    null = true;
                    Vec::new()
                }
                BytesValue::NullUntyped => {
                    self.operator_constant_error(&object, ORIGIN, op);
                    return None;
                }
            };
            let v2 = match self.extract_bytes(&subject, ORIGIN, op)? {
                BytesValue::Bytes(v) => v,
                BytesValue::NullTyped => {
                    null = true;
                    Vec::new()
                }
                BytesValue::NullUntyped => {
                    self.operator_constant_error(&subject, ORIGIN, op);
                    return None;
                }
            };
            let kind = if null {
                ExprKind::Null
            } else {
                let mut joined = Vec::with_capacity(v1.len() + v2.len());
                joined.extend_from_slice(&v1);
                joined.extend_from_slice(&v2);
                ExprKind::Bytes(joined)
            };
            ExprNode::with_token(kind, span, token, dt)
        } else {
            ExprNode::with_token(
                ExprKind::Binary {
                    op: BinaryOp::Concat,
                    object: Box::new(object),
                    subject: Box::new(subject),
                },
                span,
                token,
                dt,
            )
        };
        self.delegate_type_action(r, ORIGIN, dt, action)
    }

    fn combine_bytes_types(
        &mut self,
        span: Span,
        origin: &'static str,
        op: &str,
        dt_object: DataType,
        dt_subject: DataType,
    ) -> Option<DataType> {
        let (major_object, minor_object) = dt_object.decompose();
        let (major_subject, minor_subject) = dt_subject.decompose();

        if major_object != major_subject {
            let bytes_flavor = |major: Major| match major {
                Major::FIXED_BYTES => Some("fixed-size"),
                Major::DYNAMIC_BYTES => Some("dynamically-sized"),
                _ => None,
            };
            match (bytes_flavor(major_object), bytes_flavor(major_subject)) {
                (Some(flavor_object), Some(flavor_subject)) => {
                    self.el.append(Diagnostic::error(
                        span,
                        ErrorCode::TypeError,
                        origin,
                        format!(
                            "cannot use {op} between {flavor_object} and {flavor_subject} bytes"
                        ),
                    ));
                }
                // An untyped NULL picks up the null type during the partner
                // re-check and has no bytes flavor at all.
                _ => {
                    let odd = if bytes_flavor(major_object).is_none() {
                        dt_object
                    } else {
                        dt_subject
                    };
                    self.el.append(Diagnostic::error(
                        span,
                        ErrorCode::TypeError,
                        origin,
                        format!("{op} is not defined for {odd} ({:04x})", odd.raw()),
                    ));
                }
            }
            return None;
        }

        match major_object {
            Major::FIXED_BYTES => {
                let size = minor_object as usize + 1 + minor_subject as usize + 1;
                if size > 32 {
                    self.el.append(Diagnostic::error(
                        span,
                        ErrorCode::TypeError,
                        origin,
                        format!(
                            "cannot use {op} between {dt_object} ({:04x}) and {dt_subject} \
                             ({:04x}) because the result will be longer than 32 bytes",
                            dt_object.raw(),
                            dt_subject.raw()
                        ),
                    ));
                    self.el.append(Diagnostic::note(
                        span,
                        origin,
                        "convert both arguments to dynamically-sized bytes in order to \
                         produce a binary string that is bigger than a slot"
                            .to_owned(),
                    ));
                    return None;
                }
                Some(DataType::fixed_bytes(size as u8))
            }
            Major::DYNAMIC_BYTES => Some(dt_object),
            _ => unreachable!("operand is not bytes"),
        }
    }

    fn check_arithmetic_operator(
        &mut self,
        n: ExprNode,
        action: Option<TypeAction>,
        op: BinaryOp,
    ) -> Option<ExprNode> {
        let origin: &'static str = match op {
            BinaryOp::Add => "check_add_operator",
            BinaryOp::Sub => "check_sub_operator",
            BinaryOp::Mul => "check_mul_operator",
            BinaryOp::Div => "check_div_operator",
            BinaryOp::Mod => "check_mod_operator",
            _ => unreachable!("not an arithmetic operator"),
        };
        let division = matches!(op, BinaryOp::Div | BinaryOp::Mod);
        let opname = op.describe();
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Binary {
            object, subject, ..
        } = n.kind
        else {
            unreachable!("node is not a binary operator")
        };

        let (object, subject) = self.check_pair(*object, *subject)?;
        if !self.validate_number(object.data_type(), &object, origin, opname) {
            return None;
        }
        if !self.validate_number(subject.data_type(), &subject, origin, opname) {
            return None;
        }
        let (object, subject, dt) = self.unify_binary_types(object, subject, origin, opname)?;

        let r = if object.is_constant() && subject.is_constant() {
            let mut null = false;
            let mut fractional = division;
            let v1 = match self.extract_number(&object, origin, opname)? {
                NumberValue::Integer(v) => v,
                NumberValue::Fractional(v) => {
                    fractional = true;
                    v
                }
                NumberValue::NullTyped => {
                    null = true;
                    Decimal::zero()
                }
                NumberValue::NullUntyped => {
                    self.operator_constant_error(&object, origin, opname);
                    return None;
                }
            };
            let v2 = match self.extract_number(&subject, origin, opname)? {
                NumberValue::Integer(v) => v,
                NumberValue::Fractional(v) => {
                    fractional = true;
                    v
                }
                NumberValue::NullTyped => {
                    null = true;
                    Decimal::zero()
                }
                NumberValue::NullUntyped => {
                    self.operator_constant_error(&subject, origin, opname);
                    return None;
                }
            };
            let kind = if null {
                ExprKind::Null
            } else {
                if division && v2.is_zero() {
                    self.el.append(Diagnostic::error(
                        subject.span,
                        ErrorCode::DividedByZero,
                        origin,
                        "division by zero".to_owned(),
                    ));
                    return None;
                }
                let vo = eval_arithmetic(op, &v1, &v2);
                let vo = self.range_check_fold(vo, dt, span, &token, origin)?;
                if !in_safe_range(&vo) {
                    self.constant_too_long_error(span, &token, origin);
                    return None;
                }
                if fractional {
                    ExprKind::Fractional(vo)
                } else {
                    ExprKind::Integer {
                        value: vo,
                        address_checksum: false,
                    }
                }
            };
            ExprNode::with_token(kind, span, token, dt)
        } else {
            ExprNode::with_token(
                ExprKind::Binary {
                    op,
                    object: Box::new(object),
                    subject: Box::new(subject),
                },
                span,
                token,
                dt,
            )
        };
        self.delegate_type_action(r, origin, dt, action)
    }

    fn check_is_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_is_operator";
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Binary {
            object, subject, ..
        } = n.kind
        else {
            unreachable!("node is not a binary operator")
        };

        let (object, subject) = self.check_pair(*object, *subject)?;

        // The right-hand side must be one of the literals TRUE, FALSE,
        // UNKNOWN or NULL.
        if !subject.is_constant() {
            self.el.append(Diagnostic::error(
                subject.span,
                ErrorCode::NonConstantExpression,
                ORIGIN,
                "the right-hand side of binary operator IS is not a constant".to_owned(),
            ));
            return None;
        }
        let mut opname = String::from("binary operator IS");
        let mut target: Option<BoolValue> = None;
        match &subject.kind {
            ExprKind::Bool(v) => {
                // IS TRUE / FALSE / UNKNOWN only works for booleans.
                if !self.validate_bool(object.data_type(), &object, ORIGIN, &opname) {
                    return None;
                }
                target = Some(*v);
                opname = format!("unary operator IS {v}");
            }
            ExprKind::Null => {
                // IS NULL works for every type.
                opname = String::from("unary operator IS NULL");
            }
            _ => {
                self.el.append(Diagnostic::error(
                    subject.span,
                    ErrorCode::TypeError,
                    ORIGIN,
                    format!(
                        "the right-hand side of binary operator IS cannot be {}",
                        subject.describe_constant()
                    ),
                ));
                return None;
            }
        }

        let r = if object.is_constant() {
            let mut target = target;
            // For booleans, IS NULL means IS UNKNOWN.
            if matches!(object.kind, ExprKind::Bool(_)) && target.is_none() {
                target = Some(BoolValue::Unknown);
            }
            let vo = match target {
                Some(expected) => {
                    let v = self.extract_bool(&object, ORIGIN, &opname)?;
                    BoolValue::from(v == expected)
                }
                None => BoolValue::from(matches!(object.kind, ExprKind::Null)),
            };
            ExprNode::with_token(ExprKind::Bool(vo), span, token, DataType::BOOL)
        } else {
            ExprNode::with_token(
                ExprKind::Binary {
                    op: BinaryOp::Is,
                    object: Box::new(object),
                    subject: Box::new(subject),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, ORIGIN, DataType::BOOL, action)
    }

    fn check_like_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_like_operator";
        let op = "operator LIKE";
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::Like {
            object,
            pattern,
            escape,
        } = n.kind
        else {
            unreachable!("node is not a LIKE operator")
        };

        // The matched value and the pattern are dynamically-sized bytes;
        // the escape is exactly one byte. All three are checked even when
        // one of them fails.
        let object = self.check(*object, Some(TypeAction::Assign(DataType::BYTES)));
        let pattern = self.check(*pattern, Some(TypeAction::Assign(DataType::BYTES)));
        let escape = match escape {
            Some(escape) => self
                .check(*escape, Some(TypeAction::Assign(DataType::BYTES1)))
                .map(Some),
            None => Some(None),
        };
        let (Some(object), Some(pattern), Some(escape)) = (object, pattern, escape) else {
            return None;
        };

        let escape_constant = escape.as_ref().map_or(true, |e| e.is_constant());
        let r = if object.is_constant() && pattern.is_constant() && escape_constant {
            let mut null = false;
            let vobj = match self.extract_bytes(&object, ORIGIN, op)? {
                BytesValue::Bytes(v) => v,
                BytesValue::NullTyped => {
                    null = true;
                    Vec::new()
                }
                BytesValue::NullUntyped => unreachable!("children are typed"),
            };
            let vpat = match self.extract_bytes(&pattern, ORIGIN, op)? {
                BytesValue::Bytes(v) => v,
                BytesValue::NullTyped => {
                    null = true;
                    Vec::new()
                }
                BytesValue::NullUntyped => unreachable!("children are typed"),
            };
            let vesc = match &escape {
                Some(escape) => match self.extract_bytes(escape, ORIGIN, op)? {
                    BytesValue::Bytes(v) => {
                        debug_assert_eq!(v.len(), 1);
                        Some(v[0])
                    }
                    BytesValue::NullTyped => {
                        null = true;
                        None
                    }
                    BytesValue::NullUntyped => unreachable!("children are typed"),
                },
                None => None,
            };
            let vo = if null {
                BoolValue::Unknown
            } else {
                self.match_like(&vobj, &vpat, vesc, pattern.span, ORIGIN)?
            };
            ExprNode::with_token(ExprKind::Bool(vo), span, token, DataType::BOOL)
        } else {
            ExprNode::with_token(
                ExprKind::Like {
                    object: Box::new(object),
                    pattern: Box::new(pattern),
                    escape: escape.map(Box::new),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, ORIGIN, DataType::BOOL, action)
    }

    /// Translate a LIKE pattern into an anchored byte regex and run it.
    /// `%` matches any run of bytes, `_` matches one byte, and a byte
    /// following the escape byte is literal.
    fn match_like(
        &mut self,
        object: &[u8],
        pattern: &[u8],
        escape: Option<u8>,
        pattern_span: Span,
        origin: &'static str,
    ) -> Option<BoolValue> {
        let mut translated = String::with_capacity(pattern.len() * 4 + 8);
        translated.push_str("(?s-u)^");
        let mut in_escape = false;
        for &b in pattern {
            if in_escape {
                push_literal_byte(&mut translated, b);
                in_escape = false;
            } else if escape == Some(b) {
                in_escape = true;
            } else if b == b'%' {
                translated.push_str(".*?");
            } else if b == b'_' {
                translated.push('.');
            } else {
                push_literal_byte(&mut translated, b);
            }
        }
        if in_escape {
            if let Some(escape) = escape {
                self.el.append(Diagnostic::error(
                    pattern_span,
                    ErrorCode::PendingEscapeByte,
                    origin,
                    format!(
                        "pattern {} ends with the escape byte {}",
                        quote_bytes(pattern),
                        quote_bytes(&[escape])
                    ),
                ));
            }
            return None;
        }
        translated.push('$');
        // Every byte is written as a literal or a fixed wildcard, so the
        // translation always compiles.
        let re = Regex::new(&translated).expect("translated pattern is valid");
        Some(BoolValue::from(re.is_match(object)))
    }

    fn check_in_operator(&mut self, n: ExprNode, action: Option<TypeAction>) -> Option<ExprNode> {
        const ORIGIN: &str = "check_in_operator";
        let op = "operator IN";
        let span = n.span;
        let token = Rc::clone(&n.token);
        let ExprKind::In { object, subjects } = n.kind else {
            unreachable!("node is not an IN operator")
        };

        // Check every child first, collecting all independent errors.
        let mut has_error = false;
        let mut children = Vec::with_capacity(1 + subjects.len());
        for child in std::iter::once(*object).chain(subjects) {
            match self.check(child, None) {
                Some(child) => children.push(child),
                None => has_error = true,
            }
        }
        if has_error {
            return None;
        }

        // The first child with a concrete type decides for everyone.
        let concrete = children
            .iter()
            .map(|c| c.data_type())
            .find(|dt| !dt.pending());
        if let Some(dt) = concrete {
            let mut rechecked = Vec::with_capacity(children.len());
            for child in children {
                rechecked.push(self.check(child, Some(TypeAction::Assign(dt)))?);
            }
            children = rechecked;
        }

        let r = if children.iter().all(|c| c.is_constant()) {
            let reference = children
                .iter()
                .find(|c| !matches!(c.kind, ExprKind::Null));
            if let Some(reference) = reference {
                for child in &children {
                    if !compatible_constants(reference, child) {
                        self.operand_constant_error(child, ORIGIN, op, reference);
                        return None;
                    }
                }
            }
            let reference_constant = reference.and_then(constant_of);
            let values: Vec<Constant> = children
                .iter()
                .map(|child| match constant_of(child) {
                    Some(v) => v,
                    None => match &reference_constant {
                        Some(reference) => reference.null_of_same_kind(),
                        None => Constant::Bool(BoolValue::Unknown),
                    },
                })
                .collect();
            let mut vo = BoolValue::False;
            for v in &values[1..] {
                vo = vo.or(values[0].equal(v));
            }
            ExprNode::with_token(ExprKind::Bool(vo), span, token, DataType::BOOL)
        } else {
            let mut iter = children.into_iter();
            let Some(first) = iter.next() else {
                unreachable!("IN has at least the left-hand side")
            };
            ExprNode::with_token(
                ExprKind::In {
                    object: Box::new(first),
                    subjects: iter.collect(),
                },
                span,
                token,
                DataType::BOOL,
            )
        };
        self.verify_type_action(r, ORIGIN, DataType::BOOL, action)
    }

    // Operand validation.

    fn validate_number(
        &mut self,
        dt: DataType,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> bool {
        if dt.pending() {
            return true;
        }
        let major = dt.major();
        if major == Major::INT || major == Major::UINT || major.is_fixed() || major.is_ufixed() {
            return true;
        }
        self.operator_type_error(n.span, origin, op, dt);
        false
    }

    fn validate_bool(
        &mut self,
        dt: DataType,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> bool {
        if dt.pending() || dt.major() == Major::BOOL {
            return true;
        }
        self.operator_type_error(n.span, origin, op, dt);
        false
    }

    fn validate_bytes(
        &mut self,
        dt: DataType,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> bool {
        if dt.pending() {
            return true;
        }
        let major = dt.major();
        if major == Major::FIXED_BYTES || major == Major::DYNAMIC_BYTES {
            return true;
        }
        self.operator_type_error(n.span, origin, op, dt);
        false
    }

    fn validate_ordered(
        &mut self,
        dt: DataType,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> bool {
        if dt.pending() {
            return true;
        }
        let major = dt.major();
        let ordered = major == Major::BOOL
            || major == Major::ADDRESS
            || major == Major::INT
            || major == Major::UINT
            || major == Major::FIXED_BYTES
            || major == Major::DYNAMIC_BYTES
            || major.is_fixed()
            || major.is_ufixed();
        if ordered {
            return true;
        }
        self.operator_type_error(n.span, origin, op, dt);
        false
    }

    // Constant extraction.

    fn extract_bool(&mut self, n: &ExprNode, origin: &'static str, op: &str) -> Option<BoolValue> {
        match &n.kind {
            ExprKind::Bool(v) => Some(*v),
            ExprKind::Null => Some(BoolValue::Unknown),
            _ => {
                self.operator_constant_error(n, origin, op);
                None
            }
        }
    }

    fn extract_number(
        &mut self,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> Option<NumberValue> {
        match &n.kind {
            ExprKind::Integer { value, .. } => Some(NumberValue::Integer(value.clone())),
            ExprKind::Fractional(value) => Some(NumberValue::Fractional(value.clone())),
            ExprKind::Null => Some(if n.data_type().pending() {
                NumberValue::NullUntyped
            } else {
                NumberValue::NullTyped
            }),
            _ => {
                self.operator_constant_error(n, origin, op);
                None
            }
        }
    }

    fn extract_bytes(
        &mut self,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
    ) -> Option<BytesValue> {
        match &n.kind {
            ExprKind::Bytes(bytes) => Some(BytesValue::Bytes(bytes.clone())),
            ExprKind::Null => Some(if n.data_type().pending() {
                BytesValue::NullUntyped
            } else {
                BytesValue::NullTyped
            }),
            _ => {
                self.operator_constant_error(n, origin, op);
                None
            }
        }
    }

    /// Range-check a folded numeric result against a decided type: an
    /// overflow is an error under safe math, otherwise the value is cropped
    /// with a warning and folding continues.
    fn range_check_fold(
        &mut self,
        mut v: Decimal,
        dt: DataType,
        span: Span,
        token: &str,
        origin: &'static str,
    ) -> Option<Decimal> {
        if !dt.pending() {
            let (min, max) = must_min_max(dt);
            if v < min || v > max {
                if self.options.safe_math {
                    self.overflow_error(span, token, origin, dt, &v, &min, &max);
                    return None;
                }
                let cropped = crop_decimal(dt, &v);
                self.overflow_warning(span, token, origin, dt, &v, &cropped);
                v = cropped;
            }
        }
        v.normalize();
        Some(v)
    }

    // Diagnostics.

    fn assign_type_error(
        &mut self,
        span: Span,
        origin: &'static str,
        expected: DataType,
        given: DataType,
    ) {
        self.el.append(Diagnostic::error(
            span,
            ErrorCode::TypeError,
            origin,
            format!(
                "expect {expected} ({:04x}), but {given} ({:04x}) is given",
                expected.raw(),
                given.raw()
            ),
        ));
    }

    fn assign_constant_error(&mut self, n: &ExprNode, origin: &'static str, expected: DataType) {
        self.el.append(Diagnostic::error(
            n.span,
            ErrorCode::TypeError,
            origin,
            format!(
                "expect {expected} ({:04x}), but {} is given",
                expected.raw(),
                n.describe_constant()
            ),
        ));
    }

    fn operator_constant_error(&mut self, n: &ExprNode, origin: &'static str, op: &str) {
        self.el.append(Diagnostic::error(
            n.span,
            ErrorCode::TypeError,
            origin,
            format!("{op} is not defined for {}", n.describe_constant()),
        ));
    }

    fn operator_type_error(&mut self, span: Span, origin: &'static str, op: &str, dt: DataType) {
        self.el.append(Diagnostic::error(
            span,
            ErrorCode::TypeError,
            origin,
            format!("{op} is not defined for {dt} ({:04x})", dt.raw()),
        ));
    }

    fn operand_type_error(
        &mut self,
        span: Span,
        origin: &'static str,
        op: &str,
        expected: DataType,
        given: DataType,
    ) {
        self.el.append(Diagnostic::error(
            span,
            ErrorCode::TypeError,
            origin,
            format!(
                "cannot use {given} ({:04x}) with {op} because the operand is expected \
                 to be {expected} ({:04x})",
                given.raw(),
                expected.raw()
            ),
        ));
    }

    fn operand_constant_error(
        &mut self,
        n: &ExprNode,
        origin: &'static str,
        op: &str,
        expected: &ExprNode,
    ) {
        self.el.append(Diagnostic::error(
            n.span,
            ErrorCode::TypeError,
            origin,
            format!(
                "cannot use {} with {op} because it is already used with {}",
                n.describe_constant(),
                expected.describe_constant()
            ),
        ));
    }

    fn constant_too_long_error(&mut self, span: Span, token: &str, origin: &'static str) {
        self.el.append(Diagnostic::error(
            span,
            ErrorCode::ConstantTooLong,
            origin,
            format!(
                "constant expression {} has more than {MAX_INTEGER_PART_DIGITS} digits",
                quote_bytes(token.as_bytes())
            ),
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn overflow_error(
        &mut self,
        span: Span,
        token: &str,
        origin: &'static str,
        dt: DataType,
        v: &Decimal,
        min: &Decimal,
        max: &Decimal,
    ) {
        self.el.append(Diagnostic::error(
            span,
            ErrorCode::Overflow,
            origin,
            format!(
                "number {} ({v}) overflows {dt} ({:04x})",
                quote_bytes(token.as_bytes()),
                dt.raw()
            ),
        ));
        self.el.append(Diagnostic::note(
            span,
            origin,
            format!("the range of {dt} is [{min}, {max}]"),
        ));
    }

    fn overflow_warning(
        &mut self,
        span: Span,
        token: &str,
        origin: &'static str,
        dt: DataType,
        from: &Decimal,
        to: &Decimal,
    ) {
        self.el.append(Diagnostic::warning(
            span,
            origin,
            format!(
                "number {} ({from}) overflows {dt} ({:04x}), converted to {to}",
                quote_bytes(token.as_bytes()),
                dt.raw()
            ),
        ));
    }
}

fn in_safe_range(v: &Decimal) -> bool {
    v.integer_digits() <= MAX_INTEGER_PART_DIGITS
        && v.fractional_digits() <= MAX_FRACTIONAL_PART_DIGITS
}

fn must_min_max(dt: DataType) -> (Decimal, Decimal) {
    match dt.min_max() {
        Some(bounds) => bounds,
        None => unreachable!("{dt} has no value bounds"),
    }
}

/// Wrap a value into the representable range of `dt` by encoding and
/// decoding it at the type's width.
fn crop_decimal(dt: DataType, v: &Decimal) -> Decimal {
    let Some(bytes) = dt.encode(v) else {
        unreachable!("{dt} is not numeric")
    };
    let Some(cropped) = dt.decode(&bytes) else {
        unreachable!("{dt} is not numeric")
    };
    cropped
}

fn eval_arithmetic(op: BinaryOp, v1: &Decimal, v2: &Decimal) -> Decimal {
    match op {
        BinaryOp::Add => v1.add(v2),
        BinaryOp::Sub => v1.sub(v2),
        BinaryOp::Mul => v1.mul(v2),
        BinaryOp::Div => v1.div_trunc(v2, MAX_FRACTIONAL_PART_DIGITS),
        BinaryOp::Mod => v1.rem_trunc(v2),
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn compare_options<T: Ord + ?Sized>(
    a: Option<&T>,
    b: Option<&T>,
    pick: fn(Ordering) -> bool,
) -> BoolValue {
    match (a, b) {
        (Some(a), Some(b)) => BoolValue::from(pick(a.cmp(b))),
        _ => BoolValue::Unknown,
    }
}

/// Two constants can be compared when they are of the same kind; NULL is
/// compatible with everything.
fn compatible_constants(expected: &ExprNode, given: &ExprNode) -> bool {
    match &expected.kind {
        ExprKind::Bool(_) => matches!(given.kind, ExprKind::Bool(_) | ExprKind::Null),
        ExprKind::Address(_) => matches!(given.kind, ExprKind::Address(_) | ExprKind::Null),
        ExprKind::Integer { .. } | ExprKind::Fractional(_) => matches!(
            given.kind,
            ExprKind::Integer { .. } | ExprKind::Fractional(_) | ExprKind::Null
        ),
        ExprKind::Bytes(_) => matches!(given.kind, ExprKind::Bytes(_) | ExprKind::Null),
        ExprKind::Null => true,
        _ => unreachable!("node is not a constant"),
    }
}

fn constant_of(n: &ExprNode) -> Option<Constant> {
    match &n.kind {
        ExprKind::Bool(v) => Some(Constant::Bool(*v)),
        ExprKind::Address(bytes) => Some(Constant::Bytes(Some(bytes.clone()))),
        ExprKind::Integer { value, .. } => Some(Constant::Number(Some(value.clone()))),
        ExprKind::Fractional(value) => Some(Constant::Number(Some(value.clone()))),
        ExprKind::Bytes(bytes) => Some(Constant::Bytes(Some(bytes.clone()))),
        ExprKind::Null => None,
        _ => unreachable!("node is not a constant"),
    }
}

fn push_literal_byte(translated: &mut String, b: u8) {
    match b {
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => translated.push(b as char),
        _ => {
            let _ = write!(translated, "\\x{b:02x}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;
    use crate::schema::Table;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn empty_schema() -> Schema {
        Schema(vec![Table {
            name: "t".into(),
            columns: Vec::new(),
        }])
    }

    fn integer(token: &str) -> ExprNode {
        ExprNode::new(
            ExprKind::Integer {
                value: dec(token),
                address_checksum: false,
            },
            Span::new(0, token.len() as u32),
            token,
        )
    }

    fn check_constant(n: ExprNode, action: Option<TypeAction>) -> (Option<ExprNode>, ErrorList) {
        let schema = empty_schema();
        let mut el = ErrorList::new();
        let r = check_expr(
            n,
            &schema,
            CheckOptions::default(),
            &mut el,
            TableRef(0),
            action,
        );
        (r, el)
    }

    #[test]
    fn integer_literal_defaults_to_int256() {
        let (r, el) = check_constant(integer("5"), Some(TypeAction::InferDefault));
        assert!(el.is_empty());
        assert_eq!(r.unwrap().data_type(), DataType::INT256);
    }

    #[test]
    fn big_integer_literal_defaults_to_uint256() {
        let huge = {
            let two = dec("2");
            let mut v = dec("1");
            for _ in 0..255 {
                v = v.mul(&two);
            }
            v
        };
        let n = ExprNode::new(
            ExprKind::Integer {
                value: huge,
                address_checksum: false,
            },
            Span::new(0, 1),
            "h",
        );
        let (r, el) = check_constant(n, Some(TypeAction::InferDefault));
        assert!(el.is_empty());
        assert_eq!(r.unwrap().data_type(), DataType::UINT256);
    }

    #[test]
    fn fractional_literal_defaults_to_fixed128x18() {
        let n = ExprNode::new(ExprKind::Fractional(dec("1.5")), Span::new(0, 3), "1.5");
        let (r, el) = check_constant(n, Some(TypeAction::InferDefault));
        assert!(el.is_empty());
        assert_eq!(r.unwrap().data_type(), DataType::FIXED128X18);
    }

    #[test]
    fn fractional_literal_without_fraction_is_an_integer() {
        let n = ExprNode::new(ExprKind::Fractional(dec("4.0")), Span::new(0, 3), "4.0");
        let (r, el) = check_constant(n, Some(TypeAction::InferDefault));
        assert!(el.is_empty());
        let r = r.unwrap();
        assert_eq!(r.data_type(), DataType::INT256);
        assert!(matches!(r.kind, ExprKind::Integer { .. }));
    }

    #[test]
    fn assigning_a_fractional_constant_to_an_integer_type_fails() {
        let n = ExprNode::new(ExprKind::Fractional(dec("1.5")), Span::new(0, 3), "1.5");
        let (r, el) = check_constant(n, Some(TypeAction::Assign(DataType::INT256)));
        assert!(r.is_none());
        assert_eq!(el.len(), 1);
        assert!(el.as_slice()[0].message.contains("has fractional part"));
    }

    #[test]
    fn out_of_range_constant_is_cropped_with_a_warning() {
        let n = integer("256");
        let dt = DataType::integer(false, 1);
        let (r, el) = check_constant(n, Some(TypeAction::Assign(dt)));
        let r = r.unwrap();
        assert_eq!(r.data_type(), dt);
        match &r.kind {
            ExprKind::Integer { value, .. } => assert_eq!(*value, dec("0")),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(el.len(), 1);
        assert_eq!(el.as_slice()[0].severity, Severity::Warning);
        assert!(el.as_slice()[0].message.contains("converted to 0"));
    }

    #[test]
    fn out_of_range_constant_is_an_error_under_safe_math() {
        let schema = empty_schema();
        let mut el = ErrorList::new();
        let r = check_expr(
            integer("256"),
            &schema,
            CheckOptions {
                safe_math: true,
                ..CheckOptions::default()
            },
            &mut el,
            TableRef(0),
            Some(TypeAction::Assign(DataType::integer(false, 1))),
        );
        assert!(r.is_none());
        assert_eq!(el.as_slice()[0].code, Some(ErrorCode::Overflow));
        assert_eq!(el.as_slice()[1].severity, Severity::Note);
        assert!(el.as_slice()[1].message.contains("[0, 255]"));
    }

    #[test]
    fn like_translation_rejects_dangling_escape() {
        let schema = empty_schema();
        let mut el = ErrorList::new();
        let mut checker = Checker {
            schema: &schema,
            options: CheckOptions::default(),
            cache: ColumnCache::new(),
            el: &mut el,
            table: TableRef(0),
        };
        let r = checker.match_like(b"abc", b"abc\\", Some(b'\\'), Span::new(0, 4), "test");
        assert!(r.is_none());
        assert_eq!(el.as_slice()[0].code, Some(ErrorCode::PendingEscapeByte));
    }

    #[test]
    fn like_translation_matches_bytes() {
        let schema = empty_schema();
        let mut el = ErrorList::new();
        let mut checker = Checker {
            schema: &schema,
            options: CheckOptions::default(),
            cache: ColumnCache::new(),
            el: &mut el,
            table: TableRef(0),
        };
        let span = Span::new(0, 0);
        assert_eq!(
            checker.match_like(b"hello", b"h%o", None, span, "test"),
            Some(BoolValue::True)
        );
        assert_eq!(
            checker.match_like(b"hello", b"h_llo", None, span, "test"),
            Some(BoolValue::True)
        );
        assert_eq!(
            checker.match_like(b"100%", b"100\\%", Some(b'\\'), span, "test"),
            Some(BoolValue::True)
        );
        assert_eq!(
            checker.match_like(b"1000", b"100\\%", Some(b'\\'), span, "test"),
            Some(BoolValue::False)
        );
        assert_eq!(
            checker.match_like(&[0x00, 0xff, 0x10], &[0x00, b'%'], None, span, "test"),
            Some(BoolValue::True)
        );
        assert!(el.is_empty());
    }
}
