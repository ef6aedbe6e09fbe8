//! The operators in expressions.
//!
//! Operator tokens are converted into the enums here during parsing,
//! via their `TryFrom<Token>` implementations.

use std::fmt::Display;

use crate::lexer::token::{token, Token};

/// An operator that takes in one value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Unary {
    /// Numeric negation (`-x`)
    Neg,

    /// Logical negation (`non x`)
    Not
}

/// An operator that takes in two values.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Binary {
    /// Addition, or concatenation when a string is involved (`a + b`)
    Add,

    /// Subtraction (`a - b`)
    Sub,

    /// Multiplication (`a * b`)
    Mul,

    /// Division, always producing a float (`a / b`)
    Div,

    /// Modulo (`a % b`)
    Mod,

    /// Less than (`a < b`)
    Lt,

    /// Less than or equal (`a <= b`)
    Le,

    /// Greater than (`a > b`)
    Gt,

    /// Greater than or equal (`a >= b`)
    Ge,

    /// Equality (`a == b`)
    Eq,

    /// Inequality (`a != b`)
    Ne,

    /// Logical and (`a et b`). Both operands are always evaluated.
    LogAnd,

    /// Logical or (`a ou b`). Both operands are always evaluated.
    LogOr
}

/// An error during token-to-operator conversion.
///
/// The contained `&'static str` names the operator category expected.
#[derive(Debug, PartialEq, Eq)]
pub struct TokenOpCastErr(pub &'static str);

impl TryFrom<Token> for Unary {
    type Error = TokenOpCastErr;

    fn try_from(value: Token) -> Result<Self, Self::Error> {
        match value {
            token![-]   => Ok(Unary::Neg),
            token![non] => Ok(Unary::Not),
            _ => Err(TokenOpCastErr("opérateur unaire"))
        }
    }
}

impl TryFrom<Token> for Binary {
    type Error = TokenOpCastErr;

    fn try_from(value: Token) -> Result<Self, Self::Error> {
        match value {
            token![+]  => Ok(Binary::Add),
            token![-]  => Ok(Binary::Sub),
            token![*]  => Ok(Binary::Mul),
            token![/]  => Ok(Binary::Div),
            token![%]  => Ok(Binary::Mod),
            token![<]  => Ok(Binary::Lt),
            token![<=] => Ok(Binary::Le),
            token![>]  => Ok(Binary::Gt),
            token![>=] => Ok(Binary::Ge),
            token![==] => Ok(Binary::Eq),
            token![!=] => Ok(Binary::Ne),
            token![et] => Ok(Binary::LogAnd),
            token![ou] => Ok(Binary::LogOr),
            _ => Err(TokenOpCastErr("opérateur binaire"))
        }
    }
}

impl Display for Unary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Unary::Neg => "-",
            Unary::Not => "non",
        })
    }
}

impl Display for Binary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Binary::Add    => "+",
            Binary::Sub    => "-",
            Binary::Mul    => "*",
            Binary::Div    => "/",
            Binary::Mod    => "%",
            Binary::Lt     => "<",
            Binary::Le     => "<=",
            Binary::Gt     => ">",
            Binary::Ge     => ">=",
            Binary::Eq     => "==",
            Binary::Ne     => "!=",
            Binary::LogAnd => "et",
            Binary::LogOr  => "ou",
        })
    }
}
