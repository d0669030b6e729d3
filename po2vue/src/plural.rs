//! Plural-form rules: header extraction, evaluation, and JS rendering.
//!
//! A gettext catalog declares its plural selection as a C expression in
//! the `Plural-Forms` header (`nplurals=N; plural=EXPR;`). Instead of
//! carrying that text around and evaluating it as code, the expression
//! is parsed into a small AST restricted to the plural-form grammar
//! (integers, `n`, comparisons, boolean operators, arithmetic, modulo
//! and the ternary operator). The AST both answers "which form does
//! count X select?" and renders the JavaScript function emitted into
//! the generated plural-rules module, so no catalog-supplied source
//! text ever reaches the output verbatim.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use indoc::indoc;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

lazy_static! {
    static ref PLURAL_FORMS_RE: Regex =
        Regex::new(r"nplurals\s*=\s*([0-9]+)\s*;.*plural\s*=\s*([^;]+)").unwrap();
}

/// A parsed plural rule for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralRule {
    /// Declared number of plural forms.
    pub nplurals: usize,
    expr: Expr,
}

impl PluralRule {
    /// Parses a `Plural-Forms` header of the shape `nplurals=N; plural=EXPR`.
    pub fn parse(header: &str) -> Result<Self, Error> {
        let captures = PLURAL_FORMS_RE
            .captures(header)
            .ok_or_else(|| Error::PluralHeader(header.to_string()))?;

        let nplurals = captures[1]
            .parse::<usize>()
            .map_err(|_| Error::PluralHeader(header.to_string()))?;
        let expr = Expr::parse(captures[2].trim())?;

        Ok(PluralRule { nplurals, expr })
    }

    /// Returns the zero-based plural form index for a count.
    ///
    /// Booleans coerce to 0/1, matching `Number(rv)` in the generated JS.
    pub fn select(&self, n: u64) -> usize {
        self.expr.eval(n as i64).max(0) as usize
    }

    /// Renders the rule as a JavaScript pluralization callback.
    pub fn to_js(&self) -> String {
        format!(
            "function (n) {{ const rv = {}; return Number(rv); }}",
            self.expr.render()
        )
    }

    /// The expression in C/JS source form, regenerated from the AST.
    pub fn expression(&self) -> String {
        self.expr.render()
    }
}

/// Output flavor of the generated plural-rules module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleSyntax {
    /// `module.exports = {...}`
    #[default]
    CommonJs,
    /// `export default {...}`
    Esm,
}

impl FromStr for ModuleSyntax {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cjs" | "commonjs" => Ok(ModuleSyntax::CommonJs),
            "esm" | "module" => Ok(ModuleSyntax::Esm),
            other => Err(Error::plural_expr_error(format!(
                "unknown module syntax `{}` (expected `cjs` or `esm`)",
                other
            ))),
        }
    }
}

impl Display for ModuleSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleSyntax::CommonJs => write!(f, "cjs"),
            ModuleSyntax::Esm => write!(f, "esm"),
        }
    }
}

/// Renders the locale → pluralization-function table as a JS module.
pub fn render_module(rules: &BTreeMap<String, PluralRule>, syntax: ModuleSyntax) -> String {
    let header = indoc! {"
        /* eslint-disable no-extra-semi */
        // Generated by po2vue. Do not edit manually.
    "};
    let opener = match syntax {
        ModuleSyntax::CommonJs => "module.exports = {",
        ModuleSyntax::Esm => "export default {",
    };
    let body = rules
        .iter()
        .map(|(locale, rule)| format!("  \"{}\": {}", locale, rule.to_js()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!("{}{}\n{}\n}};\n", header, opener, body)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Num(i64),
    Count,
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    fn token(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    /// Binding strength, higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 2,
            BinOp::And => 3,
            BinOp::Eq | BinOp::Ne => 4,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 5,
            BinOp::Add | BinOp::Sub => 6,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 7,
        }
    }
}

impl Expr {
    fn parse(input: &str) -> Result<Expr, Error> {
        let tokens = tokenize(input)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.ternary()?;
        if parser.pos != parser.tokens.len() {
            return Err(Error::plural_expr_error(format!(
                "unexpected trailing tokens in `{}`",
                input
            )));
        }
        Ok(expr)
    }

    /// C semantics: comparisons and logical operators yield 0/1, the
    /// ternary condition tests non-zero. Division or modulo by zero
    /// resolves to 0 rather than trapping.
    fn eval(&self, n: i64) -> i64 {
        match self {
            Expr::Num(value) => *value,
            Expr::Count => n,
            Expr::Not(inner) => (inner.eval(n) == 0) as i64,
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(n);
                match op {
                    BinOp::Or => (l != 0 || rhs.eval(n) != 0) as i64,
                    BinOp::And => (l != 0 && rhs.eval(n) != 0) as i64,
                    op => {
                        let r = rhs.eval(n);
                        match op {
                            BinOp::Eq => (l == r) as i64,
                            BinOp::Ne => (l != r) as i64,
                            BinOp::Lt => (l < r) as i64,
                            BinOp::Le => (l <= r) as i64,
                            BinOp::Gt => (l > r) as i64,
                            BinOp::Ge => (l >= r) as i64,
                            BinOp::Add => l.wrapping_add(r),
                            BinOp::Sub => l.wrapping_sub(r),
                            BinOp::Mul => l.wrapping_mul(r),
                            BinOp::Div => {
                                if r == 0 {
                                    0
                                } else {
                                    l / r
                                }
                            }
                            BinOp::Mod => {
                                if r == 0 {
                                    0
                                } else {
                                    l % r
                                }
                            }
                            BinOp::Or | BinOp::And => unreachable!(),
                        }
                    }
                }
            }
            Expr::Cond(cond, then, other) => {
                if cond.eval(n) != 0 {
                    then.eval(n)
                } else {
                    other.eval(n)
                }
            }
        }
    }

    fn render(&self) -> String {
        self.render_prec(0)
    }

    /// Parenthesizes children that bind looser than their context.
    fn render_prec(&self, min_prec: u8) -> String {
        let (text, prec) = match self {
            Expr::Num(value) => (value.to_string(), 9),
            Expr::Count => ("n".to_string(), 9),
            Expr::Not(inner) => (format!("!{}", inner.render_prec(8)), 8),
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                (
                    format!(
                        "{} {} {}",
                        lhs.render_prec(prec),
                        op.token(),
                        rhs.render_prec(prec + 1)
                    ),
                    prec,
                )
            }
            Expr::Cond(cond, then, other) => (
                format!(
                    "{} ? {} : {}",
                    cond.render_prec(2),
                    then.render_prec(1),
                    other.render_prec(1)
                ),
                1,
            ),
        };

        if prec < min_prec {
            format!("({})", text)
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Num(i64),
    Count,
    LParen,
    RParen,
    Question,
    Colon,
    Not,
    Op(BinOp),
}

fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &input[i..];
        let (token, len) = match bytes[i] {
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' => {
                let end = rest
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(rest.len());
                let value = rest[..end]
                    .parse::<i64>()
                    .map_err(|_| Error::plural_expr_error(format!("bad number in `{}`", input)))?;
                (Token::Num(value), end)
            }
            b'n' => (Token::Count, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'?' => (Token::Question, 1),
            b':' => (Token::Colon, 1),
            b'|' if rest.starts_with("||") => (Token::Op(BinOp::Or), 2),
            b'&' if rest.starts_with("&&") => (Token::Op(BinOp::And), 2),
            b'=' if rest.starts_with("==") => (Token::Op(BinOp::Eq), 2),
            b'!' if rest.starts_with("!=") => (Token::Op(BinOp::Ne), 2),
            b'!' => (Token::Not, 1),
            b'<' if rest.starts_with("<=") => (Token::Op(BinOp::Le), 2),
            b'<' => (Token::Op(BinOp::Lt), 1),
            b'>' if rest.starts_with(">=") => (Token::Op(BinOp::Ge), 2),
            b'>' => (Token::Op(BinOp::Gt), 1),
            b'+' => (Token::Op(BinOp::Add), 1),
            b'-' => (Token::Op(BinOp::Sub), 1),
            b'*' => (Token::Op(BinOp::Mul), 1),
            b'/' => (Token::Op(BinOp::Div), 1),
            b'%' => (Token::Op(BinOp::Mod), 1),
            other => {
                return Err(Error::plural_expr_error(format!(
                    "unexpected character `{}` in `{}`",
                    other as char, input
                )));
            }
        };
        tokens.push(token);
        i += len;
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), Error> {
        match self.bump() {
            Some(token) if token == expected => Ok(()),
            other => Err(Error::plural_expr_error(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    fn ternary(&mut self) -> Result<Expr, Error> {
        let cond = self.binary(2)?;
        if self.peek() == Some(Token::Question) {
            self.bump();
            let then = self.ternary()?;
            self.expect(Token::Colon)?;
            let other = self.ternary()?;
            return Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(other)));
        }
        Ok(cond)
    }

    /// Precedence climbing over left-associative binary operators.
    fn binary(&mut self, min_prec: u8) -> Result<Expr, Error> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, Error> {
        match self.bump() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.unary()?))),
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::Count) => Ok(Expr::Count),
            Some(Token::LParen) => {
                let inner = self.ternary()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(Error::plural_expr_error(format!(
                "expected operand, found {:?}",
                other
            ))),
        }
    }
}
