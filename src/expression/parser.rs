//! Expression parser
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! conditional    := or ( "?" conditional ":" conditional )?
//! or             := and ( "or" and )*
//! and            := comparison ( "and" comparison )*
//! comparison     := concatenation ( ("==" | "!=" | "<=" | ">=" | "<" | ">") concatenation )?
//! concatenation  := additive ( "||" additive )*
//! additive       := multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative := unary ( ("*" | "/" | "%") unary )*
//! unary          := ("-" | "+" | "not") unary | power
//! power          := primary ( "^" unary )?
//! primary        := number | string | `quoted id` | identifier | call | "(" conditional ")"
//! ```
//!
//! Field ids that are not plain identifiers (UUIDs, for instance) are
//! referenced with backticks: `` `3f2a-...` ``.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, cut, map, not, opt, recognize, value, verify},
    error::{Error as NomError, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::errors::{ExpressionError, ExpressionResult};
use crate::schema::FieldValue;

type PResult<'a, T> = IResult<&'a str, T>;

/// Words that cannot be used as plain identifiers
const RESERVED: [&str; 3] = ["and", "or", "not"];

/// Cap on recursive nesting: parentheses, call arguments, unary chains,
/// `^` exponents and `?:` branches.
pub const MAX_NESTING: usize = 64;

/// Cap on the height of the finished tree. Long flat operator chains count
/// towards it as well.
pub const MAX_DEPTH: usize = 256;

/// Parses a complete expression.
pub fn parse(source: &str) -> ExpressionResult<Expr> {
    match all_consuming(terminated(|i| conditional(i, 0), multispace0))(source) {
        Ok((_, expr)) if expr.depth() > MAX_DEPTH => Err(ExpressionError::TooDeep { offset: 0 }),
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
            Err(ExpressionError::TooDeep {
                offset: source.len() - e.input.len(),
            })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(syntax_error(source, e.input))
        }
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(source, "")),
    }
}

fn syntax_error(source: &str, rest: &str) -> ExpressionError {
    let rest = rest.trim_start();
    let found = match rest.chars().next() {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    };
    ExpressionError::Syntax {
        offset: source.len() - rest.len(),
        found,
    }
}

fn too_deep(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge))
}

/// Runs `parser` one nesting level down, failing hard past the cap.
fn nested<'a>(
    input: &'a str,
    depth: usize,
    parser: fn(&'a str, usize) -> PResult<'a, Expr>,
) -> PResult<'a, Expr> {
    if depth >= MAX_NESTING {
        return Err(too_deep(input));
    }
    parser(input, depth + 1)
}

// ============================================================================
// Precedence levels
// ============================================================================

fn conditional<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (input, condition) = or_expr(input, depth)?;
    let (input, branches) = opt(pair(
        preceded(token(char('?')), cut(|i| nested(i, depth, conditional))),
        preceded(cut(token(char(':'))), cut(|i| nested(i, depth, conditional))),
    ))(input)?;

    let expr = match branches {
        Some((then_branch, else_branch)) => Expr::conditional(condition, then_branch, else_branch),
        None => condition,
    };
    Ok((input, expr))
}

fn or_expr<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    binary_level(input, depth, and_expr, value(BinaryOp::Or, keyword("or")))
}

fn and_expr<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    binary_level(input, depth, comparison, value(BinaryOp::And, keyword("and")))
}

fn comparison<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (input, left) = concatenation(input, depth)?;
    let (input, right) = opt(pair(token(comparison_op), |i| concatenation(i, depth)))(input)?;

    let expr = match right {
        Some((op, right)) => Expr::binary(op, left, right),
        None => left,
    };
    Ok((input, expr))
}

fn comparison_op(input: &str) -> PResult<'_, BinaryOp> {
    alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::NotEq, tag("!=")),
        value(BinaryOp::LtEq, tag("<=")),
        value(BinaryOp::GtEq, tag(">=")),
        value(BinaryOp::Lt, char('<')),
        value(BinaryOp::Gt, char('>')),
    ))(input)
}

fn concatenation<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    binary_level(input, depth, additive, value(BinaryOp::Concat, tag("||")))
}

fn additive<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    binary_level(
        input,
        depth,
        multiplicative,
        alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        )),
    )
}

fn multiplicative<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    binary_level(
        input,
        depth,
        unary,
        alt((
            value(BinaryOp::Mul, char('*')),
            value(BinaryOp::Div, char('/')),
            value(BinaryOp::Rem, char('%')),
        )),
    )
}

fn unary<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (rest, op) = opt(token(alt((
        value(UnaryOp::Negate, char('-')),
        value(UnaryOp::Plus, char('+')),
        value(UnaryOp::Not, keyword("not")),
    ))))(input)?;

    match op {
        Some(op) => map(cut(|i| nested(i, depth, unary)), move |operand| {
            Expr::unary(op, operand)
        })(rest),
        None => power(input, depth),
    }
}

fn power<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (input, base) = primary(input, depth)?;
    let (input, exponent) =
        opt(preceded(token(char('^')), cut(|i| nested(i, depth, unary))))(input)?;

    let expr = match exponent {
        Some(exponent) => Expr::binary(BinaryOp::Pow, base, exponent),
        None => base,
    };
    Ok((input, expr))
}

/// Left-associative chain of `operand (operator operand)*`. The chain is
/// folded only while the resulting tree stays under [`MAX_DEPTH`].
fn binary_level<'a>(
    input: &'a str,
    depth: usize,
    operand: fn(&'a str, usize) -> PResult<'a, Expr>,
    operator: impl FnMut(&'a str) -> PResult<'a, BinaryOp>,
) -> PResult<'a, Expr> {
    let (input, first) = operand(input, depth)?;
    let (rest_input, rest) = many0(pair(token(operator), |i| operand(i, depth)))(input)?;
    if rest.is_empty() {
        return Ok((rest_input, first));
    }

    let mut height = first.depth();
    let mut expr = first;
    for (op, right) in rest {
        height = height.max(right.depth()) + 1;
        if height > MAX_DEPTH {
            return Err(too_deep(input));
        }
        expr = Expr::binary(op, expr, right);
    }
    Ok((rest_input, expr))
}

// ============================================================================
// Primaries
// ============================================================================

fn primary<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    token(alt((
        map(number, |n| Expr::Literal(FieldValue::Number(n))),
        map(string_literal, |s| Expr::Literal(FieldValue::Text(s))),
        map(quoted_identifier, |name: &str| Expr::Variable(name.to_string())),
        |i| identifier_or_call(i, depth),
        |i| parenthesized(i, depth),
    )))(input)
}

fn parenthesized<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    delimited(
        char('('),
        |i| nested(i, depth, conditional),
        cut(token(char(')'))),
    )(input)
}

fn identifier_or_call<'a>(input: &'a str, depth: usize) -> PResult<'a, Expr> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(preceded(
        token(char('(')),
        cut(terminated(
            separated_list0(token(char(',')), |i| nested(i, depth, conditional)),
            token(char(')')),
        )),
    ))(input)?;

    let expr = match (name, args) {
        (name, Some(args)) => Expr::Call {
            name: name.to_string(),
            args,
        },
        ("true", None) => Expr::Literal(FieldValue::Bool(true)),
        ("false", None) => Expr::Literal(FieldValue::Bool(false)),
        (name, None) => Expr::Variable(name.to_string()),
    };
    Ok((input, expr))
}

fn number(input: &str) -> PResult<'_, f64> {
    let (rest, text) = recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    match text.parse::<f64>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Error(NomError::new(input, ErrorKind::Float))),
    }
}

/// Single- or double-quoted string with backslash escapes.
fn string_literal(input: &str) -> PResult<'_, String> {
    let (rest, quote) = alt((char('"'), char('\'')))(input)?;
    let mut text = String::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&rest[i + c.len_utf8()..], text)),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, 'r')) => text.push('\r'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c => text.push(c),
        }
    }

    // unterminated
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    verify(
        recognize(pair(satisfy(is_identifier_start), take_while(is_identifier_char))),
        |name: &str| !RESERVED.contains(&name),
    )(input)
}

fn quoted_identifier(input: &str) -> PResult<'_, &str> {
    delimited(char('`'), take_while1(|c| c != '`'), cut(char('`')))(input)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// ============================================================================
// Token helpers
// ============================================================================

fn token<'a, O, P>(parser: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: FnMut(&'a str) -> PResult<'a, O>,
{
    preceded(multispace0, parser)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_identifier_char)))
}
