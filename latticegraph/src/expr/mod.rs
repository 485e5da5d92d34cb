//! A restricted arithmetic expression language, used for the numeric fields
//! of lattice graph libraries (basis vectors, parameters defaults and
//! coordinates) and for crystallographic symmetry operations such as
//! `-y+1/2`.
//!
//! The grammar only contains numbers, named variables, the `+ - * /`
//! operators, `^` and `**` for exponentiation, parenthesis, the constants
//! `pi` and `e`, and a fixed set of one-argument functions.

use indexmap::IndexMap;

use crate::Error;

mod lexer;
mod parser;

/// Binary operators available in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Unary operators available in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Functions available in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Exp,
    Log,
    Abs,
}

impl Function {
    fn from_name(name: &str) -> Option<Function> {
        let function = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "abs" => Function::Abs,
            _ => return None,
        };
        return Some(function);
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Sqrt => x.sqrt(),
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Abs => x.abs(),
        }
    }
}

/// A parsed arithmetic expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Unary(UnaryOp, Box<Expression>),
    Binary(Box<Expression>, BinaryOp, Box<Expression>),
    Call(Function, Box<Expression>),
}

impl std::str::FromStr for Expression {
    type Err = Error;

    fn from_str(input: &str) -> Result<Expression, Error> {
        Expression::parse(input)
    }
}

impl Expression {
    /// Parse `input` as an expression
    pub fn parse(input: &str) -> Result<Expression, Error> {
        let tokens = lexer::tokenize(input)?;
        return parser::Parser::new(input, tokens).parse();
    }

    /// Evaluate this expression, looking up variables in `variables`. The
    /// `pi` and `e` constants are used when no variable with this name
    /// exists.
    pub fn evaluate(&self, variables: &IndexMap<String, f64>) -> Result<f64, Error> {
        let value = match self {
            Expression::Number(value) => *value,
            Expression::Variable(name) => match variables.get(name) {
                Some(&value) => value,
                None => match name.as_str() {
                    "pi" => std::f64::consts::PI,
                    "e" => std::f64::consts::E,
                    _ => return Err(Error::Expression(format!("unknown variable '{}'", name))),
                }
            },
            Expression::Unary(UnaryOp::Plus, operand) => operand.evaluate(variables)?,
            Expression::Unary(UnaryOp::Minus, operand) => -operand.evaluate(variables)?,
            Expression::Binary(lhs, op, rhs) => {
                let lhs = lhs.evaluate(variables)?;
                let rhs = rhs.evaluate(variables)?;
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Pow => lhs.powf(rhs),
                }
            }
            Expression::Call(function, argument) => function.apply(argument.evaluate(variables)?),
        };
        return Ok(value);
    }

    /// Get the names of all the variables used in this expression, in order
    /// of first appearance. The `pi` and `e` constants are included.
    pub fn variables(&self) -> Vec<&str> {
        fn collect<'a>(expression: &'a Expression, names: &mut Vec<&'a str>) {
            match expression {
                Expression::Number(_) => {}
                Expression::Variable(name) => {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
                Expression::Unary(_, operand) | Expression::Call(_, operand) => collect(operand, names),
                Expression::Binary(lhs, _, rhs) => {
                    collect(lhs, names);
                    collect(rhs, names);
                }
            }
        }

        let mut names = Vec::new();
        collect(self, &mut names);
        return names;
    }
}

/// Parse and evaluate `input` in one go, requiring a finite result
pub fn evaluate(input: &str, variables: &IndexMap<String, f64>) -> Result<f64, Error> {
    let value = Expression::parse(input)?.evaluate(variables)?;
    if !value.is_finite() {
        return Err(Error::Expression(format!("'{}' evaluates to {}", input, value)));
    }
    return Ok(value);
}
