use crate::Error;

use super::lexer::Token;
use super::{BinaryOp, Expression, Function, UnaryOp};

// prefix `+`/`-` bind tighter than `*` and looser than `^`, so `-x^2` is
// `-(x^2)`
const PREFIX_BINDING_POWER: u8 = 65;

/// Pratt parser over a list of tokens
pub(super) struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str, tokens: Vec<Token>) -> Parser<'a> {
        Parser {
            input: input,
            tokens: tokens,
            position: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        self.position += 1;
        return token;
    }

    fn error(&self, message: String) -> Error {
        Error::Expression(format!("{} in '{}'", message, self.input))
    }

    pub(super) fn parse(mut self) -> Result<Expression, Error> {
        let expression = self.parse_bp(0)?;
        match self.peek() {
            Token::Eof => Ok(expression),
            other => Err(self.error(format!("unexpected {:?} after the expression", other))),
        }
    }

    /// binding powers as `(left, right)`
    fn infix_binding_power(token: &Token) -> Option<(u8, u8, BinaryOp)> {
        match token {
            // right associative
            Token::Power => Some((70, 69, BinaryOp::Pow)),
            Token::Star => Some((60, 61, BinaryOp::Mul)),
            Token::Slash => Some((60, 61, BinaryOp::Div)),
            Token::Plus => Some((50, 51, BinaryOp::Add)),
            Token::Minus => Some((50, 51, BinaryOp::Sub)),
            _ => None,
        }
    }

    fn parse_bp(&mut self, min_bp: u8) -> Result<Expression, Error> {
        let mut lhs = match self.bump() {
            Token::Number(value) => Expression::Number(value),
            Token::Ident(name) => {
                if self.peek() == &Token::LParen {
                    self.bump();
                    self.parse_call(&name)?
                } else {
                    Expression::Variable(name)
                }
            }
            Token::LParen => {
                let inner = self.parse_bp(0)?;
                match self.bump() {
                    Token::RParen => inner,
                    other => return Err(self.error(format!("expected ')', got {:?}", other))),
                }
            }
            Token::Plus => {
                let operand = self.parse_bp(PREFIX_BINDING_POWER)?;
                Expression::Unary(UnaryOp::Plus, Box::new(operand))
            }
            Token::Minus => {
                let operand = self.parse_bp(PREFIX_BINDING_POWER)?;
                Expression::Unary(UnaryOp::Minus, Box::new(operand))
            }
            Token::Eof => return Err(self.error("unexpected end of expression".into())),
            other => return Err(self.error(format!("unexpected {:?}", other))),
        };

        while let Some((left_bp, right_bp, op)) = Self::infix_binding_power(self.peek()) {
            if left_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_bp(right_bp)?;
            lhs = Expression::Binary(Box::new(lhs), op, Box::new(rhs));
        }

        return Ok(lhs);
    }

    /// Parse the arguments of a function call, after the opening parenthesis
    fn parse_call(&mut self, name: &str) -> Result<Expression, Error> {
        let function = Function::from_name(name).ok_or_else(|| {
            self.error(format!("unknown function '{}'", name))
        })?;

        let mut arguments = Vec::new();
        if self.peek() == &Token::RParen {
            self.bump();
        } else {
            loop {
                arguments.push(self.parse_bp(0)?);
                match self.bump() {
                    Token::Comma => continue,
                    Token::RParen => break,
                    other => return Err(self.error(format!(
                        "expected ',' or ')' in call to '{}', got {:?}", name, other
                    ))),
                }
            }
        }

        if arguments.len() != 1 {
            return Err(self.error(format!(
                "'{}' takes 1 argument, got {}", name, arguments.len()
            )));
        }

        let argument = arguments.remove(0);
        return Ok(Expression::Call(function, Box::new(argument)));
    }
}
