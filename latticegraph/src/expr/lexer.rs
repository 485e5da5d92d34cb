use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    /// `^` or `**`
    Power,
    LParen,
    RParen,
    Comma,
    Eof,
}

/// Split an expression into tokens. The returned list always ends with
/// `Token::Eof`.
pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let chars = input.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let starts_number = c.is_ascii_digit() || (
            c == '.' && chars.get(i + 1).map_or(false, char::is_ascii_digit)
        );

        if starts_number {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }

            // only consume an exponent if it is followed by digits, so that
            // `2e` is not silently read as a number
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }

            let literal = chars[start..i].iter().collect::<String>();
            let value = literal.parse::<f64>().map_err(|_| Error::Expression(
                format!("invalid number '{}' in '{}'", literal, input)
            ))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Power
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Power,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(Error::Expression(format!(
                    "unexpected character '{}' in '{}'", other, input
                )));
            }
        };
        tokens.push(token);
        i += 1;
    }

    tokens.push(Token::Eof);
    return Ok(tokens);
}
