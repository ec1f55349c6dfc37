//! Tokenizer for rule and replacer expressions.

use logos::Logos;

use super::ExprError;

/// A rule expression token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Num(f64),
    /// Boolean literal.
    Bool(bool),
    /// Variable name.
    Ident(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `!`
    Not,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
}

#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Num,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("||")]
    Or,
    #[token("&&")]
    And,
    #[token("!")]
    Not,
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
}

/// Lex an expression, failing on the first unknown character.
pub fn lex(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let raw = result.map_err(|()| ExprError::UnexpectedChar(lexer.slice().to_string()))?;
        tokens.push(match raw {
            RawToken::Num => {
                let n = lexer
                    .slice()
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedChar(lexer.slice().to_string()))?;
                Token::Num(n)
            }
            RawToken::True => Token::Bool(true),
            RawToken::False => Token::Bool(false),
            RawToken::Ident => Token::Ident(lexer.slice().to_string()),
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::Question => Token::Question,
            RawToken::Colon => Token::Colon,
            RawToken::Or => Token::Or,
            RawToken::And => Token::And,
            RawToken::Not => Token::Not,
            RawToken::Eq => Token::Eq,
            RawToken::NotEq => Token::NotEq,
            RawToken::StrictEq => Token::StrictEq,
            RawToken::StrictNotEq => Token::StrictNotEq,
            RawToken::Lt => Token::Lt,
            RawToken::Le => Token::Le,
            RawToken::Gt => Token::Gt,
            RawToken::Ge => Token::Ge,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Star => Token::Star,
            RawToken::Slash => Token::Slash,
            RawToken::Percent => Token::Percent,
        });
    }
    Ok(tokens)
}
