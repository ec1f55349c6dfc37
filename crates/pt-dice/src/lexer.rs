//! Tokenizer for dice notation.

use logos::Logos;
use std::fmt;
use std::ops::Range;

use crate::error::{NotationError, NotationResult};

/// A dice notation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Unsigned integer literal.
    Int(u64),
    /// The die marker `d`.
    Die,
    /// Percentile sides `%`.
    Percent,
    /// Keep highest `kh` (also bare `k`).
    KeepHigh,
    /// Keep lowest `kl`.
    KeepLow,
    /// Drop highest `dh`.
    DropHigh,
    /// Drop lowest `dl`.
    DropLow,
    /// Exploding dice `!`.
    Explode,
    /// Addition `+`.
    Plus,
    /// Subtraction or negation `-`.
    Minus,
    /// Multiplication `*`.
    Star,
    /// Truncating division `/`.
    Slash,
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Die => write!(f, "d"),
            Token::Percent => write!(f, "%"),
            Token::KeepHigh => write!(f, "kh"),
            Token::KeepLow => write!(f, "kl"),
            Token::DropHigh => write!(f, "dh"),
            Token::DropLow => write!(f, "dl"),
            Token::Explode => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Internal logos token, mapped to [`Token`] after lexing.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[regex(r"[0-9]+")]
    Int,

    #[token("d")]
    Die,

    #[token("%")]
    Percent,

    #[token("kh")]
    #[token("k")]
    KeepHigh,

    #[token("kl")]
    KeepLow,

    #[token("dh")]
    DropHigh,

    #[token("dl")]
    DropLow,

    #[token("!")]
    Explode,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    #[token("x")]
    Star,

    #[token("/")]
    Slash,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,
}

/// Whether `c` can appear anywhere in a notation.
pub fn is_notation_char(c: char) -> bool {
    matches!(
        c.to_ascii_lowercase(),
        '0'..='9' | 'd' | '%' | 'k' | 'h' | 'l' | '!' | '+' | '-' | '*' | 'x' | '/' | '(' | ')' | ' ' | '\t' | '\r' | '\n'
    )
}

/// Lex notation into `(Token, Span)` pairs. Input is matched case-insensitively.
///
/// Unlike a source-file lexer this stops at the first bad character: a
/// notation with stray text is not a notation at all.
pub fn lex(notation: &str) -> NotationResult<Vec<(Token, Range<usize>)>> {
    let source = notation.to_ascii_lowercase();
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(&source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let raw = result.map_err(|()| NotationError::UnexpectedChar {
            found: source[span.clone()].to_string(),
            offset: span.start,
        })?;
        let token = match raw {
            RawToken::Int => {
                let n = lexer
                    .slice()
                    .parse::<u64>()
                    .map_err(|_| NotationError::Overflow)?;
                Token::Int(n)
            }
            RawToken::Die => Token::Die,
            RawToken::Percent => Token::Percent,
            RawToken::KeepHigh => Token::KeepHigh,
            RawToken::KeepLow => Token::KeepLow,
            RawToken::DropHigh => Token::DropHigh,
            RawToken::DropLow => Token::DropLow,
            RawToken::Explode => Token::Explode,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Star => Token::Star,
            RawToken::Slash => Token::Slash,
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
        };
        tokens.push((token, span));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_simple_die() {
        assert_eq!(kinds("d100"), vec![Token::Die, Token::Int(100)]);
    }

    #[test]
    fn lex_keep_and_drop() {
        assert_eq!(
            kinds("2d20kh1"),
            vec![
                Token::Int(2),
                Token::Die,
                Token::Int(20),
                Token::KeepHigh,
                Token::Int(1)
            ]
        );
        assert_eq!(
            kinds("4d6dl1"),
            vec![
                Token::Int(4),
                Token::Die,
                Token::Int(6),
                Token::DropLow,
                Token::Int(1)
            ]
        );
    }

    #[test]
    fn lex_is_case_insensitive() {
        assert_eq!(kinds("D%"), vec![Token::Die, Token::Percent]);
        assert_eq!(kinds("2D6KL1")[3], Token::KeepLow);
    }

    #[test]
    fn lex_skips_whitespace() {
        assert_eq!(
            kinds(" 1 + 2 "),
            vec![Token::Int(1), Token::Plus, Token::Int(2)]
        );
    }

    #[test]
    fn notation_chars() {
        assert!("2D20KH1 + (d% - 3) * 2x4 / 6!".chars().all(is_notation_char));
        assert!(!"侦查".chars().any(is_notation_char));
        assert!(!is_notation_char('a'));
    }

    #[test]
    fn lex_rejects_words() {
        let err = lex("d100 侦查").unwrap_err();
        assert!(matches!(err, NotationError::UnexpectedChar { offset: 5, .. }));
    }
}
