//! Parser for the textual Boolean functions of gate libraries

use crate::error::{Error, Result};
use crate::expr::Expr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Const(bool),
    Not,
    And,
    Xor,
    Or,
    LParen,
    RParen,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '[' || c == ']'
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut ret = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let tok = match c {
            c if c.is_whitespace() => continue,
            '!' | '~' => Token::Not,
            '&' | '*' => Token::And,
            '^' => Token::Xor,
            '|' | '+' => Token::Or,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if is_ident_start(c) => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, d)) = chars.peek() {
                    if !is_ident_char(d) {
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                Token::Ident(input[i..end].to_string())
            }
            '0' | '1' => {
                if let Some(&(_, d)) = chars.peek() {
                    if is_ident_char(d) {
                        return Err(format!("unexpected character '{d}' after constant"));
                    }
                }
                Token::Const(c == '1')
            }
            c => return Err(format!("unexpected character '{c}' at position {i}")),
        };
        ret.push(tok);
    }
    Ok(ret)
}

/// Recursive descent over the token list
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn or_expr(&mut self) -> std::result::Result<Expr, String> {
        let mut e = self.xor_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.xor_expr()?;
            e = &e | &rhs;
        }
        Ok(e)
    }

    fn xor_expr(&mut self) -> std::result::Result<Expr, String> {
        let mut e = self.and_expr()?;
        while self.peek() == Some(&Token::Xor) {
            self.next();
            let rhs = self.and_expr()?;
            e = &e ^ &rhs;
        }
        Ok(e)
    }

    fn and_expr(&mut self) -> std::result::Result<Expr, String> {
        let mut e = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.unary()?;
            e = &e & &rhs;
        }
        Ok(e)
    }

    fn unary(&mut self) -> std::result::Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let e = self.unary()?;
            return Ok(!e);
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Expr, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Expr::bit(&name)),
            Some(Token::Const(b)) => Ok(if b { Expr::one() } else { Expr::zero() }),
            Some(Token::LParen) => {
                let e = self.or_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(e),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(t) => Err(format!("unexpected token {t:?}")),
            None => Err("unexpected end of input".to_string()),
        }
    }
}

pub(super) fn parse(input: &str) -> Result<Expr> {
    let err = |reason: String| Error::Parse {
        input: input.to_string(),
        reason,
    };
    let tokens = tokenize(input).map_err(err)?;
    let mut parser = Parser { tokens, pos: 0 };
    let e = parser.or_expr().map_err(err)?;
    if parser.pos < parser.tokens.len() {
        let t = &parser.tokens[parser.pos];
        return Err(err(format!("trailing token {t:?}")));
    }
    Ok(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let a = Expr::bit("A");
        let b = Expr::bit("B");
        let c = Expr::bit("C");
        assert_eq!(Expr::parse("A & B | C").unwrap(), (&a & &b) | c.clone());
        assert_eq!(Expr::parse("A | B & C").unwrap(), &a | &(&b & &c));
        assert_eq!(Expr::parse("A ^ B & C").unwrap(), &a ^ &(&b & &c));
        assert_eq!(Expr::parse("A | B ^ C").unwrap(), &a | &(&b ^ &c));
        assert_eq!(Expr::parse("!A & B").unwrap(), &(!&a) & &b);
        assert_eq!(Expr::parse("!(A & B)").unwrap(), !(&a & &b));
        assert_eq!(Expr::parse("~A * B + C").unwrap(), (&(!&a) & &b) | c);
    }

    #[test]
    fn test_constants_and_names() {
        assert_eq!(Expr::parse("0").unwrap(), Expr::zero());
        assert_eq!(Expr::parse(" 1 ").unwrap(), Expr::one());
        let e = Expr::parse("net_12 & D[3]").unwrap();
        let vars: Vec<_> = e.free_variables().into_iter().collect();
        assert_eq!(vars, vec!["D[3]".to_string(), "net_12".to_string()]);
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["A & B", "!(A ^ B) | C", "(A & !B) | (!A & C)", "1 ^ A"] {
            let e = Expr::parse(s).unwrap();
            assert_eq!(Expr::parse(&e.to_string()).unwrap(), e);
        }
    }

    #[test]
    fn test_errors() {
        for s in ["", "A &", "(A | B", "A B", "A $ B", "12", "1A", ")"] {
            let r = Expr::parse(s);
            assert!(matches!(r, Err(Error::Parse { .. })), "{s} should not parse");
        }
    }
}
