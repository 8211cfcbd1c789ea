use std::fmt;

use chumsky::prelude::*;
use strum::IntoStaticStr;

use crate::{
    error::{ExprError, ExprResult},
    guid::guid_string_to_structure_string,
    value::{StrKind, StrLit},
};

pub type Span = SimpleSpan;
pub type Spanned<T> = (T, Span);

type LexExtra<'src> = extra::Err<Rich<'src, char>>;

/// Characters that may start a symbolic operator.
const OPERATOR_CHARS: &str = "+-*/%&|^~<>!=?:";

/// Characters that may continue an operator run. A negation (`!`, `~`, `-`)
/// after another operator always starts the next operand.
const OPERATOR_TAIL_CHARS: &str = "+*/%&|^<>=?:";

/// Maximum length of each comma-separated field of a GUID structure literal,
/// braces included.
const GUID_FIELD_WIDTHS: [usize; 11] = [11, 6, 6, 5, 4, 4, 4, 4, 4, 4, 6];

/// Width of a `UINTn(...)` cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum CastWidth {
    #[strum(serialize = "UINT8")]
    Uint8,
    #[strum(serialize = "UINT16")]
    Uint16,
    #[strum(serialize = "UINT32")]
    Uint32,
    #[strum(serialize = "UINT64")]
    Uint64,
}

impl CastWidth {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn bits(self) -> u32 {
        match self {
            CastWidth::Uint8 => 8,
            CastWidth::Uint16 => 16,
            CastWidth::Uint32 => 32,
            CastWidth::Uint64 => 64,
        }
    }
}

/// Operator after alias folding (`AND` -> `&&`, `EQ` -> `==`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Op {
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "~")]
    BitNot,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = ":")]
    Colon,
}

impl Op {
    /// Symbolic spellings. `=` and other runs outside this table are rejected.
    pub fn from_symbol(text: &str) -> Option<Op> {
        Some(match text {
            "||" => Op::Or,
            "&&" => Op::And,
            "|" => Op::BitOr,
            "^" => Op::BitXor,
            "&" => Op::BitAnd,
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "!" => Op::Not,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "<<" => Op::Shl,
            ">>" => Op::Shr,
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "%" => Op::Mod,
            "~" => Op::BitNot,
            "?" => Op::Question,
            ":" => Op::Colon,
            _ => return None,
        })
    }

    /// Keyword aliases. Only these spellings are recognized; `Eq` or `And`
    /// stay plain identifiers.
    pub fn from_word(word: &str) -> Option<Op> {
        Some(match word {
            "OR" | "or" => Op::Or,
            "AND" | "and" => Op::And,
            "XOR" | "xor" => Op::BitXor,
            "EQ" => Op::Eq,
            "NE" => Op::Ne,
            "IN" | "in" => Op::In,
            "NOT" | "not" => Op::Not,
            "LT" => Op::Lt,
            "LE" => Op::Le,
            "GT" => Op::Gt,
            "GE" => Op::Ge,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        self.into()
    }
}

/// Lexical token of a macro-expanded expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Identifier, number or `TokenSpace.Name` reference. Resolved at evaluation time.
    Word(String),
    /// Alias keyword such as `AND` or `NOT`. Acts as an identifier in operand position.
    Keyword(Op, String),
    Str(StrLit),
    /// Canonical text of a `{...}` literal or of a converted registry GUID.
    Array(String),
    /// `UINTn(`, opening parenthesis included.
    Cast(CastWidth),
    LParen,
    RParen,
    Op(Op),
    /// Malformed input. The lexer keeps going so the first one can be reported.
    Error(ExprError),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) | Token::Keyword(_, w) => write!(f, "{w}"),
            Token::Str(s) => write!(f, "{}", s.literal()),
            Token::Array(a) => write!(f, "{a}"),
            Token::Cast(w) => write!(f, "{}(", w.name()),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Op(op) => write!(f, "{}", op.symbol()),
            Token::Error(e) => write!(f, "<{e}>"),
        }
    }
}

/// Splits `src` into spanned tokens.
///
/// `:` is part of an identifier unless the expression contains `?`, so the
/// lexer is built per expression.
pub fn tokenize(src: &str) -> ExprResult<Vec<Spanned<Token>>> {
    let (tokens, errs) = lexer(src, src.contains('?'))
        .parse(src)
        .into_output_errors();
    if let Some(err) = errs.into_iter().next() {
        return Err(ExprError::BadToken {
            rest: src[err.span().start..].to_string(),
        });
    }
    let tokens = tokens.unwrap_or_default();
    if let Some(err) = tokens.iter().find_map(|(tok, _)| match tok {
        Token::Error(err) => Some(err.clone()),
        _ => None,
    }) {
        return Err(err);
    }
    Ok(tokens)
}

fn is_id_char(c: char, colon_is_operator: bool) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.') || (c == ':' && !colon_is_operator)
}

/// Body of a quoted literal and whether its closing quote was found.
fn quoted<'src>(
    quote: char,
) -> impl Parser<'src, &'src str, (&'src str, bool), LexExtra<'src>> + Clone {
    let escape = just('\\').then(any()).ignored();
    let plain = any()
        .filter(move |c: &char| *c != quote && *c != '\\')
        .ignored();
    just(quote)
        .ignore_then(choice((escape, plain)).repeated().to_slice())
        .then(just(quote).or_not().map(|close| close.is_some()))
}

fn string<'src>(
    src: &'src str,
) -> impl Parser<'src, &'src str, Token, LexExtra<'src>> + Clone {
    let literal = move |prefix: &'static str, quote: char, kind: StrKind| {
        just(prefix)
            .ignore_then(quoted(quote))
            .map_with(move |(text, closed): (&str, bool), e| {
                let span: Span = e.span();
                if closed {
                    Token::Str(StrLit {
                        kind,
                        text: text.to_string(),
                    })
                } else {
                    Token::Error(ExprError::UnterminatedString {
                        literal: src[span.start..].to_string(),
                    })
                }
            })
    };
    choice((
        literal("L", '"', StrKind::Wide),
        literal("L", '\'', StrKind::WideChar),
        literal("", '\'', StrKind::NarrowChar),
        literal("", '"', StrKind::Narrow),
    ))
    .labelled("string literal")
}

/// Registry-format GUID `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` not followed by
/// an identifier character.
fn registry_guid<'src>() -> impl Parser<'src, &'src str, &'src str, LexExtra<'src>> + Clone {
    let hex_digit = any()
        .filter(|c: &char| c.is_ascii_hexdigit())
        .labelled("hexadecimal digit");
    hex_digit
        .repeated()
        .exactly(8)
        .then_ignore(just('-'))
        .then(hex_digit.repeated().exactly(4))
        .then_ignore(just('-'))
        .then(hex_digit.repeated().exactly(4))
        .then_ignore(just('-'))
        .then(hex_digit.repeated().exactly(4))
        .then_ignore(just('-'))
        .then(hex_digit.repeated().exactly(12))
        .to_slice()
        .then_ignore(
            any()
                .filter(|c: &char| c.is_alphanumeric() || *c == '_')
                .not(),
        )
        .labelled("GUID")
}

fn guid_array(guid: &str) -> ExprResult<String> {
    guid_string_to_structure_string(guid)
        .map(|structure| structure.chars().filter(|c| *c != ' ').collect())
        .ok_or_else(|| ExprError::BadToken {
            rest: guid.to_string(),
        })
}

/// `{...}` literal, canonicalized to its whitespace-free form.
fn array<'src>(
    colon_is_operator: bool,
) -> impl Parser<'src, &'src str, ExprResult<String>, LexExtra<'src>> + Clone {
    recursive(move |array| {
        let word = any()
            .filter(move |c: &char| is_id_char(*c, colon_is_operator))
            .repeated()
            .at_least(1)
            .to_slice()
            .map(|word: &str| {
                if is_hex_literal(word) {
                    Ok(format!("0x{}", &word[2..]))
                } else {
                    Err(ExprError::BadArrayElement {
                        element: word.to_string(),
                    })
                }
            });
        let string = choice((just("L").or_not().ignore_then(quoted('"')), quoted('\'')))
            .to_slice()
            .map(|text: &str| {
                Err(ExprError::BadArrayElement {
                    element: text.to_string(),
                })
            });
        let element = choice((
            array,
            registry_guid().map(guid_array),
            word,
            string,
        ))
        .padded();

        just('{')
            .ignore_then(
                element
                    .separated_by(just(','))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .then(just('}').or_not())
            .map(|(elements, close): (Vec<ExprResult<String>>, Option<char>)| {
                let elements = elements.into_iter().collect::<ExprResult<Vec<_>>>()?;
                let body = elements.join(",");
                if close.is_none() {
                    return Err(ExprError::BadArray {
                        literal: format!("{{{body}"),
                    });
                }
                let canonical = format!("{{{body}}}");
                if is_guid_structure(&canonical) || is_byte_list(&canonical) {
                    Ok(canonical)
                } else {
                    Err(ExprError::BadArray { literal: canonical })
                }
            })
    })
    .labelled("array literal")
}

fn lexer<'src>(
    src: &'src str,
    colon_is_operator: bool,
) -> impl Parser<'src, &'src str, Vec<Spanned<Token>>, LexExtra<'src>> {
    let cast = choice((
        just("UINT8(").to(CastWidth::Uint8),
        just("UINT16(").to(CastWidth::Uint16),
        just("UINT32(").to(CastWidth::Uint32),
        just("UINT64(").to(CastWidth::Uint64),
    ))
    .map(Token::Cast);

    let word = any()
        .filter(move |c: &char| is_id_char(*c, colon_is_operator))
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|word: &str| match Op::from_word(word) {
            Some(op) => Token::Keyword(op, word.to_string()),
            None => Token::Word(word.to_string()),
        });

    let operator = one_of(OPERATOR_CHARS)
        .then(one_of(OPERATOR_TAIL_CHARS).repeated())
        .to_slice()
        .map(|run: &str| match Op::from_symbol(run) {
            Some(op) => Token::Op(op),
            None => Token::Error(ExprError::UnsupportedOperator {
                op: run.to_string(),
            }),
        });

    let stray = any().map_with(move |_, e| {
        let span: Span = e.span();
        Token::Error(ExprError::BadToken {
            rest: src[span.start..].to_string(),
        })
    });

    let token = choice((
        string(src),
        cast,
        registry_guid().map(|guid| match guid_array(guid) {
            Ok(canonical) => Token::Array(canonical),
            Err(err) => Token::Error(err),
        }),
        word,
        array(colon_is_operator).map(|array| match array {
            Ok(canonical) => Token::Array(canonical),
            Err(err) => Token::Error(err),
        }),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        operator,
        stray,
    ));

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded()
        .repeated()
        .collect::<Vec<_>>()
        .padded()
        .then_ignore(end())
}

pub fn is_hex_literal(word: &str) -> bool {
    (word.starts_with("0x") || word.starts_with("0X"))
        && word.len() > 2
        && word[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_guid_structure(canonical: &str) -> bool {
    let fields: Vec<&str> = canonical.split(',').collect();
    fields.len() == 11
        && canonical.matches(",{").count() == 1
        && !canonical.contains("},")
        && fields[3].starts_with('{')
        && fields
            .iter()
            .zip(GUID_FIELD_WIDTHS)
            .all(|(field, width)| field.len() <= width)
}

fn is_byte_list(canonical: &str) -> bool {
    let inner = canonical.trim_start_matches('{').trim_end_matches('}');
    !inner.contains('{') && inner.split(',').all(|element| element.len() <= 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src)
            .expect("source lexes")
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    #[test]
    fn operand_kinds() {
        assert_eq!(
            tokens(r#"L"wide" 'c' "narrow\"q" gSpace.Pcd ( )"#),
            vec![
                Token::Str(StrLit {
                    kind: StrKind::Wide,
                    text: "wide".into()
                }),
                Token::Str(StrLit {
                    kind: StrKind::NarrowChar,
                    text: "c".into()
                }),
                Token::Str(StrLit::narrow(r#"narrow\"q"#)),
                Token::Word("gSpace.Pcd".into()),
                Token::LParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn spans_point_into_the_source() {
        let src = "  abc  == 0x1";
        let lexed = tokenize(src).unwrap();
        let slices: Vec<&str> = lexed
            .iter()
            .map(|(_, span)| &src[span.start..span.end])
            .collect();
        assert_eq!(slices, ["abc", "==", "0x1"]);
    }

    #[test]
    fn arrays_are_canonicalized() {
        assert_eq!(
            tokens("{ 0X1, 0xAb ,0x00 }"),
            vec![Token::Array("{0x1,0xAb,0x00}".into())]
        );
        assert!(tokenize("{0x123, 0x1}").unwrap_err().is_bad_array());
        assert!(tokenize("{0x1, abc}").unwrap_err().is_bad_array_element());
        assert!(tokenize("{0x1, 0x2").unwrap_err().is_bad_array());
    }

    #[test]
    fn registry_guid_becomes_structure() {
        assert_eq!(
            tokens("8be4df61-93ca-11d2-aa0d-00e098032b8c == 1"),
            vec![
                Token::Array(
                    "{0x8be4df61,0x93ca,0x11d2,{0xaa,0x0d,0x00,0xe0,0x98,0x03,0x2b,0x8c}}".into()
                ),
                Token::Op(Op::Eq),
                Token::Word("1".into()),
            ]
        );
    }

    #[test]
    fn operator_runs_split_before_negation() {
        assert_eq!(
            tokens("a&&!x"),
            vec![
                Token::Word("a".into()),
                Token::Op(Op::And),
                Token::Op(Op::Not),
                Token::Word("x".into()),
            ]
        );
        assert_eq!(
            tokens("2*-3"),
            vec![
                Token::Word("2".into()),
                Token::Op(Op::Mul),
                Token::Op(Op::Sub),
                Token::Word("3".into()),
            ]
        );
        assert!(tokenize("1 => 1").unwrap_err().is_unsupported_operator());
    }

    #[test]
    fn colon_joins_identifiers_without_ternary() {
        assert_eq!(tokens("a:b"), vec![Token::Word("a:b".into())]);
        assert_eq!(
            tokens("a ? b:c"),
            vec![
                Token::Word("a".into()),
                Token::Op(Op::Question),
                Token::Word("b".into()),
                Token::Op(Op::Colon),
                Token::Word("c".into()),
            ]
        );
    }

    #[test]
    fn cast_prefix_and_keywords() {
        assert_eq!(
            tokens("UINT16(0x10) AND not"),
            vec![
                Token::Cast(CastWidth::Uint16),
                Token::Word("0x10".into()),
                Token::RParen,
                Token::Keyword(Op::And, "AND".into()),
                Token::Keyword(Op::Not, "not".into()),
            ]
        );
    }

    #[test]
    fn malformed_text_reports_the_first_problem() {
        assert_eq!(
            tokenize("1 + \"abc").unwrap_err(),
            ExprError::UnterminatedString {
                literal: "\"abc".into()
            }
        );
        assert_eq!(
            tokenize("1 + @x").unwrap_err(),
            ExprError::BadToken { rest: "@x".into() }
        );
    }
}
