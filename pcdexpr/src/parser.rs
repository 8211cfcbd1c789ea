use chumsky::{input::ValueInput, prelude::*};
use strum::AsRefStr;

use crate::{
    error::{ExprError, ExprResult},
    token::{CastWidth, Op, Span, Spanned, Token, tokenize},
    value::StrLit,
};

/// Deepest combined nesting of parentheses, casts, ternaries and prefix
/// operators that [`parse`] accepts.
pub const MAX_NESTING_DEPTH: usize = 32;

const OPERAND: &str = "operand";
const CLOSE_PAREN: &str = "closing parenthesis";
const TERNARY_COLON: &str = "ternary `:`";
const IN_AFTER_NOT: &str = "`IN` after `NOT`";

type ParseExtra<'t> = extra::Err<Rich<'t, Token, Span>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum UnaryOp {
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "~")]
    BitNot,
    #[strum(serialize = "-")]
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum BinaryOp {
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "and")]
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
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "not in")]
    NotIn,
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
}

impl BinaryOp {
    /// Operators that accept string operands.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::In
                | BinaryOp::NotIn
        )
    }

    pub fn is_membership(self) -> bool {
        matches!(self, BinaryOp::In | BinaryOp::NotIn)
    }
}

/// Parsed expression.
///
/// Identifiers are kept unresolved so that the branch of a ternary that is
/// not taken never touches the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Str(StrLit),
    Array(String),
    Cast(CastWidth, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    /// Operators of one precedence level applied left to right:
    /// `a - b + c` is `Binary(a, [(Sub, b), (Add, c)])`.
    Binary(Box<Expr>, Vec<(BinaryOp, Expr)>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Parses a macro-expanded expression.
///
/// Precedence, loosest first: `?:`, `||`, `&&`, `|`, `^`, `&`,
/// `== != IN NOT IN`, `< <= > >=`, `<< >>`, `+ -`, `* / %`, unary `! ~ -`.
pub fn parse(src: &str) -> ExprResult<Expr> {
    let tokens = tokenize(src)?;
    check_nesting(src, &tokens)?;

    let plain: Vec<Token> = tokens.iter().map(|(tok, _)| tok.clone()).collect();
    let (ast, errs) = expr_parser()
        .then_ignore(end())
        .parse(plain.as_slice())
        .into_output_errors();
    if let Some(err) = errs.first() {
        return Err(classify(src, &tokens, err));
    }
    ast.ok_or_else(|| ExprError::Syntax {
        rest: src.to_string(),
    })
}

/// Alias keywords and symbols of the listed operators, folded to [`BinaryOp`].
macro_rules! binary_ops {
    ($($op:ident),+ $(,)?) => {
        select! {
            $(
                Token::Op(Op::$op) => BinaryOp::$op,
                Token::Keyword(Op::$op, _) => BinaryOp::$op,
            )+
        }
    };
}

/// One left-associative precedence level.
fn level<'t, I, P, O>(operand: P, op: O) -> impl Parser<'t, I, Expr, ParseExtra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token, Span = Span>,
    P: Parser<'t, I, Expr, ParseExtra<'t>> + Clone + 't,
    O: Parser<'t, I, BinaryOp, ParseExtra<'t>> + Clone + 't,
{
    operand
        .clone()
        .then(op.then(operand).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            if rest.is_empty() {
                first
            } else {
                Expr::Binary(Box::new(first), rest)
            }
        })
        .boxed()
}

fn expr_parser<'t, I>() -> impl Parser<'t, I, Expr, ParseExtra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token, Span = Span>,
{
    recursive(|expr| {
        // alias keywords are plain identifiers in operand position
        let atom = select! {
            Token::Word(w) => Expr::Ident(w),
            Token::Keyword(_, w) => Expr::Ident(w),
            Token::Str(s) => Expr::Str(s),
            Token::Array(a) => Expr::Array(a),
        };

        let close_paren = just(Token::RParen).labelled(CLOSE_PAREN);
        let group = just(Token::LParen)
            .ignore_then(expr.clone())
            .then_ignore(close_paren.clone());
        let cast = select! { Token::Cast(width) => width }
            .then(expr.clone())
            .then_ignore(close_paren)
            .map(|(width, inner)| Expr::Cast(width, Box::new(inner)));

        let prefix = select! {
            Token::Op(Op::Not) => UnaryOp::Not,
            Token::Keyword(Op::Not, _) => UnaryOp::Not,
            Token::Op(Op::BitNot) => UnaryOp::BitNot,
            Token::Op(Op::Sub) => UnaryOp::Neg,
        };
        let unary = prefix
            .repeated()
            .foldr(choice((atom, group, cast)), |op, operand| {
                Expr::Unary(op, Box::new(operand))
            })
            .labelled(OPERAND);

        let not_in = select! {
            Token::Op(Op::Not) => (),
            Token::Keyword(Op::Not, _) => (),
        }
        .ignore_then(select! { Token::Keyword(Op::In, _) => () }.labelled(IN_AFTER_NOT))
        .to(BinaryOp::NotIn);

        let multiplicative = level(unary, binary_ops!(Mul, Div, Mod));
        let additive = level(multiplicative, binary_ops!(Add, Sub));
        let shift = level(additive, binary_ops!(Shl, Shr));
        let relational = level(shift, binary_ops!(Lt, Le, Gt, Ge));
        let equality = level(relational, choice((binary_ops!(Eq, Ne, In), not_in)));
        let bit_and = level(equality, binary_ops!(BitAnd));
        let bit_xor = level(bit_and, binary_ops!(BitXor));
        let bit_or = level(bit_xor, binary_ops!(BitOr));
        let and = level(bit_or, binary_ops!(And));
        let or = level(and, binary_ops!(Or));

        // `expr` in both branches makes the ternary right-associative
        or.then(
            just(Token::Op(Op::Question))
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Op(Op::Colon)).labelled(TERNARY_COLON))
                .then(expr)
                .or_not(),
        )
        .map(|(cond, branches)| match branches {
            Some((then, otherwise)) => {
                Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise))
            }
            None => cond,
        })
    })
}

/// Maps the furthest parse error onto the diagnostic it stands for.
fn classify(src: &str, tokens: &[Spanned<Token>], err: &Rich<'_, Token, Span>) -> ExprError {
    let rest = tokens
        .get(err.span().start)
        .map_or("", |(_, span)| &src[span.start..])
        .to_string();
    let expects = |label: &str| {
        err.expected()
            .any(|pattern| pattern.to_string().contains(label))
    };

    if expects(IN_AFTER_NOT) {
        ExprError::NotWithoutIn { rest }
    } else if expects(OPERAND) {
        ExprError::MissingOperand { rest }
    } else if expects(CLOSE_PAREN) {
        ExprError::UnmatchedParen { rest }
    } else if expects(TERNARY_COLON) {
        ExprError::MissingColon { rest }
    } else {
        ExprError::Syntax { rest }
    }
}

#[derive(Debug, Default)]
struct Frame {
    questions: usize,
    prefix: usize,
}

/// Rejects token streams that would nest deeper than [`MAX_NESTING_DEPTH`].
///
/// Runs before the recursive parser so that its stack use stays bounded.
/// Each open group, pending ternary and unapplied prefix operator counts as
/// one level.
fn check_nesting(src: &str, tokens: &[Spanned<Token>]) -> ExprResult<()> {
    let mut frames = vec![Frame::default()];
    let mut operand_next = true;

    for (tok, span) in tokens {
        match tok {
            Token::LParen | Token::Cast(_) => {
                frames.push(Frame::default());
                operand_next = true;
            }
            Token::RParen => {
                if frames.len() > 1 {
                    frames.pop();
                }
                if let Some(frame) = frames.last_mut() {
                    frame.prefix = 0;
                }
                operand_next = false;
            }
            Token::Op(Op::Question) => {
                if let Some(frame) = frames.last_mut() {
                    frame.questions += 1;
                }
                operand_next = true;
            }
            Token::Op(Op::Not | Op::BitNot | Op::Sub) | Token::Keyword(Op::Not, _)
                if operand_next =>
            {
                if let Some(frame) = frames.last_mut() {
                    frame.prefix += 1;
                }
            }
            Token::Op(_) => operand_next = true,
            Token::Keyword(_, _) if !operand_next => operand_next = true,
            _ => {
                if let Some(frame) = frames.last_mut() {
                    frame.prefix = 0;
                }
                operand_next = false;
            }
        }

        let depth = frames.len() - 1
            + frames
                .iter()
                .map(|frame| frame.questions + frame.prefix)
                .sum::<usize>();
        if depth > MAX_NESTING_DEPTH {
            return Err(ExprError::NestingTooDeep {
                rest: src[span.start..].to_string(),
                max: MAX_NESTING_DEPTH,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.into())
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(ident("1")),
                vec![(
                    BinaryOp::Add,
                    Expr::Binary(Box::new(ident("2")), vec![(BinaryOp::Mul, ident("3"))])
                )]
            )
        );
    }

    #[test]
    fn same_level_operators_stay_in_one_run() {
        let expr = parse("a - b + c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(ident("a")),
                vec![(BinaryOp::Sub, ident("b")), (BinaryOp::Add, ident("c"))]
            )
        );
    }

    #[test]
    fn ternary_is_right_associative() {
        let expr = parse("a ? b : c ? d : e").unwrap();
        assert_eq!(
            expr,
            Expr::Ternary(
                Box::new(ident("a")),
                Box::new(ident("b")),
                Box::new(Expr::Ternary(
                    Box::new(ident("c")),
                    Box::new(ident("d")),
                    Box::new(ident("e"))
                ))
            )
        );
    }

    #[test]
    fn alias_keywords_and_not_in() {
        let expr = parse("X NOT IN \"A B\" AND Y EQ 1").unwrap();
        let Expr::Binary(lhs, rest) = expr else {
            panic!("expected a conjunction");
        };
        assert!(matches!(*lhs, Expr::Binary(_, ref r) if r[0].0 == BinaryOp::NotIn));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].0, BinaryOp::And);
        assert!(matches!(rest[0].1, Expr::Binary(_, ref r) if r[0].0 == BinaryOp::Eq));
    }

    #[test]
    fn keywords_in_operand_position_are_identifiers() {
        assert_eq!(
            parse("AND == or").unwrap(),
            Expr::Binary(Box::new(ident("AND")), vec![(BinaryOp::Eq, ident("or"))])
        );
    }

    #[test]
    fn not_requires_in_at_equality_level() {
        assert_eq!(
            parse("1 NOT 2").unwrap_err(),
            ExprError::NotWithoutIn { rest: "2".into() }
        );
    }

    #[test]
    fn syntax_errors_carry_the_offending_text() {
        assert_eq!(
            parse("1 2").unwrap_err(),
            ExprError::Syntax { rest: "2".into() }
        );
        assert!(parse("(1 + 2").unwrap_err().is_unmatched_paren());
        assert!(parse("UINT8(1").unwrap_err().is_unmatched_paren());
        assert!(parse("1 ? 2").unwrap_err().is_missing_colon());
        assert!(parse("1 +").unwrap_err().is_missing_operand());
        assert_eq!(
            parse("1 + )").unwrap_err(),
            ExprError::MissingOperand { rest: ")".into() }
        );
    }

    #[test]
    fn unary_minus_and_cast() {
        let expr = parse("UINT8(-1)").unwrap();
        assert_eq!(
            expr,
            Expr::Cast(
                CastWidth::Uint8,
                Box::new(Expr::Unary(UnaryOp::Neg, Box::new(ident("1"))))
            )
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}1{}", "(".repeat(16), ")".repeat(16));
        assert_eq!(parse(&ok).unwrap(), ident("1"));

        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse(&deep).unwrap_err();
        assert!(err.is_nesting_too_deep());

        let negations = format!("{}1", "- ".repeat(MAX_NESTING_DEPTH + 1));
        assert!(parse(&negations).unwrap_err().is_nesting_too_deep());

        let ternaries = "a ? b : ".repeat(MAX_NESTING_DEPTH + 1) + "c";
        assert!(parse(&ternaries).unwrap_err().is_nesting_too_deep());
    }

    #[test]
    fn sequential_groups_do_not_accumulate_depth() {
        let flat = vec!["(1)"; 200].join(" + ");
        assert!(parse(&flat).is_ok());
        let negated = vec!["!a"; 200].join(" && ");
        assert!(parse(&negated).is_ok());
    }
}
