//! Boolean query language over persisted UTXOs.
//!
//! ```text
//! expr    := and ( ("or" | "|") and )*
//! and     := unary ( ("and" | "&") unary )*
//! unary   := ("not" | "~") unary | "(" expr ")" | field op literal
//! op      := "==" | "!=" | "<" | "<=" | ">" | ">="
//! literal := integer | 'string' | "string"
//! ```
//!
//! Fields are `index`, `value`, `txid`, `output_n`, `confirmations`, `block_height` and
//! `address`. `index` is the position of the UTXO in the persisted file.

// std
use std::{cmp::Ordering, iter::Peekable, str::CharIndices};
// self
use crate::{chain::btc::types::Utxo, prelude::*};

#[derive(Debug)]
pub struct Filter(Expr);
impl Filter {
	pub fn parse(query: &str) -> Result<Self> {
		let tokens = tokenize(query)?;
		let mut p = Parser { tokens: &tokens, pos: 0 };
		let expr = p.expr()?;

		match p.peek() {
			(_, Token::End) => Ok(Self(expr)),
			(offset, t) => Err(invalid(*offset, format!("unexpected {t:?}"))),
		}
	}

	pub fn matches(&self, index: usize, utxo: &Utxo) -> bool {
		self.0.eval(index, utxo)
	}
}

#[derive(Debug)]
enum Expr {
	Cmp(Field, CmpOp, Literal),
	And(Box<Expr>, Box<Expr>),
	Or(Box<Expr>, Box<Expr>),
	Not(Box<Expr>),
}
impl Expr {
	fn eval(&self, index: usize, utxo: &Utxo) -> bool {
		match self {
			Self::Cmp(f, op, l) => op.holds(f.value(index, utxo).cmp_literal(l)),
			Self::And(a, b) => a.eval(index, utxo) && b.eval(index, utxo),
			Self::Or(a, b) => a.eval(index, utxo) || b.eval(index, utxo),
			Self::Not(e) => !e.eval(index, utxo),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
	Index,
	Value,
	Txid,
	OutputN,
	Confirmations,
	BlockHeight,
	Address,
}
impl Field {
	fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"index" => Self::Index,
			"value" => Self::Value,
			"txid" => Self::Txid,
			"output_n" => Self::OutputN,
			"confirmations" => Self::Confirmations,
			"block_height" => Self::BlockHeight,
			"address" => Self::Address,
			_ => return None,
		})
	}

	fn value<'a>(&self, index: usize, utxo: &'a Utxo) -> FieldValue<'a> {
		match self {
			Self::Index => FieldValue::Int(index as _),
			Self::Value => FieldValue::Int(utxo.value.into()),
			Self::Txid => FieldValue::Str(&utxo.txid),
			Self::OutputN => FieldValue::Int(utxo.output_n.into()),
			Self::Confirmations => FieldValue::Int(utxo.confirmations.into()),
			Self::BlockHeight => utxo.block_height.map_or(FieldValue::Null, |h| FieldValue::Int(h.into())),
			Self::Address => FieldValue::Str(&utxo.address),
		}
	}
}

#[derive(Debug)]
enum FieldValue<'a> {
	Int(i128),
	Str(&'a str),
	Null,
}
impl FieldValue<'_> {
	// `None` if the two sides are not comparable.
	fn cmp_literal(&self, literal: &Literal) -> Option<Ordering> {
		match (self, literal) {
			(Self::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
			(Self::Str(a), Literal::Str(b)) => Some((*a).cmp(b.as_str())),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq)]
enum Literal {
	Int(i128),
	Str(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmpOp {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}
impl CmpOp {
	fn holds(self, ordering: Option<Ordering>) -> bool {
		let Some(o) = ordering else {
			// Missing values and mismatched types only differ.
			return self == Self::Ne;
		};

		match self {
			Self::Eq => o.is_eq(),
			Self::Ne => o.is_ne(),
			Self::Lt => o.is_lt(),
			Self::Le => o.is_le(),
			Self::Gt => o.is_gt(),
			Self::Ge => o.is_ge(),
		}
	}
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
	Ident(String),
	Int(i128),
	Str(String),
	Cmp(CmpOp),
	And,
	Or,
	Not,
	LParen,
	RParen,
	End,
}

fn invalid(offset: usize, reason: impl Into<String>) -> Error {
	ServiceError::InvalidFilter { offset, reason: reason.into() }.into()
}

fn tokenize(query: &str) -> Result<Vec<(usize, Token)>> {
	let mut chars = query.char_indices().peekable();
	let mut tokens = Vec::new();

	while let Some(&(i, c)) = chars.peek() {
		let t = match c {
			c if c.is_whitespace() => {
				chars.next();

				continue;
			},
			'(' => single(&mut chars, Token::LParen),
			')' => single(&mut chars, Token::RParen),
			'&' => single(&mut chars, Token::And),
			'|' => single(&mut chars, Token::Or),
			'~' => single(&mut chars, Token::Not),
			'=' | '!' | '<' | '>' => {
				chars.next();

				let eq = chars.next_if(|(_, c)| *c == '=').is_some();

				Token::Cmp(match (c, eq) {
					('=', true) => CmpOp::Eq,
					('!', true) => CmpOp::Ne,
					('<', true) => CmpOp::Le,
					('<', false) => CmpOp::Lt,
					('>', true) => CmpOp::Ge,
					('>', false) => CmpOp::Gt,
					_ => return Err(invalid(i, format!("expected `{c}=`"))),
				})
			},
			'\'' | '"' => {
				chars.next();

				let mut s = String::new();

				loop {
					match chars.next() {
						Some((_, q)) if q == c => break,
						Some((_, q)) => s.push(q),
						None => return Err(invalid(i, "unterminated string")),
					}
				}

				Token::Str(s)
			},
			'0'..='9' | '-' => {
				let digits = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));

				Token::Int(
					digits
						.replace('_', "")
						.parse()
						.map_err(|_| invalid(i, format!("invalid integer `{digits}`")))?,
				)
			},
			c if c.is_alphabetic() || c == '_' => {
				let word = take_while(&mut chars, |c| c.is_alphanumeric() || c == '_');

				match word.to_ascii_lowercase().as_str() {
					"and" => Token::And,
					"or" => Token::Or,
					"not" => Token::Not,
					_ => Token::Ident(word),
				}
			},
			c => return Err(invalid(i, format!("unexpected character `{c}`"))),
		};

		tokens.push((i, t));
	}

	tokens.push((query.len(), Token::End));

	Ok(tokens)
}

fn single(chars: &mut Peekable<CharIndices>, token: Token) -> Token {
	chars.next();

	token
}

fn take_while<F>(chars: &mut Peekable<CharIndices>, f: F) -> String
where
	F: Fn(char) -> bool,
{
	let mut s = String::new();

	while let Some((_, c)) = chars.next_if(|(_, c)| f(*c)) {
		s.push(c);
	}

	s
}

struct Parser<'a> {
	tokens: &'a [(usize, Token)],
	pos: usize,
}
impl Parser<'_> {
	fn peek(&self) -> &(usize, Token) {
		// `tokenize` always ends the stream with `Token::End`.
		&self.tokens[self.pos.min(self.tokens.len() - 1)]
	}

	fn next(&mut self) -> &(usize, Token) {
		let i = self.pos.min(self.tokens.len() - 1);

		self.pos += 1;

		&self.tokens[i]
	}

	fn eat(&mut self, token: &Token) -> bool {
		if &self.peek().1 == token {
			self.pos += 1;

			true
		} else {
			false
		}
	}

	fn expr(&mut self) -> Result<Expr> {
		let mut e = self.and()?;

		while self.eat(&Token::Or) {
			e = Expr::Or(Box::new(e), Box::new(self.and()?));
		}

		Ok(e)
	}

	fn and(&mut self) -> Result<Expr> {
		let mut e = self.unary()?;

		while self.eat(&Token::And) {
			e = Expr::And(Box::new(e), Box::new(self.unary()?));
		}

		Ok(e)
	}

	fn unary(&mut self) -> Result<Expr> {
		if self.eat(&Token::Not) {
			return Ok(Expr::Not(Box::new(self.unary()?)));
		}
		if self.eat(&Token::LParen) {
			let e = self.expr()?;

			return match self.next() {
				(_, Token::RParen) => Ok(e),
				(offset, t) => Err(invalid(*offset, format!("expected `)`, found {t:?}"))),
			};
		}

		self.comparison()
	}

	fn comparison(&mut self) -> Result<Expr> {
		let field = match self.next() {
			(offset, Token::Ident(name)) => Field::from_name(name)
				.ok_or_else(|| invalid(*offset, format!("unknown field `{name}`")))?,
			(offset, t) => return Err(invalid(*offset, format!("expected a field, found {t:?}"))),
		};
		let op = match self.next() {
			(_, Token::Cmp(op)) => *op,
			(offset, t) => return Err(invalid(*offset, format!("expected a comparison, found {t:?}"))),
		};
		let literal = match self.next() {
			(_, Token::Int(n)) => Literal::Int(*n),
			(_, Token::Str(s)) => Literal::Str(s.clone()),
			(offset, t) => return Err(invalid(*offset, format!("expected a literal, found {t:?}"))),
		};

		Ok(Expr::Cmp(field, op, literal))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn utxos() -> Vec<Utxo> {
		let mut unconfirmed = Utxo::new("cc", 0, 3_000);

		unconfirmed.confirmations = 0;
		unconfirmed.block_height = None;

		vec![Utxo::new("aa", 0, 1_000), Utxo::new("bb", 2, 200_000), unconfirmed]
	}

	fn select(query: &str) -> Vec<usize> {
		let f = Filter::parse(query).unwrap();

		utxos().iter().enumerate().filter(|(i, u)| f.matches(*i, u)).map(|(i, _)| i).collect()
	}

	#[test]
	fn comparisons_should_work() {
		assert_eq!(select("value < 100_000"), [0, 2]);
		assert_eq!(select("value >= 3000"), [1, 2]);
		assert_eq!(select("index == 1"), [1]);
		assert_eq!(select("output_n != 0"), [1]);
		assert_eq!(select("txid == 'bb'"), [1]);
		assert_eq!(select(r#"txid > "aa""#), [1, 2]);
		assert_eq!(select("confirmations<=0"), [2]);
		assert_eq!(select("address == '3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy'"), [0, 1, 2]);
	}

	#[test]
	fn missing_and_mismatched_values_should_only_differ() {
		assert_eq!(select("block_height > 0"), [0, 1]);
		assert_eq!(select("block_height != 0"), [0, 1, 2]);
		assert_eq!(select("block_height == 800000"), [0, 1]);
		assert_eq!(select("txid == 1"), Vec::<usize>::new());
		assert_eq!(select("txid != 1"), [0, 1, 2]);
	}

	#[test]
	fn boolean_operators_should_work() {
		assert_eq!(select("value < 100000 and confirmations > 0"), [0]);
		assert_eq!(select("value < 100000 & confirmations > 0"), [0]);
		assert_eq!(select("index == 0 or index == 2"), [0, 2]);
		assert_eq!(select("index == 0 | index == 2"), [0, 2]);
		assert_eq!(select("not index == 1"), [0, 2]);
		assert_eq!(select("~ index == 1"), [0, 2]);
		assert_eq!(select("NOT (index == 0 OR index == 1)"), [2]);
		// `and` binds tighter than `or`.
		assert_eq!(select("index == 0 or index == 1 and value < 1"), [0]);
		assert_eq!(select("(index == 0 or index == 1) and value < 100000"), [0]);
	}

	#[test]
	fn invalid_queries_should_fail() {
		for (query, offset) in [
			("", 0),
			("value <", 7),
			("value = 1", 6),
			("fee > 1", 0),
			("value > 1 and", 13),
			("(value > 1", 10),
			("value > 1)", 9),
			("txid == 'aa", 8),
			("value > 1x", 8),
			("value > 1 $", 10),
		] {
			assert!(
				matches!(
					Filter::parse(query),
					Err(Error::Service(ServiceError::InvalidFilter { offset: o, .. })) if o == offset
				),
				"{query}"
			);
		}
	}
}
