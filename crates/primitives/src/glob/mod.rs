//! Shell-style glob matching over dotted paths.
//!
//! `*` matches a run of characters within one segment, `**` matches across
//! segments, `?` matches one non-separator character, and `[...]` matches a
//! character class (`[abc]`, `[a-z]`, `[!x]`). Everything else is literal,
//! including `.`. Matching is case-sensitive.

use std::fmt;

use crate::path::SEPARATOR;


#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Literal(char),
	AnyOne,
	Star,
	DoubleStar,
	Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
	fn class_matches(negated: bool, ranges: &[(char, char)], c: char) -> bool {
		let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
		hit != negated
	}
}

/// A compiled glob pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct Glob {
	pattern: Box<str>,
	tokens: Vec<Token>,
}

impl Glob {
	/// Compiles `pattern`. Compilation never fails: an unterminated `[` is
	/// taken literally.
	pub fn new(pattern: &str) -> Self {
		Self {
			pattern: Box::from(pattern),
			tokens: compile(pattern),
		}
	}

	/// The source pattern.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Returns `true` if the pattern contains no wildcard.
	pub fn is_literal(&self) -> bool {
		self.tokens.iter().all(|t| matches!(t, Token::Literal(_)))
	}

	/// Tests a full dotted path against the pattern.
	pub fn is_match(&self, path: &str) -> bool {
		let text: Vec<char> = path.chars().collect();
		match_from(&self.tokens, &text)
	}
}

impl fmt::Debug for Glob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Glob({:?})", &*self.pattern)
	}
}

/// One-shot convenience for [`Glob::is_match`].
pub fn glob_matches(pattern: &str, path: &str) -> bool {
	Glob::new(pattern).is_match(path)
}

fn compile(pattern: &str) -> Vec<Token> {
	let chars: Vec<char> = pattern.chars().collect();
	let mut tokens = Vec::with_capacity(chars.len());
	let mut i = 0;

	while i < chars.len() {
		match chars[i] {
			'*' => {
				if chars.get(i + 1) == Some(&'*') {
					i += 1;
					tokens.push(Token::DoubleStar);
				} else if tokens.last() != Some(&Token::DoubleStar) {
					tokens.push(Token::Star);
				}
			}
			'?' => tokens.push(Token::AnyOne),
			'[' => match parse_class(&chars[i + 1..]) {
				Some((token, consumed)) => {
					tokens.push(token);
					i += consumed;
				}
				None => tokens.push(Token::Literal('[')),
			},
			c => tokens.push(Token::Literal(c)),
		}
		i += 1;
	}

	tokens
}

/// Parses the body of a bracket class. Returns the token and the number of
/// characters consumed up to and including the closing `]`.
fn parse_class(body: &[char]) -> Option<(Token, usize)> {
	let mut i = 0;
	let negated = matches!(body.first(), Some('!' | '^'));
	if negated {
		i += 1;
	}

	let mut ranges = Vec::new();
	let mut first = true;
	loop {
		let c = *body.get(i)?;
		if c == ']' && !first {
			return Some((Token::Class { negated, ranges }, i + 1));
		}
		first = false;
		if body.get(i + 1) == Some(&'-')
			&& let Some(&hi) = body.get(i + 2)
			&& hi != ']'
		{
			ranges.push((c, hi));
			i += 3;
		} else {
			ranges.push((c, c));
			i += 1;
		}
	}
}

fn match_from(tokens: &[Token], text: &[char]) -> bool {
	let Some((first, rest)) = tokens.split_first() else {
		return text.is_empty();
	};

	match first {
		Token::DoubleStar => (0..=text.len()).any(|i| match_from(rest, &text[i..])),
		Token::Star => {
			for i in 0..=text.len() {
				if match_from(rest, &text[i..]) {
					return true;
				}
				if text.get(i) == Some(&SEPARATOR) {
					break;
				}
			}
			false
		}
		Token::AnyOne => matches!(text.split_first(), Some((&c, tail)) if c != SEPARATOR && match_from(rest, tail)),
		Token::Literal(lit) => matches!(text.split_first(), Some((c, tail)) if c == lit && match_from(rest, tail)),
		Token::Class { negated, ranges } => {
			matches!(text.split_first(), Some((&c, tail)) if c != SEPARATOR && Token::class_matches(*negated, ranges, c) && match_from(rest, tail))
		}
	}
}
