//! The boolean attribute query language.
//!
//! Users filter nodes and links with free-text queries like
//! `not lean and (obese or "insulin resistant") and >= 2`. The grammar is
//! CNF-shaped: `and`-separated terms, each term a single predicate or a
//! parenthesized `or`-group of predicates. Predicates are case-insensitive
//! substring matches against an entity's attribute list (a node's groups or
//! a link's attribs), optionally negated, set-grouped with `{...}`, or a
//! cardinality comparison against the attribute count.
//!
//! Parsing is two-phase: [`tokenize`] produces positioned tokens, then
//! [`AttribQuery::parse`] builds an immutable AST that is evaluated by the
//! pure [`AttribQuery::matches`]. Grammar failures surface as
//! [`CorrNetError::QueryGrammar`] with the byte offset of the offending
//! token, so the query editor can point at it; the previously applied
//! filter stays in effect because no AST is produced.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CorrNetError;

/// Comparison operator for cardinality predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl CmpOp {
    fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Gt => lhs > rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }
}

/// One predicate within an AND-term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryToken {
    /// Satisfied when some attribute contains `text` (case-insensitive
    /// substring); `negated` inverts to "no attribute contains".
    Literal { text: String, negated: bool },
    /// Set grouping `{a, b}`: satisfied when *all* members independently
    /// match. This mirrors the reference filter implementation, not the
    /// user documentation's "simultaneously" prose; confirm with
    /// stakeholders before changing to any-member semantics.
    Set { members: Vec<String>, negated: bool },
    /// Cardinality comparison against the entity's attribute count.
    Cardinality {
        op: CmpOp,
        count: f64,
        negated: bool,
    },
}

impl QueryToken {
    fn matches(&self, attribs: &[String]) -> bool {
        fn contains(attribs: &[String], needle: &str) -> bool {
            let needle = needle.to_lowercase();
            attribs.iter().any(|a| a.to_lowercase().contains(&needle))
        }
        match self {
            QueryToken::Literal { text, negated } => contains(attribs, text) != *negated,
            QueryToken::Set { members, negated } => {
                let all = members.iter().all(|m| contains(attribs, m));
                all != *negated
            }
            QueryToken::Cardinality { op, count, negated } => {
                op.eval(attribs.len() as f64, *count) != *negated
            }
        }
    }
}

/// One AND-term: a disjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndTerm {
    pub tokens: Vec<QueryToken>,
}

impl AndTerm {
    fn matches(&self, attribs: &[String]) -> bool {
        self.tokens.iter().any(|t| t.matches(attribs))
    }
}

/// A parsed attribute query: the conjunction of its AND-terms. The empty
/// query is the sentinel that matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttribQuery {
    pub terms: Vec<AndTerm>,
}

impl AttribQuery {
    /// Parse a user query string. Empty or whitespace-only input yields
    /// the match-all query.
    pub fn parse(text: &str) -> Result<AttribQuery, CorrNetError> {
        Parser::new(tokenize(text)?).parse()
    }

    /// True when this query puts no constraint on entities.
    pub fn is_match_all(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against an entity's attribute list (node groups or link
    /// attribs). Every AND-term must be satisfied.
    pub fn matches(&self, attribs: &[String]) -> bool {
        self.terms.iter().all(|term| term.matches(attribs))
    }
}

impl FromStr for AttribQuery {
    type Err = CorrNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttribQuery::parse(s)
    }
}

/// Parse-once cache keyed on the raw query text. Reparses only when the
/// text changes; a grammar error leaves the previous compiled query in
/// place, matching the no-partial-commit contract.
#[derive(Debug, Default, Clone)]
pub struct QueryCache {
    text: String,
    compiled: AttribQuery,
}

impl QueryCache {
    pub fn compile(&mut self, text: &str) -> Result<&AttribQuery, CorrNetError> {
        if text != self.text {
            self.compiled = AttribQuery::parse(text)?;
            self.text = text.to_string();
        }
        Ok(&self.compiled)
    }

    pub fn current(&self) -> &AttribQuery {
        &self.compiled
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Cmp(CmpOp),
    And,
    Or,
    Not,
    Word(String),
}

#[derive(Debug, Clone)]
struct Positioned {
    tok: Tok,
    offset: usize,
}

fn grammar_error(message: impl Into<String>, offset: usize) -> CorrNetError {
    CorrNetError::QueryGrammar {
        message: message.into(),
        offset,
    }
}

/// Characters treated as opening/closing quotes. Word processors replace
/// straight quotes with smart quotes; both forms must work.
fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}')
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '{' | '}' | ',' | '<' | '>' | '=') || is_quote(c)
}

fn tokenize(text: &str) -> Result<Vec<Positioned>, CorrNetError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        let tok = match c {
            _ if c.is_whitespace() => continue,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            ',' => Tok::Comma,
            '<' | '>' => {
                if chars.peek().is_some_and(|&(_, next)| next == '=') {
                    chars.next();
                    Tok::Cmp(if c == '<' { CmpOp::Le } else { CmpOp::Ge })
                } else {
                    Tok::Cmp(if c == '<' { CmpOp::Lt } else { CmpOp::Gt })
                }
            }
            '=' => Tok::Cmp(CmpOp::Eq),
            _ if is_quote(c) => {
                // Quoted fragment: preserve internal whitespace verbatim.
                let mut word = String::new();
                let mut terminated = false;
                for (_, qc) in chars.by_ref() {
                    if is_quote(qc) {
                        terminated = true;
                        break;
                    }
                    word.push(qc);
                }
                if !terminated {
                    return Err(grammar_error("unterminated quote", offset));
                }
                Tok::Word(word)
            }
            _ => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if is_word_boundary(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                match word.to_lowercase().as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    _ => Tok::Word(word),
                }
            }
        };
        tokens.push(Positioned { tok, offset });
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Positioned>,
    pos: usize,
    end_offset: usize,
}

impl Parser {
    fn new(tokens: Vec<Positioned>) -> Parser {
        let end_offset = tokens.last().map(|p| p.offset + 1).unwrap_or(0);
        Parser {
            tokens,
            pos: 0,
            end_offset,
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|p| &p.tok)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|p| p.offset)
            .unwrap_or(self.end_offset)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|p| p.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse(mut self) -> Result<AttribQuery, CorrNetError> {
        let mut terms = Vec::new();
        while self.peek().is_some() {
            terms.push(self.parse_and_term()?);
            // Explicit `and` is optional between terms; adjacency joins
            // terms conjunctively as well.
            if self.peek() == Some(&Tok::And) {
                self.advance();
                if self.peek().is_none() {
                    return Err(grammar_error("query ends with dangling 'and'", self.offset()));
                }
            }
        }
        Ok(AttribQuery { terms })
    }

    fn parse_and_term(&mut self) -> Result<AndTerm, CorrNetError> {
        if self.peek() == Some(&Tok::LParen) {
            self.advance();
            return self.parse_or_group();
        }
        let token = self.parse_predicate()?;
        Ok(AndTerm {
            tokens: vec![token],
        })
    }

    /// `( predicate (or predicate)* )`, already past the opening paren.
    fn parse_or_group(&mut self) -> Result<AndTerm, CorrNetError> {
        let mut tokens = Vec::new();
        loop {
            match self.peek() {
                None => return Err(grammar_error("unterminated group", self.offset())),
                Some(Tok::RParen) => {
                    self.advance();
                    if tokens.is_empty() {
                        return Err(grammar_error("empty group", self.offset()));
                    }
                    return Ok(AndTerm { tokens });
                }
                Some(Tok::Or) => {
                    if tokens.is_empty() {
                        return Err(grammar_error("group starts with 'or'", self.offset()));
                    }
                    self.advance();
                }
                _ => tokens.push(self.parse_predicate()?),
            }
        }
    }

    /// `NOT? (literal | setLiteral | comparator NUMBER)`
    fn parse_predicate(&mut self) -> Result<QueryToken, CorrNetError> {
        let negated = if self.peek() == Some(&Tok::Not) {
            self.advance();
            true
        } else {
            false
        };
        let offset = self.offset();
        match self.advance() {
            Some(Tok::Word(text)) => Ok(QueryToken::Literal { text, negated }),
            Some(Tok::LBrace) => self.parse_set(negated),
            Some(Tok::Cmp(op)) => {
                let number_offset = self.offset();
                match self.advance() {
                    Some(Tok::Word(word)) => match word.parse::<f64>() {
                        Ok(count) => Ok(QueryToken::Cardinality { op, count, negated }),
                        Err(_) => Err(grammar_error(
                            format!("'{}' must be followed by a number, found '{word}'", op.symbol()),
                            number_offset,
                        )),
                    },
                    _ => Err(grammar_error(
                        format!("dangling comparator '{}'", op.symbol()),
                        number_offset,
                    )),
                }
            }
            Some(other) => Err(grammar_error(
                format!("expected an attribute, set, or comparison, found {other:?}"),
                offset,
            )),
            None => Err(grammar_error(
                if negated {
                    "dangling 'not'"
                } else {
                    "expected an attribute, set, or comparison"
                },
                offset,
            )),
        }
    }

    /// `{ literal (, literal)* }`, already past the opening brace.
    fn parse_set(&mut self, negated: bool) -> Result<QueryToken, CorrNetError> {
        let mut members = Vec::new();
        loop {
            match self.advance() {
                Some(Tok::Word(word)) => members.push(word),
                Some(Tok::Comma) => {}
                Some(Tok::RBrace) => {
                    if members.is_empty() {
                        return Err(grammar_error("empty set literal", self.offset()));
                    }
                    return Ok(QueryToken::Set { members, negated });
                }
                Some(other) => {
                    return Err(grammar_error(
                        format!("unexpected {other:?} inside set literal"),
                        self.offset(),
                    ))
                }
                None => return Err(grammar_error("unterminated set literal", self.offset())),
            }
        }
    }
}
