//! Parser for the logic mini-language used by `relevant`, `constraint` and
//! `calculate` bind attributes.
//!
//! The grammar is a small, loosely specified subset of XPath. Recognised forms
//! are tried in a fixed precedence order and the first match wins:
//!
//! 1. `concat(...)` / `uuid(...)` function calls,
//! 2. `if(test, a, b)` conditionals,
//! 3. `selected(path, value)` / `regex(path, value)` matches,
//! 4. a generic `lhs OP rhs` comparison, optionally wrapping `lhs` in a
//!    single-argument function such as `string-length(.)`.
//!
//! Anything else is kept verbatim as [`ConditionExpression::Literal`].
//!
//! Boolean attributes are split into OR-groups of AND-terms at the top level
//! (outside parentheses and quotes). The words `and`/`or` are matched as whole
//! tokens, so an unquoted path segment literally named `and` or `or` still
//! splits the expression.
//!
//! Input is attribute text as delivered by `xform_xml::parse`, with XML
//! entities already decoded.

use std::fmt;

use tracing::trace;

use crate::path;

/// Parsed condition or value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConditionExpression {
    /// `concat(...)` or `uuid(...)` with recursively parsed arguments.
    FunctionCall {
        name: FunctionName,
        args: Vec<ConditionExpression>,
    },
    /// `if(test, when_true, when_false)`.
    Conditional {
        test: BooleanGroup,
        when_true: Box<ConditionExpression>,
        when_false: Box<ConditionExpression>,
    },
    /// `selected(path, value)` (op `=`) or `regex(path, value)` (op `~`).
    SelectOrRegex {
        op: MatchOp,
        path: String,
        value: String,
    },
    /// `path OP value`, or `wrapper(path) OP value`.
    Comparison {
        op: String,
        path: String,
        value: String,
        wrapper_function: Option<String>,
    },
    /// OR-of-AND group, produced for boolean attributes and for
    /// parenthesised terms inside them.
    Group(BooleanGroup),
    /// Input that matched none of the known forms, kept as written.
    Literal(String),
}

/// Functions recognised by the function-call rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FunctionName {
    Concat,
    Uuid,
}

impl FunctionName {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "concat" => Some(FunctionName::Concat),
            "uuid" => Some(FunctionName::Uuid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionName::Concat => "concat",
            FunctionName::Uuid => "uuid",
        }
    }
}

/// Match kind of a [`ConditionExpression::SelectOrRegex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchOp {
    /// `selected(...)`, symbol `=`.
    Selected,
    /// `regex(...)`, symbol `~`.
    Regex,
}

impl MatchOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            MatchOp::Selected => "=",
            MatchOp::Regex => "~",
        }
    }

    fn function(&self) -> &'static str {
        match self {
            MatchOp::Selected => "selected",
            MatchOp::Regex => "regex",
        }
    }
}

/// Ordered disjunction of conjunctions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BooleanGroup {
    pub disjuncts: Vec<Disjunct>,
}

/// One OR-branch of a [`BooleanGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Disjunct {
    /// Branch with a single conjunct.
    Single(ConditionExpression),
    /// Branch whose conditions must all hold.
    All(Vec<ConditionExpression>),
}

impl Disjunct {
    pub fn terms(&self) -> &[ConditionExpression] {
        match self {
            Disjunct::Single(term) => std::slice::from_ref(term),
            Disjunct::All(terms) => terms,
        }
    }
}

impl BooleanGroup {
    /// Iterate every leaf term, branch by branch.
    pub fn terms(&self) -> impl Iterator<Item = &ConditionExpression> {
        self.disjuncts.iter().flat_map(Disjunct::terms)
    }

    /// Whether any term (including terms of nested groups) was left unparsed.
    pub fn has_unparsed_terms(&self) -> bool {
        self.terms().any(|term| match term {
            ConditionExpression::Literal(_) => true,
            ConditionExpression::Group(inner) => inner.has_unparsed_terms(),
            _ => false,
        })
    }
}

impl ConditionExpression {
    pub fn is_literal(&self) -> bool {
        matches!(self, ConditionExpression::Literal(_))
    }

    /// Resolved path operands referenced anywhere in the expression, in
    /// first-seen order without duplicates.
    pub fn referenced_paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_paths(self, &mut out);
        out
    }
}

fn collect_paths<'a>(expr: &'a ConditionExpression, out: &mut Vec<&'a str>) {
    match expr {
        ConditionExpression::FunctionCall { args, .. } => {
            for arg in args {
                collect_paths(arg, out);
            }
        }
        ConditionExpression::Conditional {
            test,
            when_true,
            when_false,
        } => {
            for term in test.terms() {
                collect_paths(term, out);
            }
            collect_paths(when_true, out);
            collect_paths(when_false, out);
        }
        ConditionExpression::SelectOrRegex { path, .. }
        | ConditionExpression::Comparison { path, .. } => {
            if !path.is_empty() && !out.contains(&path.as_str()) {
                out.push(path.as_str());
            }
        }
        ConditionExpression::Group(group) => {
            for term in group.terms() {
                collect_paths(term, out);
            }
        }
        ConditionExpression::Literal(_) => {}
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpression::FunctionCall { name, args } => {
                write!(f, "{}(", name.as_str())?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            ConditionExpression::Conditional {
                test,
                when_true,
                when_false,
            } => write!(f, "if({test}, {when_true}, {when_false})"),
            ConditionExpression::SelectOrRegex { op, path, value } => {
                write!(f, "{}({path}, '{value}')", op.function())
            }
            ConditionExpression::Comparison {
                op,
                path,
                value,
                wrapper_function,
            } => match wrapper_function {
                Some(func) => write!(f, "{func}({path}) {op} '{value}'"),
                None => write!(f, "{path} {op} '{value}'"),
            },
            ConditionExpression::Group(group) => write!(f, "({group})"),
            ConditionExpression::Literal(raw) => f.write_str(raw),
        }
    }
}

impl fmt::Display for BooleanGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, disjunct) in self.disjuncts.iter().enumerate() {
            if idx > 0 {
                f.write_str(" or ")?;
            }
            for (pos, term) in disjunct.terms().iter().enumerate() {
                if pos > 0 {
                    f.write_str(" and ")?;
                }
                write!(f, "{term}")?;
            }
        }
        Ok(())
    }
}

/// Deepest parenthesis nesting the parser descends into. Deeper input is
/// kept whole as [`ConditionExpression::Literal`].
pub const MAX_NESTING: usize = 64;

/// Parse a single condition or value expression (used for `calculate`).
///
/// Relative path operands are resolved against `current_path`.
pub fn parse_condition(raw: &str, current_path: &str) -> ConditionExpression {
    condition_from(raw.trim(), current_path, 0)
}

/// Parse a boolean expression (used for `relevant` and `constraint`) into an
/// OR-of-AND [`BooleanGroup`].
pub fn parse_boolean(raw: &str, current_path: &str) -> BooleanGroup {
    boolean_from(raw.trim(), current_path, 0)
}

/// Remove one pair of matching surrounding quotes, if present.
pub fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Tokenise `text` for a parse entered at `depth`, refusing input whose
/// nesting would take the parse past [`MAX_NESTING`].
fn parser_at(text: &str, depth: usize) -> Result<Parser<'_>, ParseError> {
    let parser = Parser::new(text)?;
    let nesting = depth + parser.nesting();
    if nesting > MAX_NESTING {
        return Err(ParseError::new(format!(
            "nesting depth {nesting} exceeds {MAX_NESTING}"
        )));
    }
    Ok(parser)
}

fn condition_from(text: &str, current_path: &str, depth: usize) -> ConditionExpression {
    let parser = match parser_at(text, depth) {
        Ok(parser) => parser,
        Err(err) => {
            trace!(%err, input = text, "expression kept as literal");
            return ConditionExpression::Literal(text.to_string());
        }
    };
    let depth = depth + 1;
    parser
        .function_call(current_path, depth)
        .or_else(|| parser.conditional(current_path, depth))
        .or_else(|| parser.select_or_regex(current_path))
        .or_else(|| parser.comparison(current_path))
        .unwrap_or_else(|| {
            trace!(input = text, "no grammar rule matched");
            ConditionExpression::Literal(text.to_string())
        })
}

fn boolean_from(text: &str, current_path: &str, depth: usize) -> BooleanGroup {
    let parser = match parser_at(text, depth) {
        Ok(parser) => parser,
        Err(err) => {
            trace!(%err, input = text, "boolean expression kept as literal");
            return BooleanGroup {
                disjuncts: vec![Disjunct::Single(ConditionExpression::Literal(
                    text.to_string(),
                ))],
            };
        }
    };

    let mut disjuncts = Vec::new();
    for (lo, hi) in parser.split_top_level(0, text.len(), "or") {
        let mut terms: Vec<ConditionExpression> = parser
            .split_top_level(lo, hi, "and")
            .into_iter()
            .map(|(start, end)| text[start..end].trim())
            .filter(|term| !term.is_empty())
            .map(|term| term_from(term, current_path, depth))
            .collect();
        match terms.len() {
            0 => {}
            1 => disjuncts.extend(terms.pop().map(Disjunct::Single)),
            _ => disjuncts.push(Disjunct::All(terms)),
        }
    }
    BooleanGroup { disjuncts }
}

fn term_from(term: &str, current_path: &str, depth: usize) -> ConditionExpression {
    if let Ok(parser) = parser_at(term, depth) {
        if parser.is_parenthesised() {
            let inner = &term[1..term.len() - 1];
            return ConditionExpression::Group(boolean_from(inner.trim(), current_path, depth + 1));
        }
    }
    condition_from(term, current_path, depth)
}

/// Error produced while tokenising an expression.
#[derive(Debug, Clone)]
struct ParseError {
    msg: String,
}

impl ParseError {
    fn new<S: Into<String>>(msg: S) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    /// Path, identifier, number or any other unquoted run.
    Name,
    /// Quoted string, span includes the quotes.
    Str,
    LParen,
    RParen,
    Comma,
    /// Run of comparison characters.
    Op,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_ws();
        let Some(&byte) = self.input.get(self.pos) else {
            return Ok(None);
        };
        let start = self.pos;
        let kind = match byte {
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b'\'' | b'"' => {
                self.lex_string(byte)?;
                TokenKind::Str
            }
            b if is_op(b) => {
                while self.input.get(self.pos).is_some_and(|&b| is_op(b)) {
                    self.pos += 1;
                }
                TokenKind::Op
            }
            _ => {
                while self.input.get(self.pos).is_some_and(|&b| is_name(b)) {
                    self.pos += 1;
                }
                TokenKind::Name
            }
        };
        Ok(Some(Token {
            kind,
            start,
            end: self.pos,
        }))
    }

    fn skip_ws(&mut self) {
        while let Some(&byte) = self.input.get(self.pos) {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, quote: u8) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(&byte) = self.input.get(self.pos) {
            self.pos += 1;
            if byte == quote {
                return Ok(());
            }
        }
        Err(ParseError::new(format!(
            "unterminated string starting at byte {start}"
        )))
    }
}

fn is_op(byte: u8) -> bool {
    matches!(byte, b'<' | b'>' | b'=' | b'!')
}

fn is_name(byte: u8) -> bool {
    !byte.is_ascii_whitespace()
        && !is_op(byte)
        && !matches!(byte, b'(' | b')' | b',' | b'\'' | b'"')
}

/// A call spanning the whole input: `name(arg, ...)`.
struct Call<'a> {
    name: &'a str,
    args: Vec<&'a str>,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(src).tokenize()?;
        Ok(Parser { src, tokens })
    }

    /// Deepest parenthesis nesting in the token stream.
    fn nesting(&self) -> usize {
        let mut depth = 0usize;
        let mut deepest = 0usize;
        for token in &self.tokens {
            match token.kind {
                TokenKind::LParen => {
                    depth += 1;
                    deepest = deepest.max(depth);
                }
                TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        deepest
    }

    fn text(&self, token: &Token) -> &'a str {
        &self.src[token.start..token.end]
    }

    fn kind(&self, idx: usize) -> Option<TokenKind> {
        self.tokens.get(idx).map(|token| token.kind)
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn is_parenthesised(&self) -> bool {
        self.kind(0) == Some(TokenKind::LParen)
            && self.matching_paren(0) == Some(self.tokens.len() - 1)
    }

    /// Split the argument list between the parentheses at `open` and `close`
    /// on commas directly inside them.
    fn args_between(&self, open: usize, close: usize) -> Vec<&'a str> {
        if close == open + 1 {
            return Vec::new();
        }
        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start = self.tokens[open].end;
        for token in &self.tokens[open + 1..close] {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => {
                    args.push(self.src[start..token.start].trim());
                    start = token.end;
                }
                _ => {}
            }
        }
        args.push(self.src[start..self.tokens[close].start].trim());
        args
    }

    /// Recognise `name(...)` covering the entire input.
    fn call(&self) -> Option<Call<'a>> {
        if self.kind(0) != Some(TokenKind::Name) || self.kind(1) != Some(TokenKind::LParen) {
            return None;
        }
        let close = self.matching_paren(1)?;
        if close != self.tokens.len() - 1 {
            return None;
        }
        Some(Call {
            name: self.text(&self.tokens[0]),
            args: self.args_between(1, close),
        })
    }

    fn function_call(&self, current_path: &str, depth: usize) -> Option<ConditionExpression> {
        let call = self.call()?;
        let name = FunctionName::from_name(call.name)?;
        let args = call
            .args
            .iter()
            .map(|arg| condition_from(strip_quotes(arg), current_path, depth))
            .collect();
        Some(ConditionExpression::FunctionCall { name, args })
    }

    fn conditional(&self, current_path: &str, depth: usize) -> Option<ConditionExpression> {
        let call = self.call()?;
        if call.name != "if" || call.args.len() != 3 {
            return None;
        }
        Some(ConditionExpression::Conditional {
            test: boolean_from(call.args[0], current_path, depth),
            when_true: Box::new(condition_from(strip_quotes(call.args[1]), current_path, depth)),
            when_false: Box::new(condition_from(strip_quotes(call.args[2]), current_path, depth)),
        })
    }

    fn select_or_regex(&self, current_path: &str) -> Option<ConditionExpression> {
        let call = self.call()?;
        let op = match call.name {
            "selected" => MatchOp::Selected,
            "regex" => MatchOp::Regex,
            _ => return None,
        };
        if call.args.len() != 2 {
            return None;
        }
        Some(ConditionExpression::SelectOrRegex {
            op,
            path: path::resolve(strip_quotes(call.args[0]), current_path),
            value: strip_quotes(call.args[1]).to_string(),
        })
    }

    fn comparison(&self, current_path: &str) -> Option<ConditionExpression> {
        let mut depth = 0usize;
        let op_idx = self.tokens.iter().position(|token| {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            depth == 0 && token.kind == TokenKind::Op
        })?;
        let op = &self.tokens[op_idx];
        let lhs = self.src[..op.start].trim();
        let rhs = self.src[op.end..].trim();
        if lhs.is_empty() || rhs.is_empty() {
            return None;
        }

        let (operand, wrapper_function) = match self.wrapped_operand(op_idx) {
            Some((func, inner)) => (inner, Some(func.to_string())),
            None => (lhs, None),
        };
        let operand = strip_quotes(operand);
        let path = if operand.is_empty() {
            String::new()
        } else {
            path::resolve(operand, current_path)
        };

        Some(ConditionExpression::Comparison {
            op: self.text(op).to_string(),
            path,
            value: strip_quotes(rhs).to_string(),
            wrapper_function,
        })
    }

    /// `func(inner)` occupying exactly the tokens before `op_idx`.
    fn wrapped_operand(&self, op_idx: usize) -> Option<(&'a str, &'a str)> {
        if op_idx < 3
            || self.kind(0) != Some(TokenKind::Name)
            || self.kind(1) != Some(TokenKind::LParen)
        {
            return None;
        }
        let close = self.matching_paren(1)?;
        if close != op_idx - 1 {
            return None;
        }
        let args = self.args_between(1, close);
        match args.as_slice() {
            [] => Some((self.text(&self.tokens[0]), "")),
            [inner] => Some((self.text(&self.tokens[0]), *inner)),
            _ => None,
        }
    }

    /// Byte ranges of `[lo, hi)` separated by the top-level word `word`.
    fn split_top_level(&self, lo: usize, hi: usize, word: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut depth = 0usize;
        let mut start = lo;
        for token in self
            .tokens
            .iter()
            .filter(|token| token.start >= lo && token.end <= hi)
        {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Name if depth == 0 && self.text(token) == word => {
                    ranges.push((start, token.start));
                    start = token.end;
                }
                _ => {}
            }
        }
        ranges.push((start, hi));
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::trace;

    fn comparison(op: &str, path: &str, value: &str) -> ConditionExpression {
        ConditionExpression::Comparison {
            op: op.into(),
            path: path.into(),
            value: value.into(),
            wrapper_function: None,
        }
    }

    #[test]
    fn selected_resolves_parent_path() {
        let expr = parse_condition("selected(../choice, 'yes')", "/a/b");
        assert_eq!(
            expr,
            ConditionExpression::SelectOrRegex {
                op: MatchOp::Selected,
                path: "/a/choice".into(),
                value: "yes".into(),
            }
        );
    }

    #[test]
    fn regex_uses_tilde() {
        let expr = parse_condition(r#"regex(., "^[0-9]{3}$")"#, "/data/code");
        match expr {
            ConditionExpression::SelectOrRegex { op, path, value } => {
                assert_eq!(op.symbol(), "~");
                assert_eq!(path, "/data/code");
                assert_eq!(value, "^[0-9]{3}$");
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    #[test]
    fn conditional_with_single_conjunct_test() {
        let expr = parse_condition("if(x=1, 'a', 'b')", "/a/b");
        trace!(?expr, "parsed conditional");
        let ConditionExpression::Conditional {
            test,
            when_true,
            when_false,
        } = expr
        else {
            panic!("expected conditional");
        };
        assert_eq!(
            test.disjuncts,
            vec![Disjunct::Single(comparison("=", "/a/b/x", "1"))]
        );
        assert_eq!(*when_true, ConditionExpression::Literal("a".into()));
        assert_eq!(*when_false, ConditionExpression::Literal("b".into()));
    }

    #[test]
    fn concat_arguments_are_parsed_recursively() {
        let expr = parse_condition("concat('Hello ', /data/name, if(. > 3, 'x', 'y'))", "/data/greeting");
        let ConditionExpression::FunctionCall { name, args } = expr else {
            panic!("expected function call");
        };
        assert_eq!(name, FunctionName::Concat);
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], ConditionExpression::Literal("Hello ".into()));
        assert_eq!(args[1], ConditionExpression::Literal("/data/name".into()));
        assert!(matches!(args[2], ConditionExpression::Conditional { .. }));
    }

    #[test]
    fn uuid_without_arguments() {
        let expr = parse_condition("uuid()", "/data/id");
        assert_eq!(
            expr,
            ConditionExpression::FunctionCall {
                name: FunctionName::Uuid,
                args: Vec::new(),
            }
        );
    }

    #[test]
    fn comparison_with_wrapper_function() {
        let expr = parse_condition("string-length(.) >= 3", "/data/name");
        assert_eq!(
            expr,
            ConditionExpression::Comparison {
                op: ">=".into(),
                path: "/data/name".into(),
                value: "3".into(),
                wrapper_function: Some("string-length".into()),
            }
        );
    }

    #[test]
    fn not_equal_operator() {
        let expr = parse_condition(". != ''", "/data/name");
        assert_eq!(expr, comparison("!=", "/data/name", ""));
    }

    #[test]
    fn unrecognised_input_is_literal() {
        let expr = parse_condition("/data/a + /data/b", "/data/sum");
        assert_eq!(expr, ConditionExpression::Literal("/data/a + /data/b".into()));
        let expr = parse_condition("once('unterminated)", "/data/x");
        assert!(expr.is_literal());
    }

    #[test]
    fn boolean_or_of_and_groups() {
        let group = parse_boolean(
            "/data/age > 18 and selected(/data/consent, 'yes') or /data/override = 'true'",
            "/data/q",
        );
        assert_eq!(group.disjuncts.len(), 2);
        match &group.disjuncts[0] {
            Disjunct::All(terms) => {
                assert_eq!(terms[0], comparison(">", "/data/age", "18"));
                assert!(matches!(terms[1], ConditionExpression::SelectOrRegex { .. }));
            }
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert_eq!(
            group.disjuncts[1],
            Disjunct::Single(comparison("=", "/data/override", "true"))
        );
        assert!(!group.has_unparsed_terms());
    }

    #[test]
    fn quoted_and_or_do_not_split() {
        let group = parse_boolean(". = 'black and white'", "/data/color");
        assert_eq!(
            group.disjuncts,
            vec![Disjunct::Single(comparison("=", "/data/color", "black and white"))]
        );
    }

    #[test]
    fn parenthesised_terms_become_groups() {
        let group = parse_boolean("(../a = 1 or ../b = 2) and . > 0", "/data/g/c");
        let Disjunct::All(terms) = &group.disjuncts[0] else {
            panic!("expected conjunction");
        };
        let ConditionExpression::Group(inner) = &terms[0] else {
            panic!("expected nested group");
        };
        assert_eq!(inner.disjuncts.len(), 2);
        let paths = terms[0].referenced_paths();
        assert_eq!(paths, vec!["/data/g/a", "/data/g/b"]);
    }

    #[test]
    fn referenced_paths_are_deduplicated() {
        let expr = parse_condition("if(selected(/data/a, 'x') and /data/a != '', 'y', 'z')", "/data/b");
        assert_eq!(expr.referenced_paths(), vec!["/data/a"]);
    }

    #[test]
    fn display_renders_canonical_form() {
        let group = parse_boolean("selected(../c, 'y') and . < 5", "/d/q");
        assert_eq!(group.to_string(), "selected(/d/c, 'y') and /d/q < '5'");
    }

    #[test]
    fn deep_nesting_is_kept_as_literal() {
        let deep = format!("{}'x'{}", "concat(".repeat(20_000), ")".repeat(20_000));
        let expr = parse_condition(&deep, "/d/q");
        assert!(expr.is_literal());

        let deep = format!("{}. = 1{}", "(".repeat(20_000), ")".repeat(20_000));
        let group = parse_boolean(&deep, "/d/q");
        assert!(group.has_unparsed_terms());

        let deep = format!("{}'x'{}", "if(. = 1, ".repeat(5_000), ", 'y')".repeat(5_000));
        assert!(parse_condition(&deep, "/d/q").is_literal());
    }

    #[test]
    fn nesting_within_limit_is_parsed() {
        let inner = format!("{}'x'{}", "concat(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        let expr = parse_condition(&inner, "/d/q");
        assert!(matches!(expr, ConditionExpression::FunctionCall { .. }));

        let over = format!("concat({inner})");
        assert!(parse_condition(&over, "/d/q").is_literal());
    }

    #[test]
    fn entity_text_is_not_decoded_again() {
        let expr = parse_condition(". = '&lt;'", "/d/q");
        assert_eq!(expr, comparison("=", "/d/q", "&lt;"));
    }

    #[test]
    fn strip_quotes_only_matching_pairs() {
        assert_eq!(strip_quotes(" 'a' "), "a");
        assert_eq!(strip_quotes("\"b\""), "b");
        assert_eq!(strip_quotes("'c\""), "'c\"");
        assert_eq!(strip_quotes("'"), "'");
    }
}
