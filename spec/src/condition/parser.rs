//! English condition parser
//!
//! Transforms one free-form condition sentence of the standard
//! (e.g. _"Required if Image Type (0008,0008) Value 3 is GATED,
//! GATED TOMO, or RECON GATED TOMO. May be present otherwise."_)
//! into a [`Condition`].
//!
//! The parser is resilient by construction:
//! text which cannot be recognized as a condition
//! degrades to a [user defined](ConditionKind::UserDefined) condition
//! and never produces an error.
//! Within a sentence,
//! a disjunction drops clauses it cannot verify,
//! while a conjunction with an unverifiable clause
//! degrades as a whole.
use dicom_core::Tag;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::condition::{AttributeTest, Condition, ConditionKind, Operator, Predicate};
use crate::dictionary::{find_tag_literal, DictionaryIndex};

/// How the text following an operator phrase is interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ValueRule {
    /// The operator takes no values.
    None,
    /// A list of literals follows.
    List,
    /// A single numeric literal follows (`zero` reads as `0`).
    Numeric,
    /// An attribute reference follows,
    /// encoded as the packed 32-bit tag in decimal.
    TagPointer,
    /// The operator implies a fixed value.
    Implied(&'static str),
}

struct OperatorPhrase {
    phrase: &'static str,
    op: Operator,
    rule: ValueRule,
}

const fn phrase(phrase: &'static str, op: Operator, rule: ValueRule) -> OperatorPhrase {
    OperatorPhrase { phrase, op, rule }
}

/// Operator alias table.
/// Matching picks the earliest position where any phrase matches
/// on a word boundary, and the longest phrase at that position.
static OPERATOR_PHRASES: &[OperatorPhrase] = &[
    phrase("is present and has a value of", Operator::EqualTo, ValueRule::List),
    phrase("is present and the value is", Operator::EqualTo, ValueRule::List),
    phrase("is present with a value of", Operator::EqualTo, ValueRule::List),
    phrase("is present and has a value", Operator::NotEmpty, ValueRule::None),
    phrase("is one of the following", Operator::EqualTo, ValueRule::List),
    phrase("has a value of more than", Operator::GreaterThan, ValueRule::Numeric),
    phrase("has a value greater than", Operator::GreaterThan, ValueRule::Numeric),
    phrase("has a value of", Operator::EqualTo, ValueRule::List),
    phrase("has a value", Operator::NotEmpty, ValueRule::None),
    phrase("is greater than", Operator::GreaterThan, ValueRule::Numeric),
    phrase("greater than", Operator::GreaterThan, ValueRule::Numeric),
    phrase("is less than", Operator::LessThan, ValueRule::Numeric),
    phrase("less than", Operator::LessThan, ValueRule::Numeric),
    phrase("is not equal to", Operator::NotEqualTo, ValueRule::List),
    phrase("is equal to", Operator::EqualTo, ValueRule::List),
    phrase("equals other than", Operator::NotEqualTo, ValueRule::List),
    phrase("equals", Operator::EqualTo, ValueRule::List),
    phrase("is other than", Operator::NotEqualTo, ValueRule::List),
    phrase("other than", Operator::NotEqualTo, ValueRule::List),
    phrase("is not present", Operator::Absent, ValueRule::None),
    phrase("are not present", Operator::Absent, ValueRule::None),
    phrase("is not sent", Operator::Absent, ValueRule::None),
    phrase("is absent", Operator::Absent, ValueRule::None),
    phrase("are present", Operator::Present, ValueRule::None),
    phrase("is present", Operator::Present, ValueRule::None),
    phrase("is sent", Operator::Present, ValueRule::None),
    phrase("is non-null", Operator::NotEmpty, ValueRule::None),
    phrase("is non-zero length", Operator::NotEqualTo, ValueRule::Implied("")),
    phrase("is not zero length", Operator::NotEqualTo, ValueRule::Implied("")),
    phrase("is non-zero", Operator::GreaterThan, ValueRule::Implied("0")),
    phrase("is zero-length", Operator::EqualTo, ValueRule::Implied("")),
    phrase("is zero length", Operator::EqualTo, ValueRule::Implied("")),
    phrase("is set to", Operator::EqualTo, ValueRule::List),
    phrase("is not", Operator::NotEqualTo, ValueRule::List),
    phrase("points to", Operator::PointsTo, ValueRule::TagPointer),
    phrase("is", Operator::EqualTo, ValueRule::List),
    phrase("=", Operator::EqualTo, ValueRule::List),
];

static CONDITION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:required\s+(?:only\s+)?if|shall\s+be\s+present\s+if|required\s+for\s+images\s+where)\s+",
    )
    .expect("invalid condition prefix pattern")
});

static OTHER_CONDITION_INTRO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:otherwise\s+)?(?:only\s+)?if\s+(.+)$")
        .expect("invalid other-condition pattern")
});

static VALUE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^,?\s*value\s+(\d+)").expect("invalid value index pattern")
});

/// Intermediate parse tree.
/// `Pending` marks a listed attribute which still awaits the shared
/// operator of its group; `Invalid` marks an unverifiable clause.
#[derive(Debug, Clone)]
enum Node {
    Test(AttributeTest),
    Pending { tag: Tag, index: usize },
    All(Vec<Node>),
    Any(Vec<Node>),
    Invalid,
}

/// Parses condition sentences against an attribute dictionary.
#[derive(Debug, Copy, Clone)]
pub struct ConditionParser<'d> {
    dict: &'d DictionaryIndex,
}

impl<'d> ConditionParser<'d> {
    /// Create a parser over the given dictionary index.
    pub fn new(dict: &'d DictionaryIndex) -> Self {
        ConditionParser { dict }
    }

    /// Parse one condition sentence.
    ///
    /// This never fails:
    /// unrecognizable text yields a
    /// [user defined](ConditionKind::UserDefined) condition.
    pub fn parse(&self, text: &str) -> Condition {
        let text = collapse_whitespace(text);
        let Some(rest) = strip_condition_prefix(&text) else {
            return Condition::user_defined();
        };

        let (mandatory, tail) = split_may_be_present(rest);
        let predicate = self.parse_predicate(mandatory);
        if !predicate.is_determinate() {
            tracing::debug!("condition degraded to user defined: {:?}", text);
            return Condition::user_defined();
        }

        let Some(tail) = tail else {
            return Condition {
                kind: ConditionKind::MandatoryOrNotAllowed,
                predicate,
                other_condition: None,
            };
        };

        if let Some(captures) = OTHER_CONDITION_INTRO.captures(tail) {
            let other = self.parse_predicate(&captures[1]);
            if other.is_determinate() {
                return Condition {
                    kind: ConditionKind::MandatoryOrConditional,
                    predicate,
                    other_condition: Some(other),
                };
            }
        }
        Condition {
            kind: ConditionKind::MandatoryOrUser,
            predicate,
            other_condition: None,
        }
    }

    /// Parse a full condition expression into a normalized tree.
    fn parse_predicate(&self, text: &str) -> Predicate {
        normalize(self.parse_expression(text))
    }

    /// Conjunction level: split on `and` connectives.
    fn parse_expression(&self, text: &str) -> Node {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();
        let separators = find_separators(&lower, Connective::And);
        if separators.is_empty() {
            return self.parse_or_group(text);
        }

        let clauses = self.assemble_clauses(text, &lower, &separators);
        let mut nodes: Vec<Node> = clauses
            .into_iter()
            .map(|clause| match clause {
                Clause::Plain(range) => self.parse_or_group(&text[range]),
                Clause::Nested(range) => self.parse_nested(&text[range]),
            })
            .collect();
        distribute_shared_operator(&mut nodes);
        match nodes.len() {
            0 => Node::Invalid,
            1 => nodes.remove(0),
            _ => Node::All(nodes),
        }
    }

    /// Disjunction level: split on `or` connectives.
    fn parse_or_group(&self, text: &str) -> Node {
        let text = text.trim();
        let text = strip_nested_intro(text).unwrap_or(text);
        let lower = text.to_ascii_lowercase();
        let separators = find_separators(&lower, Connective::Or);
        if separators.is_empty() {
            return self.parse_atom(text);
        }

        let clauses = self.assemble_clauses(text, &lower, &separators);
        let mut nodes: Vec<Node> = clauses
            .into_iter()
            .map(|clause| match clause {
                Clause::Plain(range) => self.parse_atom(&text[range]),
                Clause::Nested(range) => self.parse_nested(&text[range]),
            })
            .collect();
        distribute_shared_operator(&mut nodes);
        match nodes.len() {
            0 => Node::Invalid,
            1 => nodes.remove(0),
            _ => Node::Any(nodes),
        }
    }

    /// A sub-expression introduced by `if` or `either`.
    fn parse_nested(&self, text: &str) -> Node {
        let text = text.trim();
        let text = strip_nested_intro(text).unwrap_or(text);
        self.parse_expression(text)
    }

    /// Walk the connective separators of a clause group,
    /// deciding for each following chunk
    /// whether it opens a new clause,
    /// continues the current one,
    /// or hands the remaining text to a nested sub-expression.
    fn assemble_clauses(
        &self,
        text: &str,
        lower: &str,
        separators: &[Separator],
    ) -> Vec<Clause> {
        let value_mode = find_operator(&lower[..separators[0].pos]).is_some();
        let mut clauses = Vec::new();
        let mut current_start = 0;

        for (i, sep) in separators.iter().enumerate() {
            if sep.pos < current_start {
                // separator swallowed by an earlier glue decision
                continue;
            }
            let chunk_start = sep.pos + sep.len;
            if sep.nested {
                clauses.push(Clause::Plain(current_start..sep.pos));
                clauses.push(Clause::Nested(chunk_start..text.len()));
                return clauses;
            }
            let chunk_end = separators[i + 1..]
                .iter()
                .map(|s| s.pos)
                .find(|&p| p >= chunk_start)
                .unwrap_or(text.len());
            match self.classify_chunk(&text[chunk_start..chunk_end], value_mode) {
                ChunkClass::Boundary => {
                    clauses.push(Clause::Plain(current_start..sep.pos));
                    current_start = chunk_start;
                }
                ChunkClass::Glue => {}
                ChunkClass::NestedRest => {
                    clauses.push(Clause::Plain(current_start..sep.pos));
                    clauses.push(Clause::Nested(chunk_start..text.len()));
                    return clauses;
                }
            }
        }
        clauses.push(Clause::Plain(current_start..text.len()));
        clauses
    }

    /// Decide how the text following a connective relates to its group.
    fn classify_chunk(&self, chunk: &str, value_mode: bool) -> ChunkClass {
        let chunk = chunk.trim();
        let lower = chunk.to_ascii_lowercase();
        if strip_nested_intro(chunk).is_some() {
            return ChunkClass::NestedRest;
        }
        if starts_with_operator(&lower) {
            // e.g. "… is present *and has a value of* YES"
            return ChunkClass::Glue;
        }

        let subject_end = find_operator(&lower).map(|(pos, _)| pos).unwrap_or(chunk.len());
        let has_operator = subject_end < chunk.len();
        if let Some((_, consumed)) = self.resolve_reference(&chunk[..subject_end]) {
            if has_operator {
                return ChunkClass::Boundary;
            }
            let rest = chunk[consumed..].trim_matches(is_clause_punctuation);
            if rest.is_empty() && value_mode {
                // a bare attribute reference continues a value list
                return ChunkClass::Glue;
            }
            return ChunkClass::Boundary;
        }

        match chunk.chars().find(|c| c.is_alphanumeric()) {
            // looks like another value literal
            Some(c) if c.is_uppercase() || c.is_ascii_digit() => ChunkClass::Glue,
            _ => ChunkClass::Boundary,
        }
    }

    /// Parse a single clause into an attribute test.
    fn parse_atom(&self, text: &str) -> Node {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();
        let operator = find_operator(&lower);
        let subject_end = operator.map(|(pos, _)| pos).unwrap_or(text.len());

        let Some((tag, consumed)) = self.resolve_reference(&text[..subject_end]) else {
            tracing::debug!("no resolvable attribute in clause: {:?}", text);
            return Node::Invalid;
        };
        let (index, index_len) = match_value_index(&text[consumed..subject_end]);

        let Some((op_pos, op)) = operator else {
            let rest = text[consumed + index_len..].trim_matches(is_clause_punctuation);
            if rest.is_empty() {
                return Node::Pending { tag, index };
            }
            return Node::Invalid;
        };

        let value_text = &text[op_pos + op.phrase.len()..];
        match op.rule {
            ValueRule::None => Node::Test(AttributeTest {
                tag,
                index,
                op: op.op,
                values: Vec::new(),
            }),
            ValueRule::Implied(value) => Node::Test(AttributeTest {
                tag,
                index,
                op: op.op,
                values: vec![value.to_owned()],
            }),
            ValueRule::Numeric => match parse_numeric_value(value_text) {
                Some(value) => Node::Test(AttributeTest {
                    tag,
                    index,
                    op: op.op,
                    values: vec![value],
                }),
                None => Node::Invalid,
            },
            ValueRule::TagPointer => match self.resolve_reference(value_text) {
                Some((target, _)) => Node::Test(AttributeTest {
                    tag,
                    index,
                    op: op.op,
                    values: vec![encode_tag_pointer(target)],
                }),
                None => Node::Invalid,
            },
            ValueRule::List => match parse_value_list(value_text) {
                Some(values) => Node::Test(AttributeTest {
                    tag,
                    index,
                    op: op.op,
                    values,
                }),
                None => {
                    tracing::debug!("no parseable values in clause: {:?}", text);
                    Node::Invalid
                }
            },
        }
    }

    /// Resolve the attribute referenced at the start of a clause subject.
    ///
    /// A `(GGGG,EEEE)` literal anywhere in the subject wins;
    /// otherwise the longest resolvable run of capitalized words is taken.
    /// Returns the tag and the number of bytes consumed.
    fn resolve_reference(&self, subject: &str) -> Option<(Tag, usize)> {
        if let Some((tag, range)) = find_tag_literal(subject) {
            if self.dict.entry(tag).is_some() {
                return Some((tag, range.end));
            }
            tracing::debug!("tag {} in condition is not in the dictionary", tag);
            return None;
        }

        let tokens = tokenize(subject);
        for i in 0..tokens.len() {
            let first = &subject[tokens[i].clone()];
            if !first
                .chars()
                .next()
                .map(|c| c.is_uppercase() || c.is_ascii_digit())
                .unwrap_or(false)
            {
                continue;
            }
            for j in (i + 1..=tokens.len()).rev() {
                let candidate = &subject[tokens[i].start..tokens[j - 1].end];
                if let Some(tag) = self.dict.tag_by_name(candidate) {
                    return Some((tag, tokens[j - 1].end));
                }
            }
        }
        None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone)]
struct Separator {
    pos: usize,
    len: usize,
    /// whether the separator itself introduces a sub-expression
    /// (`", and if "`)
    nested: bool,
}

#[derive(Debug, Clone)]
enum Clause {
    Plain(std::ops::Range<usize>),
    Nested(std::ops::Range<usize>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ChunkClass {
    Boundary,
    Glue,
    NestedRest,
}

/// Find the connective separators of one level.
///
/// At the `and` level a bare `", "` also separates,
/// except when it precedes a connective or a `Value N` phrase.
fn find_separators(lower: &str, connective: Connective) -> Vec<Separator> {
    let mut separators = Vec::new();
    let mut i = 0;
    while i < lower.len() {
        let rest = &lower[i..];
        let advance = match connective {
            Connective::And => {
                if rest.starts_with(", and if ") {
                    separators.push(Separator { pos: i, len: 9, nested: true });
                    9
                } else if rest.starts_with(" and if ") {
                    separators.push(Separator { pos: i, len: 8, nested: true });
                    8
                } else if rest.starts_with(", and ") {
                    separators.push(Separator { pos: i, len: 6, nested: false });
                    6
                } else if rest.starts_with(" and ") {
                    separators.push(Separator { pos: i, len: 5, nested: false });
                    5
                } else if rest.starts_with(", ") {
                    let after = &rest[2..];
                    if !(after.starts_with("and") || after.starts_with("or") || after.starts_with("value")) {
                        separators.push(Separator { pos: i, len: 2, nested: false });
                    }
                    2
                } else {
                    1
                }
            }
            Connective::Or => {
                if rest.starts_with(", or ") {
                    separators.push(Separator { pos: i, len: 5, nested: false });
                    5
                } else if rest.starts_with(" or ") {
                    separators.push(Separator { pos: i, len: 4, nested: false });
                    4
                } else {
                    1
                }
            }
        };
        i += advance;
    }
    separators
}

/// Fill listed attributes which have no operator of their own
/// with the operator and values of the final clause of their group.
fn distribute_shared_operator(nodes: &mut [Node]) {
    let Some((last, rest)) = nodes.split_last_mut() else {
        return;
    };
    let Node::Test(test) = last else {
        return;
    };
    if test.op == Operator::Unverifiable {
        return;
    }
    let (op, values) = (test.op, test.values.clone());
    for node in rest {
        fill_pending(node, op, &values);
    }
}

fn fill_pending(node: &mut Node, op: Operator, values: &[String]) {
    match node {
        Node::Pending { tag, index } => {
            *node = Node::Test(AttributeTest {
                tag: *tag,
                index: *index,
                op,
                values: values.to_vec(),
            });
        }
        Node::All(children) | Node::Any(children) => {
            for child in children {
                fill_pending(child, op, values);
            }
        }
        _ => {}
    }
}

/// Turn the intermediate tree into a normalized [`Predicate`]:
/// a conjunction with an unverifiable clause degrades as a whole,
/// while a disjunction drops unverifiable clauses.
fn normalize(node: Node) -> Predicate {
    match node {
        Node::Test(test) => Predicate::Test(test),
        Node::Pending { .. } | Node::Invalid => Predicate::Undetermined,
        Node::All(children) => {
            let mut normalized = Vec::with_capacity(children.len());
            for child in children {
                match normalize(child) {
                    Predicate::Undetermined => return Predicate::Undetermined,
                    predicate => normalized.push(predicate),
                }
            }
            match normalized.len() {
                0 => Predicate::Undetermined,
                1 => normalized.remove(0),
                _ => Predicate::AllOf(normalized),
            }
        }
        Node::Any(children) => {
            let mut normalized: Vec<_> = children
                .into_iter()
                .map(normalize)
                .filter(|p| !matches!(p, Predicate::Undetermined))
                .collect();
            match normalized.len() {
                0 => Predicate::Undetermined,
                1 => normalized.remove(0),
                _ => Predicate::AnyOf(normalized),
            }
        }
    }
}

/// Cut the text after the first recognized condition prefix.
fn strip_condition_prefix(text: &str) -> Option<&str> {
    CONDITION_PREFIX.find(text).map(|m| &text[m.end()..])
}

/// Split the mandatory clause from a _"may be present …"_ tail.
///
/// Tolerates a period with or without a following space
/// and a comma in place of the period.
fn split_may_be_present(text: &str) -> (&str, Option<&str>) {
    let lower = text.to_ascii_lowercase();
    match lower.find("may be present") {
        Some(pos) => {
            let mandatory = text[..pos].trim_end().trim_end_matches(['.', ',']);
            (mandatory, Some(&text[pos + "may be present".len()..]))
        }
        None => (text, None),
    }
}

/// Strip a leading `if`/`either` which introduces a sub-expression.
fn strip_nested_intro(text: &str) -> Option<&str> {
    let lower = text.get(..7).map(str::to_ascii_lowercase).unwrap_or_else(|| text.to_ascii_lowercase());
    if lower.starts_with("if ") {
        Some(&text[3..])
    } else if lower.starts_with("either ") {
        Some(&text[7..])
    } else {
        None
    }
}

/// Whether a chunk starts with an operator phrase,
/// possibly behind light noise such as `"the value is …"`.
fn starts_with_operator(lower_chunk: &str) -> bool {
    let mut probe = lower_chunk.trim_start();
    loop {
        if operator_at_start(probe) {
            return true;
        }
        let stripped = if let Some(rest) = probe.strip_prefix("the ") {
            rest
        } else if let Some(rest) = probe.strip_prefix("its ") {
            rest
        } else if let Some(rest) = probe.strip_prefix("value ") {
            // keep "Value N" phrases intact
            if rest.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
                return false;
            }
            rest
        } else if let Some(rest) = probe.strip_prefix("values ") {
            rest
        } else {
            return false;
        };
        probe = stripped.trim_start();
    }
}

fn operator_at_start(lower: &str) -> bool {
    OPERATOR_PHRASES.iter().any(|p| {
        lower.starts_with(p.phrase)
            && lower.as_bytes().get(p.phrase.len()).map(|&b| !is_word_byte(b)).unwrap_or(true)
    })
}

/// Earliest word-bounded operator phrase; longest wins at equal position.
fn find_operator(lower: &str) -> Option<(usize, &'static OperatorPhrase)> {
    let bytes = lower.as_bytes();
    for i in 0..lower.len() {
        if i > 0 && is_word_byte(bytes[i - 1]) {
            continue;
        }
        let mut best: Option<&'static OperatorPhrase> = None;
        for p in OPERATOR_PHRASES {
            if lower[i..].starts_with(p.phrase)
                && bytes.get(i + p.phrase.len()).map(|&b| !is_word_byte(b)).unwrap_or(true)
                && best.map(|b| p.phrase.len() > b.phrase.len()).unwrap_or(true)
            {
                best = Some(p);
            }
        }
        if let Some(p) = best {
            return Some((i, p));
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\u{201C}' || c == '\u{201D}'
}

fn is_clause_punctuation(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | ':' | ';')
}

/// Match a `Value N` phrase right after an attribute reference.
/// Returns the zero based index and the bytes consumed.
fn match_value_index(rest: &str) -> (usize, usize) {
    match VALUE_INDEX.captures(rest) {
        Some(captures) => {
            let number: usize = captures[1].parse().unwrap_or(1);
            let end = captures.get(0).map(|m| m.end()).unwrap_or(0);
            (number.saturating_sub(1), end)
        }
        None => (0, 0),
    }
}

/// Offsets of whitespace-delimited tokens.
fn tokenize(text: &str) -> Vec<std::ops::Range<usize>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(s..i);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(s..text.len());
    }
    tokens
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space && !out.is_empty() {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// The packed 32-bit form of a tag, as decimal text.
fn encode_tag_pointer(tag: Tag) -> String {
    (((tag.group() as u32) << 16) | tag.element() as u32).to_string()
}

/// Parse the single numeric literal of a `greater than`/`less than` clause.
fn parse_numeric_value(text: &str) -> Option<String> {
    let token = text
        .trim_start_matches(|c: char| c.is_whitespace() || c == ':')
        .split_whitespace()
        .next()?;
    let token = token.trim_end_matches(is_clause_punctuation);
    if token.eq_ignore_ascii_case("zero") {
        return Some("0".to_owned());
    }
    if token.parse::<f64>().is_ok() {
        Some(token.to_owned())
    } else {
        None
    }
}

/// Parse a value list such as `V`, `V or V`, `V, V, or V`, `V, V, and V`.
///
/// Quoted content wins over surrounding words;
/// parenthesized explanations are dropped
/// unless the parenthesis is a tag literal;
/// the list is truncated at the first candidate
/// which does not look like a literal,
/// and an empty outcome means the clause is unverifiable.
fn parse_value_list(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    let text = text.strip_prefix(':').unwrap_or(text).trim_start();

    let mut values = Vec::new();
    for piece in split_value_list(text) {
        match clean_value(piece) {
            Some(value) => values.push(value),
            None => break,
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Split a value list on its separators, ignoring quoted regions.
fn split_value_list(text: &str) -> Vec<&str> {
    const SEPARATORS: [&str; 5] = [", and ", ", or ", " and ", " or ", ", "];
    let lower = text.to_ascii_lowercase();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut in_quotes = false;
    'scan: while i < text.len() {
        let c = match text[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if is_quote(c) {
            in_quotes = !in_quotes;
            i += c.len_utf8();
            continue;
        }
        if !in_quotes {
            for sep in SEPARATORS {
                if lower[i..].starts_with(sep) {
                    pieces.push(&text[start..i]);
                    start = i + sep.len();
                    i = start;
                    continue 'scan;
                }
            }
        }
        i += c.len_utf8();
    }
    pieces.push(&text[start..]);
    pieces
}

/// Clean one value candidate, or reject it.
fn clean_value(piece: &str) -> Option<String> {
    let piece = piece.trim().trim_end_matches(is_clause_punctuation);
    if piece.chars().any(is_quote) {
        return extract_quoted(piece);
    }
    let piece = strip_explanation(piece);
    let piece = piece.trim().trim_end_matches(is_clause_punctuation);
    let first = piece.chars().next()?;
    if first.is_uppercase() || first.is_ascii_digit() {
        Some(piece.to_owned())
    } else {
        None
    }
}

/// The content of the first quoted region.
fn extract_quoted(piece: &str) -> Option<String> {
    let mut chars = piece.char_indices();
    let (open, c) = chars.find(|(_, c)| is_quote(*c))?;
    let start = open + c.len_utf8();
    let (close, _) = piece[start..]
        .char_indices()
        .find(|(_, c)| is_quote(*c))
        .map(|(i, c)| (start + i, c))?;
    Some(piece[start..close].to_owned())
}

/// Drop a parenthesized explanation such as `"DF (Digitized Film)"`,
/// keeping tag literals such as `"Frame Time (0018,1063)"` intact.
fn strip_explanation(piece: &str) -> &str {
    let Some(open) = piece.find('(') else {
        return piece;
    };
    let Some(close_rel) = piece[open..].find(')') else {
        return piece;
    };
    let close = open + close_rel;
    if find_tag_literal(&piece[open..=close]).is_some() {
        return piece;
    }
    // explanations only trail the literal value
    piece[..open].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_matching_is_word_bounded() {
        // "is" inside "Display" must not match
        let lower = "fractional channel display scale is not present";
        let (pos, op) = find_operator(lower).expect("operator expected");
        assert_eq!(&lower[pos..pos + op.phrase.len()], "is not present");
        assert_eq!(op.op, Operator::Absent);
    }

    #[test]
    fn longest_phrase_wins_at_position() {
        let (_, op) = find_operator("is present and has a value of yes").expect("operator");
        assert_eq!(op.op, Operator::EqualTo);
        let (_, op) = find_operator("is present and has a value.").expect("operator");
        assert_eq!(op.op, Operator::NotEmpty);
        let (_, op) = find_operator("is non-zero length.").expect("operator");
        assert_eq!(op.op, Operator::NotEqualTo);
        let (_, op) = find_operator("is non-zero.").expect("operator");
        assert_eq!(op.op, Operator::GreaterThan);
    }

    #[test]
    fn value_list_splitting_respects_quotes() {
        let pieces = split_value_list(r#""A or B" or C"#);
        assert_eq!(pieces, vec![r#""A or B""#, "C"]);
    }

    #[test]
    fn value_cleaning() {
        assert_eq!(clean_value("DF (Digitized Film)."), Some("DF".to_owned()));
        assert_eq!(
            clean_value("Frame Time (0018,1063)"),
            Some("Frame Time (0018,1063)".to_owned())
        );
        assert_eq!(clean_value("\u{201C}01\u{201D}."), Some("01".to_owned()));
        assert_eq!(clean_value("nested in sequences"), None);
        assert_eq!(clean_value(""), None);
    }

    #[test]
    fn numeric_values() {
        assert_eq!(parse_numeric_value(" 1."), Some("1".to_owned()));
        assert_eq!(parse_numeric_value(" zero"), Some("0".to_owned()));
        assert_eq!(parse_numeric_value(" many"), None);
    }

    #[test]
    fn tag_pointer_encoding() {
        assert_eq!(encode_tag_pointer(Tag(0x0018, 0x2002)), "1581058");
    }

    #[test]
    fn value_index_phrases() {
        assert_eq!(match_value_index(" Value 3 is"), (2, 8));
        assert_eq!(match_value_index(", Value 2 is"), (1, 9));
        assert_eq!(match_value_index(" is present"), (0, 0));
    }
}
