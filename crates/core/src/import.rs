//! Line-oriented word list parser.
//!
//! The import format is a hierarchy of markers followed by term pairs:
//!
//! ```text
//! TABLE: Book 1
//! UNIT: Animals
//! CATEGORY: Pets
//! cat - mushuk
//! dog - it
//! ```
//!
//! - Markers are matched on the trimmed line, keyword case-insensitive and
//!   followed by `:`. `TABLE:` may omit its name; `UNIT:` and `CATEGORY:` need a
//!   non-empty label, otherwise the line is treated as a term pair.
//! - Blank lines and lines starting with `#` or `//` are skipped.
//! - A term pair is split on the first delimiter present, tried in order:
//!   `" - "`, `" – "`, `" — "`, tab. It must produce exactly two non-empty terms.
//!
//! Parsing never fails as a whole: each bad line is reported with its 1-based
//! line number and scanning continues with the next line.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::Word;

const TABLE_MARKER: &str = "TABLE";
const UNIT_MARKER: &str = "UNIT";
const CATEGORY_MARKER: &str = "CATEGORY";
const COMMENT_PREFIXES: [&str; 2] = ["#", "//"];
const PAIR_DELIMITERS: [&str; 4] = [" - ", " – ", " — ", "\t"];

//
// ─── OUTCOME TYPES ─────────────────────────────────────────────────────────────
//

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorReason {
    /// A unit was declared before any table.
    MissingTable,
    /// A category was declared before any unit.
    MissingUnit,
    /// A term pair appeared before any category.
    MissingCategory,
    /// The line could not be split into two non-empty terms.
    MissingPair,
}

impl ParseErrorReason {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorReason::MissingTable => "MISSING_TABLE",
            ParseErrorReason::MissingUnit => "MISSING_UNIT",
            ParseErrorReason::MissingCategory => "MISSING_CATEGORY",
            ParseErrorReason::MissingPair => "MISSING_PAIR",
        }
    }
}

impl fmt::Display for ParseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseErrorReason::MissingTable => "unit declared before any table",
            ParseErrorReason::MissingUnit => "category declared before any unit",
            ParseErrorReason::MissingCategory => "term pair before any category",
            ParseErrorReason::MissingPair => "line is not a pair of two terms",
        };
        f.write_str(text)
    }
}

/// A rejected input line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line number in the imported text.
    pub line: usize,
    /// The raw line as it appeared in the input.
    pub content: String,
    pub reason: ParseErrorReason,
}

/// Everything `parse` found in one input text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub records: Vec<Word>,
    pub errors: Vec<ParseError>,
    /// Units of the emitted records.
    pub units: BTreeSet<String>,
    /// Categories of the emitted records.
    pub categories: BTreeSet<String>,
    /// Markers, blank lines and comments.
    pub skipped_lines: usize,
}

impl ParseOutcome {
    /// True when no line was rejected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of input lines accounted for by this outcome.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.records.len() + self.errors.len() + self.skipped_lines
    }
}

//
// ─── SCANNER ───────────────────────────────────────────────────────────────────
//

/// What has been declared so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope<'a> {
    Idle,
    Table,
    Unit { unit: &'a str },
    Category { unit: &'a str, category: &'a str },
}

/// Syntactic shape of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Table,
    Unit(&'a str),
    Category(&'a str),
    Skip,
    Pair(&'a str),
}

/// What a line contributes to the outcome.
enum Emit<'a> {
    Skipped,
    Rejected(ParseErrorReason),
    Pair {
        source: &'a str,
        target: &'a str,
        unit: &'a str,
        category: &'a str,
    },
}

/// Parse an import text into records, positioned errors and grouping labels.
#[must_use]
pub fn parse(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut scope = Scope::Idle;

    for (index, raw) in text.lines().enumerate() {
        let (next, emit) = step(scope, classify(raw));
        scope = next;

        match emit {
            Emit::Skipped => outcome.skipped_lines += 1,
            Emit::Rejected(reason) => outcome.errors.push(ParseError {
                line: index + 1,
                content: raw.to_owned(),
                reason,
            }),
            Emit::Pair {
                source,
                target,
                unit,
                category,
            } => match Word::new(source, target, unit, category) {
                Ok(word) => {
                    outcome.units.insert(word.unit().to_owned());
                    outcome.categories.insert(word.category().to_owned());
                    outcome.records.push(word);
                }
                // Pair and labels are already trimmed and non-empty here.
                Err(err) => {
                    debug_assert!(false, "classified pair rejected: {err}");
                    outcome.errors.push(ParseError {
                        line: index + 1,
                        content: raw.to_owned(),
                        reason: ParseErrorReason::MissingPair,
                    });
                }
            },
        }
    }

    outcome
}

fn step<'a>(scope: Scope<'a>, kind: LineKind<'a>) -> (Scope<'a>, Emit<'a>) {
    match (scope, kind) {
        (_, LineKind::Table) => (Scope::Table, Emit::Skipped),

        (Scope::Idle, LineKind::Unit(_)) => {
            (scope, Emit::Rejected(ParseErrorReason::MissingTable))
        }
        (_, LineKind::Unit(unit)) => (Scope::Unit { unit }, Emit::Skipped),

        (Scope::Idle | Scope::Table, LineKind::Category(_)) => {
            (scope, Emit::Rejected(ParseErrorReason::MissingUnit))
        }
        (Scope::Unit { unit } | Scope::Category { unit, .. }, LineKind::Category(category)) => {
            (Scope::Category { unit, category }, Emit::Skipped)
        }

        (_, LineKind::Skip) => (scope, Emit::Skipped),

        (Scope::Category { unit, category }, LineKind::Pair(line)) => match split_pair(line) {
            Some((source, target)) => (
                scope,
                Emit::Pair {
                    source,
                    target,
                    unit,
                    category,
                },
            ),
            None => (scope, Emit::Rejected(ParseErrorReason::MissingPair)),
        },
        (_, LineKind::Pair(_)) => (scope, Emit::Rejected(ParseErrorReason::MissingCategory)),
    }
}

fn classify(raw: &str) -> LineKind<'_> {
    let line = raw.trim();
    if line.is_empty() || COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return LineKind::Skip;
    }
    if marker(line, TABLE_MARKER).is_some() {
        return LineKind::Table;
    }
    if let Some(label) = marker(line, UNIT_MARKER).filter(|l| !l.is_empty()) {
        return LineKind::Unit(label);
    }
    if let Some(label) = marker(line, CATEGORY_MARKER).filter(|l| !l.is_empty()) {
        return LineKind::Category(label);
    }
    LineKind::Pair(line)
}

/// Returns the trimmed label after `KEYWORD:` when `line` is that marker.
fn marker<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    line.get(keyword.len()..)?
        .strip_prefix(':')
        .map(str::trim)
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let delimiter = PAIR_DELIMITERS.iter().find(|d| line.contains(**d))?;
    let mut parts = line.split(*delimiter);
    let source = parts.next()?.trim();
    let target = parts.next()?.trim();
    if parts.next().is_some() || source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source, target))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn reasons(outcome: &ParseOutcome) -> Vec<(usize, ParseErrorReason)> {
        outcome.errors.iter().map(|e| (e.line, e.reason)).collect()
    }

    #[test]
    fn padded_pairs_and_labels_become_records() {
        let outcome = parse("TABLE: T\nUNIT:   Animals  \ncategory: \tPets\n  cat \t mushuk  \ndog  -  it");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].source_term(), "cat");
        assert_eq!(outcome.records[0].target_term(), "mushuk");
        assert_eq!(outcome.records[1].unit(), "Animals");
        assert_eq!(outcome.records[1].category(), "Pets");
    }

    #[test]
    fn parses_basic_table() {
        let outcome = parse("TABLE: T1\nUNIT: Animals\nCATEGORY: Pets\ncat - mushuk\ndog - it");

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.is_clean());
        assert_eq!(outcome.units, BTreeSet::from(["Animals".to_string()]));
        assert_eq!(outcome.categories, BTreeSet::from(["Pets".to_string()]));

        let cat = &outcome.records[0];
        assert_eq!(cat.source_term(), "cat");
        assert_eq!(cat.target_term(), "mushuk");
        assert_eq!(cat.unit(), "Animals");
        assert_eq!(cat.category(), "Pets");
        assert_eq!(cat.mistake_count(), 0);
        assert_eq!(outcome.line_count(), 5);
    }

    #[test]
    fn pair_before_category_is_rejected_without_affecting_neighbours() {
        let text = "TABLE:\nUNIT: Food\napple - olma\nCATEGORY: Fruit\npear - nok";
        let outcome = parse(text);

        assert_eq!(reasons(&outcome), vec![(3, ParseErrorReason::MissingCategory)]);
        assert_eq!(outcome.errors[0].content, "apple - olma");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source_term(), "pear");
    }

    #[test]
    fn unit_without_table_keeps_state() {
        let outcome = parse("UNIT: Lost\nCATEGORY: Nowhere\nword - soz");

        assert_eq!(
            reasons(&outcome),
            vec![
                (1, ParseErrorReason::MissingTable),
                (2, ParseErrorReason::MissingUnit),
                (3, ParseErrorReason::MissingCategory),
            ]
        );
        assert!(outcome.records.is_empty());
        assert!(outcome.units.is_empty());
    }

    #[test]
    fn category_requires_unit_after_new_table() {
        let text = "TABLE: A\nUNIT: U1\nCATEGORY: C1\nx - y\nTABLE: B\nCATEGORY: C2\nz - w";
        let outcome = parse(text);

        assert_eq!(
            reasons(&outcome),
            vec![
                (6, ParseErrorReason::MissingUnit),
                (7, ParseErrorReason::MissingCategory),
            ]
        );
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn new_unit_resets_category() {
        let text = "TABLE:\nUNIT: U1\nCATEGORY: C1\na - b\nUNIT: U2\nc - d";
        let outcome = parse(text);
        assert_eq!(reasons(&outcome), vec![(6, ParseErrorReason::MissingCategory)]);
    }

    #[test]
    fn malformed_pairs_are_reported() {
        let text = "TABLE:\nUNIT: U\nCATEGORY: C\nnodelimiter\na - \n - b\na - b - c\nwell-known - mashhur";
        let outcome = parse(text);

        assert_eq!(
            reasons(&outcome),
            vec![
                (4, ParseErrorReason::MissingPair),
                (5, ParseErrorReason::MissingPair),
                (6, ParseErrorReason::MissingPair),
                (7, ParseErrorReason::MissingPair),
            ]
        );
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source_term(), "well-known");
    }

    #[test]
    fn accepts_alternate_delimiters() {
        let text = "TABLE:\nUNIT: U\nCATEGORY: C\nbook – kitob\npen — ruchka\ndesk\tparta";
        let outcome = parse(text);

        assert!(outcome.is_clean());
        let targets: Vec<_> = outcome.records.iter().map(Word::target_term).collect();
        assert_eq!(targets, vec!["kitob", "ruchka", "parta"]);
    }

    #[test]
    fn markers_are_case_insensitive_and_trimmed() {
        let text = "  table: x\n\tUnit:  Travel \ncategory:Airport\nticket - chipta";
        let outcome = parse(text);

        assert!(outcome.is_clean());
        assert_eq!(outcome.records[0].unit(), "Travel");
        assert_eq!(outcome.records[0].category(), "Airport");
    }

    #[test]
    fn empty_label_marker_is_not_a_declaration() {
        let outcome = parse("TABLE:\nUNIT:\nCATEGORY: C");
        assert_eq!(
            reasons(&outcome),
            vec![
                (2, ParseErrorReason::MissingCategory),
                (3, ParseErrorReason::MissingUnit),
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let text = "# list\n\nTABLE:\n// units follow\nUNIT: U\n   \nCATEGORY: C\na - b\n";
        let outcome = parse(text);

        assert!(outcome.is_clean());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped_lines, 7);
        assert_eq!(outcome.line_count(), text.lines().count());
    }

    #[test]
    fn crlf_line_numbers_match_source() {
        let text = "TABLE:\r\nUNIT: U\r\nCATEGORY: C\r\nbroken\r\nok - yes\r\n";
        let outcome = parse(text);

        assert_eq!(reasons(&outcome), vec![(4, ParseErrorReason::MissingPair)]);
        assert_eq!(outcome.errors[0].content, "broken");
        assert_eq!(outcome.records[0].target_term(), "yes");
    }

    #[test]
    fn labels_only_come_from_emitted_records() {
        let text = "TABLE:\nUNIT: Empty\nCATEGORY: Nothing\nUNIT: Full\nCATEGORY: Some\na - b";
        let outcome = parse(text);

        assert_eq!(outcome.units, BTreeSet::from(["Full".to_string()]));
        assert_eq!(outcome.categories, BTreeSet::from(["Some".to_string()]));
    }

    #[test]
    fn empty_input_is_empty_outcome() {
        let outcome = parse("");
        assert_eq!(outcome, ParseOutcome::default());
    }

    #[test]
    fn error_display_names_line() {
        let outcome = parse("stray");
        assert_eq!(
            outcome.errors[0].to_string(),
            "line 1: term pair before any category"
        );
        assert_eq!(outcome.errors[0].reason.code(), "MISSING_CATEGORY");
    }
}
