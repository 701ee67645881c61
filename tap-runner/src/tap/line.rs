// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of individual TAP lines.
//!
//! Each line is looked at in isolation here. Whether a line is valid in its
//! position (for example, a plan between two test lines) is decided by the
//! parser in `parse.rs`.

use super::{Directive, TestOutcome};
use std::borrow::Cow;

/// A single classified line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Line<'a> {
    /// `TAP version N`, with the text after `version`.
    Version(&'a str),
    /// `1..N [# reason]`.
    Plan(PlanLine<'a>),
    /// Text that starts like a plan but isn't one.
    InvalidPlan(&'a str),
    /// `ok ...` or `not ok ...`.
    Test(TestLine<'a>),
    /// `Bail out! [reason]`.
    BailOut(Option<&'a str>),
    /// `# text`, with the marker and one following space removed.
    Comment(&'a str),
    /// An indented `---`, opening a YAML diagnostic block.
    YamlStart,
    /// Anything else, including blank lines.
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct PlanLine<'a> {
    pub(super) count: u64,
    pub(super) reason: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct TestLine<'a> {
    pub(super) outcome: TestOutcome,
    pub(super) number: Option<u64>,
    pub(super) name: Option<Cow<'a, str>>,
    pub(super) directive: Option<Directive>,
}

const VERSION_PREFIX: &str = "TAP version ";
const BAIL_OUT_PREFIX: &str = "Bail out!";

pub(super) fn classify(line: &str) -> Line<'_> {
    if line.starts_with([' ', '\t']) {
        return if line.trim() == "---" {
            Line::YamlStart
        } else {
            // Indented lines outside a YAML block are subtest output, which is
            // summarized by the parent test line.
            Line::Unknown
        };
    }

    if let Some(version) = line.strip_prefix(VERSION_PREFIX) {
        return Line::Version(version.trim());
    }
    if let Some(rest) = line.strip_prefix(BAIL_OUT_PREFIX) {
        return Line::BailOut(non_empty(rest.trim()));
    }
    if let Some(comment) = line.strip_prefix('#') {
        return Line::Comment(comment.strip_prefix(' ').unwrap_or(comment));
    }
    if let Some(rest) = strip_keyword(line, "not ok") {
        return Line::Test(parse_test_line(TestOutcome::Fail, rest));
    }
    if let Some(rest) = strip_keyword(line, "ok") {
        return Line::Test(parse_test_line(TestOutcome::Pass, rest));
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && line[digits..].starts_with("..") {
        return match parse_plan(line) {
            Some(plan) => Line::Plan(plan),
            None => Line::InvalidPlan(line.trim_end()),
        };
    }

    Line::Unknown
}

/// Strips `keyword` if it is followed by whitespace or the end of the line.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

fn parse_plan(line: &str) -> Option<PlanLine<'_>> {
    let (range, reason) = match line.split_once('#') {
        Some((range, reason)) => (range, non_empty(reason.trim())),
        None => (line, None),
    };
    let (start, end) = range.trim_end().split_once("..")?;
    if start != "1" || end.is_empty() || !end.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count = end.parse().ok()?;
    Some(PlanLine { count, reason })
}

fn parse_test_line(outcome: TestOutcome, rest: &str) -> TestLine<'_> {
    let rest = rest.trim_start();
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let (number, rest) = match rest[..digits].parse::<u64>() {
        Ok(number) => (Some(number), &rest[digits..]),
        Err(_) => (None, rest),
    };

    let (description, directive) = match find_unescaped_hash(rest) {
        Some(pos) => match parse_directive(&rest[pos + 1..]) {
            Some(directive) => (&rest[..pos], Some(directive)),
            None => (rest, None),
        },
        None => (rest, None),
    };

    let description = description.trim();
    let description = description
        .strip_prefix('-')
        .map_or(description, str::trim_start);

    TestLine {
        outcome,
        number,
        name: non_empty(description).map(unescape),
        directive,
    }
}

fn find_unescaped_hash(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (pos, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '#' if !escaped => return Some(pos),
            _ => escaped = false,
        }
    }
    None
}

fn parse_directive(text: &str) -> Option<Directive> {
    let text = text.trim_start();
    let word_len = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (word, reason) = text.split_at(word_len);
    if !reason.is_empty() && !reason.starts_with(char::is_whitespace) {
        return None;
    }
    let reason = non_empty(reason.trim()).map(unescape).map(Cow::into_owned);

    let word = word.to_ascii_lowercase();
    if word == "todo" {
        Some(Directive::Todo { reason })
    } else if word.starts_with("skip") {
        Some(Directive::Skip { reason })
    } else {
        None
    }
}

fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('#' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn test_line(
        outcome: TestOutcome,
        number: Option<u64>,
        name: Option<&str>,
        directive: Option<Directive>,
    ) -> Line<'_> {
        Line::Test(TestLine {
            outcome,
            number,
            name: name.map(Cow::Borrowed),
            directive,
        })
    }

    #[test_case("ok 1 - widget works", test_line(TestOutcome::Pass, Some(1), Some("widget works"), None) ; "pass with name")]
    #[test_case("not ok 2 - widget broken", test_line(TestOutcome::Fail, Some(2), Some("widget broken"), None) ; "fail with name")]
    #[test_case("ok 1", test_line(TestOutcome::Pass, Some(1), None, None) ; "pass number only")]
    #[test_case("ok", test_line(TestOutcome::Pass, None, None, None) ; "bare ok")]
    #[test_case("not ok - no number", test_line(TestOutcome::Fail, None, Some("no number"), None) ; "no number")]
    #[test_case("ok 3 name without dash", test_line(TestOutcome::Pass, Some(3), Some("name without dash"), None) ; "no dash")]
    #[test_case("ok 4 -", test_line(TestOutcome::Pass, Some(4), None, None) ; "dash only")]
    #[test_case(
        "ok 1 - flaky # TODO",
        test_line(TestOutcome::Pass, Some(1), Some("flaky"), Some(Directive::Todo { reason: None }))
        ; "todo without reason"
    )]
    #[test_case(
        "not ok 5 - parser # todo handle unicode",
        test_line(TestOutcome::Fail, Some(5), Some("parser"), Some(Directive::Todo { reason: Some("handle unicode".to_owned()) }))
        ; "lowercase todo with reason"
    )]
    #[test_case(
        "ok 6 # SKIP no network",
        test_line(TestOutcome::Pass, Some(6), None, Some(Directive::Skip { reason: Some("no network".to_owned()) }))
        ; "skip without name"
    )]
    #[test_case(
        "ok 7 - slow #skipped",
        test_line(TestOutcome::Pass, Some(7), Some("slow"), Some(Directive::Skip { reason: None }))
        ; "skipped variant"
    )]
    #[test_case(
        "ok 8 - issue \\#42 fixed",
        test_line(TestOutcome::Pass, Some(8), Some("issue #42 fixed"), None)
        ; "escaped hash"
    )]
    #[test_case(
        "ok 9 - channel # general",
        test_line(TestOutcome::Pass, Some(9), Some("channel # general"), None)
        ; "hash without directive"
    )]
    #[test_case(
        "ok 10 - list # TODOs",
        test_line(TestOutcome::Pass, Some(10), Some("list # TODOs"), None)
        ; "todo must be a whole word"
    )]
    fn classify_test_lines(input: &str, expected: Line<'_>) {
        assert_eq!(classify(input), expected);
    }

    #[test_case("1..5", Line::Plan(PlanLine { count: 5, reason: None }) ; "simple plan")]
    #[test_case("1..0 # SKIP no database", Line::Plan(PlanLine { count: 0, reason: Some("SKIP no database") }) ; "skip all plan")]
    #[test_case("1..3  ", Line::Plan(PlanLine { count: 3, reason: None }) ; "trailing whitespace")]
    #[test_case("2..5", Line::InvalidPlan("2..5") ; "plan must start at one")]
    #[test_case("1..x", Line::InvalidPlan("1..x") ; "non numeric count")]
    #[test_case("1..", Line::InvalidPlan("1..") ; "missing count")]
    fn classify_plans(input: &str, expected: Line<'_>) {
        assert_eq!(classify(input), expected);
    }

    #[test_case("TAP version 13", Line::Version("13") ; "version")]
    #[test_case("Bail out! database down", Line::BailOut(Some("database down")) ; "bail out reason")]
    #[test_case("Bail out!", Line::BailOut(None) ; "bail out bare")]
    #[test_case("# expected 3, got 4", Line::Comment("expected 3, got 4") ; "comment")]
    #[test_case("#   indented", Line::Comment("  indented") ; "comment keeps extra spaces")]
    #[test_case("#", Line::Comment("") ; "empty comment")]
    #[test_case("  ---", Line::YamlStart ; "yaml start")]
    #[test_case("    ok 1 - subtest", Line::Unknown ; "indented subtest")]
    #[test_case("okay then", Line::Unknown ; "ok prefix of word")]
    #[test_case("", Line::Unknown ; "blank")]
    #[test_case("random noise", Line::Unknown ; "noise")]
    #[test_case("3 ... waiting", Line::Unknown ; "number then ellipsis")]
    fn classify_other_lines(input: &str, expected: Line<'_>) {
        assert_eq!(classify(input), expected);
    }
}
