// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    TestPlan, TestReport, TestResult,
    line::{Line, PlanLine, TestLine, classify},
};
use crate::errors::{MalformedReportError, MalformedReportKind};
use tracing::{debug, trace};

pub(super) fn parse(input: &str) -> Result<TestReport, MalformedReportError> {
    let mut parser = Parser::default();
    for (index, line) in input.lines().enumerate() {
        parser.line_no = index + 1;
        parser.feed(line)?;
    }
    parser.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlanPosition {
    BeforeTests,
    AfterTests,
}

#[derive(Clone, Copy, Debug)]
struct YamlBlock {
    start: usize,
    indent: usize,
}

#[derive(Debug, Default)]
struct Parser {
    line_no: usize,
    report: TestReport,
    plan_position: Option<PlanPosition>,
    last_number: u64,
    // True if the previous significant line was a test line, so a YAML block
    // may follow.
    after_test_line: bool,
    yaml: Option<YamlBlock>,
}

impl Parser {
    fn feed(&mut self, line: &str) -> Result<(), MalformedReportError> {
        if let Some(block) = self.yaml {
            self.feed_yaml(block, line);
            return Ok(());
        }

        match classify(line) {
            Line::Version(version) => self.on_version(version)?,
            Line::Plan(plan) => self.on_plan(plan)?,
            Line::InvalidPlan(text) => {
                return Err(self.error(MalformedReportKind::InvalidPlan {
                    text: text.to_owned(),
                }));
            }
            Line::Test(test) => self.on_test(test)?,
            Line::BailOut(reason) => {
                return Err(self.error(MalformedReportKind::BailOut {
                    reason: reason.map(str::to_owned),
                }));
            }
            Line::Comment(text) => self.on_comment(text),
            Line::YamlStart if self.after_test_line => {
                self.yaml = Some(YamlBlock {
                    start: self.line_no,
                    indent: line.len() - line.trim_start_matches([' ', '\t']).len(),
                });
            }
            Line::YamlStart | Line::Unknown => {
                trace!(line_no = self.line_no, line, "ignoring unrecognized line");
            }
        }
        Ok(())
    }

    fn on_version(&mut self, version: &str) -> Result<(), MalformedReportError> {
        if self.report.version.is_some()
            || self.report.plan.is_some()
            || !self.report.tests.is_empty()
        {
            return Err(self.error(MalformedReportKind::VersionNotFirst));
        }
        match version.parse::<u32>() {
            Ok(version @ (13 | 14)) => {
                self.report.version = Some(version);
                Ok(())
            }
            _ => Err(self.error(MalformedReportKind::InvalidVersion {
                version: version.to_owned(),
            })),
        }
    }

    fn on_plan(&mut self, plan: PlanLine<'_>) -> Result<(), MalformedReportError> {
        if self.report.plan.is_some() {
            return Err(self.error(MalformedReportKind::DuplicatePlan));
        }
        let position = if self.report.tests.is_empty() {
            PlanPosition::BeforeTests
        } else {
            if let Some(number) = self.report.tests.last().map(|test| test.number) {
                // Numbers are increasing, so checking the last test is enough.
                if number > plan.count {
                    return Err(self.error(MalformedReportKind::NumberExceedsPlan {
                        number,
                        planned: plan.count,
                    }));
                }
            }
            PlanPosition::AfterTests
        };

        self.report.plan = Some(TestPlan {
            count: plan.count,
            reason: plan.reason.map(str::to_owned),
        });
        self.plan_position = Some(position);
        self.after_test_line = false;
        Ok(())
    }

    fn on_test(&mut self, test: TestLine<'_>) -> Result<(), MalformedReportError> {
        if self.plan_position == Some(PlanPosition::AfterTests) {
            return Err(self.error(MalformedReportKind::PlanNotAtEnds));
        }

        let number = match test.number {
            Some(0) => return Err(self.error(MalformedReportKind::ZeroTestNumber)),
            Some(number) if number <= self.last_number => {
                return Err(self.error(MalformedReportKind::NonIncreasingNumber {
                    number,
                    previous: self.last_number,
                }));
            }
            Some(number) => number,
            None => match self.last_number.checked_add(1) {
                Some(number) => number,
                None => {
                    return Err(self.error(MalformedReportKind::NonIncreasingNumber {
                        number: self.last_number,
                        previous: self.last_number,
                    }));
                }
            },
        };
        if let Some(plan) = &self.report.plan {
            if number > plan.count {
                return Err(self.error(MalformedReportKind::NumberExceedsPlan {
                    number,
                    planned: plan.count,
                }));
            }
        }
        // number > last_number here, so the subtraction can't underflow.
        if number - self.last_number > 1 {
            debug!(
                line_no = self.line_no,
                "test numbers {}..{number} were not reported",
                self.last_number + 1,
            );
        }

        self.last_number = number;
        self.report.tests.push(TestResult {
            number,
            name: test.name.map(|name| name.into_owned()),
            outcome: test.outcome,
            directive: test.directive,
            diagnostics: Vec::new(),
        });
        self.after_test_line = true;
        Ok(())
    }

    fn on_comment(&mut self, text: &str) {
        match self.report.tests.last_mut() {
            Some(test) => test.diagnostics.push(text.to_owned()),
            None => self.report.preamble.push(text.to_owned()),
        }
    }

    fn feed_yaml(&mut self, block: YamlBlock, line: &str) {
        let trimmed = line.trim_start();
        if trimmed.trim_end() == "..." {
            self.yaml = None;
            self.after_test_line = false;
            return;
        }

        // Only strip the block's indentation if this line starts with the same
        // amount of ASCII whitespace. Anything else is dedented to the content.
        let text = match line.get(..block.indent) {
            Some(prefix) if prefix.bytes().all(|b| b == b' ' || b == b'\t') => {
                &line[block.indent..]
            }
            _ => trimmed,
        };
        if let Some(test) = self.report.tests.last_mut() {
            test.diagnostics.push(text.to_owned());
        }
    }

    fn finish(self) -> Result<TestReport, MalformedReportError> {
        if let Some(block) = self.yaml {
            return Err(MalformedReportError::new(
                None,
                MalformedReportKind::UnterminatedYaml { start: block.start },
            ));
        }

        if self.report.tests.is_empty() {
            let kind = match self.report.plan {
                None => MalformedReportKind::NoResults,
                Some(TestPlan { count: 0, reason }) => MalformedReportKind::SkippedAll { reason },
                Some(TestPlan { count, .. }) => MalformedReportKind::PlannedButEmpty { planned: count },
            };
            return Err(MalformedReportError::new(None, kind));
        }
        if let Some(plan) = &self.report.plan {
            if self.last_number < plan.count {
                debug!(
                    planned = plan.count,
                    last = self.last_number,
                    "fewer tests reported than planned"
                );
            }
        }

        Ok(self.report)
    }

    fn error(&self, kind: MalformedReportKind) -> MalformedReportError {
        MalformedReportError::new(Some(self.line_no), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tap::{Directive, TestOutcome};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use swrite::{SWrite, swriteln};
    use test_case::test_case;

    fn parse_err(input: &str) -> MalformedReportError {
        parse(input).expect_err("input should fail to parse")
    }

    #[test]
    fn simple_report() {
        let report = parse("1..1\nok 1 - widget works\n").expect("valid report");
        assert_eq!(
            report,
            TestReport {
                version: None,
                plan: Some(TestPlan {
                    count: 1,
                    reason: None
                }),
                tests: vec![TestResult {
                    number: 1,
                    name: Some("widget works".to_owned()),
                    outcome: TestOutcome::Pass,
                    directive: None,
                    diagnostics: vec![],
                }],
                preamble: vec![],
            }
        );
    }

    #[test]
    fn full_report() {
        let input = indoc! {"
            TAP version 13
            # running the widget suite
            1..5
            ok 1 - widget works
            not ok 2 - widget broken
            # expected: 3
            #   got: 4
            ok - numbered implicitly # SKIP no network
            some stray program output
            not ok 5 - known bug # TODO fix rounding
              ---
              message: rounding error
              data:
                got: 0.30000000000000004
              ...
            # trailing comment
        "};
        let report = parse(input).expect("valid report");

        assert_eq!(report.version, Some(13));
        assert_eq!(report.preamble, vec!["running the widget suite"]);
        assert_eq!(
            report.plan,
            Some(TestPlan {
                count: 5,
                reason: None
            })
        );

        let numbers: Vec<_> = report.tests.iter().map(|test| test.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 5]);

        assert_eq!(report.tests[1].outcome, TestOutcome::Fail);
        assert_eq!(report.tests[1].diagnostics, vec!["expected: 3", "  got: 4"]);

        assert_eq!(report.tests[2].name.as_deref(), Some("numbered implicitly"));
        assert_eq!(
            report.tests[2].directive,
            Some(Directive::Skip {
                reason: Some("no network".to_owned())
            })
        );

        assert!(report.tests[3].is_expected_failure());
        assert_eq!(
            report.tests[3].diagnostics,
            vec![
                "message: rounding error",
                "data:",
                "  got: 0.30000000000000004",
                "trailing comment",
            ]
        );
    }

    #[test]
    fn plan_at_end() {
        let report = parse("ok 1\nok 2\n1..2\n").expect("valid report");
        assert_eq!(report.tests.len(), 2);
        assert_eq!(report.plan.map(|plan| plan.count), Some(2));
    }

    #[test]
    fn tests_without_plan() {
        let report = parse("ok 1 - a\nnot ok 2 - b\n").expect("valid report");
        assert_eq!(report.plan, None);
        assert_eq!(report.tests.len(), 2);
    }

    #[test]
    fn gaps_are_tolerated() {
        let report = parse("1..10\nok 1\nok 4\nok 9\n").expect("valid report");
        let numbers: Vec<_> = report.tests.iter().map(|test| test.number).collect();
        assert_eq!(numbers, vec![1, 4, 9]);
    }

    #[test]
    fn crlf_line_endings() {
        let report = parse("1..1\r\nnot ok 1 - windows\r\n# detail\r\n").expect("valid report");
        assert_eq!(report.tests[0].name.as_deref(), Some("windows"));
        assert_eq!(report.tests[0].diagnostics, vec!["detail"]);
    }

    #[test]
    fn yaml_only_after_test_line() {
        // An indented `---` before any test is ignored, as is what follows it.
        let report = parse("  ---\n  foo: bar\n  ...\n1..1\nok 1\n").expect("valid report");
        assert!(report.tests[0].diagnostics.is_empty());
    }

    #[test]
    fn yaml_with_unicode_indentation() {
        let input = "1..1\nnot ok 1\n  ---\n \u{a0}message: x\n    extra: y\n\u{a0}\u{a0}z: 1\n  ...\n";
        let report = parse(input).expect("valid report");
        assert_eq!(
            report.tests[0].diagnostics,
            vec!["message: x", "  extra: y", "z: 1"]
        );
    }

    #[test_case("", None, MalformedReportKind::NoResults ; "empty")]
    #[test_case("hello\nworld\n", None, MalformedReportKind::NoResults ; "no directives")]
    #[test_case("# only a comment\n", None, MalformedReportKind::NoResults ; "only comments")]
    #[test_case("1..3\n", None, MalformedReportKind::PlannedButEmpty { planned: 3 } ; "plan without tests")]
    #[test_case(
        "1..0 # SKIP requires root\n",
        None,
        MalformedReportKind::SkippedAll { reason: Some("SKIP requires root".to_owned()) }
        ; "skip all plan"
    )]
    #[test_case(
        "1..2\nok 1\nok 1\n",
        Some(3),
        MalformedReportKind::NonIncreasingNumber { number: 1, previous: 1 }
        ; "duplicate number"
    )]
    #[test_case(
        "ok 2\nok 1\n",
        Some(2),
        MalformedReportKind::NonIncreasingNumber { number: 1, previous: 2 }
        ; "decreasing number"
    )]
    #[test_case("ok 0\n", Some(1), MalformedReportKind::ZeroTestNumber ; "zero number")]
    #[test_case("1..1\n1..1\nok 1\n", Some(2), MalformedReportKind::DuplicatePlan ; "duplicate plan")]
    #[test_case("ok 1\n1..2\nok 2\n", Some(3), MalformedReportKind::PlanNotAtEnds ; "plan in the middle")]
    #[test_case(
        "1..1\nok 1\nok 2\n",
        Some(3),
        MalformedReportKind::NumberExceedsPlan { number: 2, planned: 1 }
        ; "more tests than planned"
    )]
    #[test_case(
        "ok 1\nok 3\n1..2\n",
        Some(3),
        MalformedReportKind::NumberExceedsPlan { number: 3, planned: 2 }
        ; "trailing plan too small"
    )]
    #[test_case(
        "1..x\n",
        Some(1),
        MalformedReportKind::InvalidPlan { text: "1..x".to_owned() }
        ; "invalid plan"
    )]
    #[test_case(
        "TAP version 12\n1..1\nok 1\n",
        Some(1),
        MalformedReportKind::InvalidVersion { version: "12".to_owned() }
        ; "version 12 line"
    )]
    #[test_case("1..1\nTAP version 13\nok 1\n", Some(2), MalformedReportKind::VersionNotFirst ; "late version")]
    #[test_case(
        "1..2\nok 1\nBail out! out of disk\nok 2\n",
        Some(3),
        MalformedReportKind::BailOut { reason: Some("out of disk".to_owned()) }
        ; "bail out"
    )]
    #[test_case(
        "1..1\nnot ok 1\n  ---\n  message: oops\n",
        None,
        MalformedReportKind::UnterminatedYaml { start: 3 }
        ; "unterminated yaml"
    )]
    #[test_case(
        "ok 18446744073709551615\nok\n",
        Some(2),
        MalformedReportKind::NonIncreasingNumber { number: u64::MAX, previous: u64::MAX }
        ; "implicit number after the largest number"
    )]
    fn malformed(input: &str, line: Option<usize>, kind: MalformedReportKind) {
        let err = parse_err(input);
        assert_eq!(err.line(), line, "line for {err}");
        assert_eq!(err.kind(), &kind);
    }

    #[test_strategy::proptest]
    fn numbered_lines_preserve_order(
        #[strategy(proptest::collection::vec((proptest::bool::ANY, 1u64..5), 1..20))]
        steps: Vec<(bool, u64)>,
    ) {
        let mut input = String::new();
        let mut number = 0;
        let mut expected = Vec::new();
        for (pass, step) in steps {
            number += step;
            let status = if pass { "ok" } else { "not ok" };
            swriteln!(input, "{status} {number} - test {number}");
            expected.push((number, pass));
        }

        let report = parse(&input).expect("generated report is valid");
        let actual: Vec<_> = report
            .tests
            .iter()
            .map(|test| (test.number, test.outcome == TestOutcome::Pass))
            .collect();
        proptest::prop_assert_eq!(actual, expected);
    }
}
