// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::ScriptFixture;
use color_eyre::eyre::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use tap_runner::{
    diagnostic::{DiagnosticSummary, Severity},
    env::EnvironmentMap,
    mapper::DiagnosticMapper,
    runner::LocalRunner,
};
use tokio_util::sync::CancellationToken;

async fn evaluate(fixture: &ScriptFixture) -> Vec<(Severity, DiagnosticSummary, String)> {
    DiagnosticMapper::local()
        .evaluate(&fixture.spec, &CancellationToken::new())
        .await
        .into_iter()
        .map(|d| (d.severity, d.summary, d.detail))
        .collect()
}

#[tokio::test]
async fn passing_program() -> Result<()> {
    let fixture = ScriptFixture::new(indoc! {"
        echo 'TAP version 13'
        echo '1..2'
        echo 'ok 1 - widget works'
        echo 'ok 2 - gadget works # SKIP no gadget'
    "})?;
    assert_eq!(evaluate(&fixture).await, vec![]);
    Ok(())
}

#[tokio::test]
async fn failures_and_bonus_passes() -> Result<()> {
    let fixture = ScriptFixture::new(indoc! {"
        echo '1..3'
        echo 'not ok 1 - widget broken'
        echo '# expected 1'
        echo 'ok 2 - flaky # TODO'
        echo 'not ok 3 - known bad # TODO'
    "})?;
    assert_eq!(
        evaluate(&fixture).await,
        vec![
            (
                Severity::Error,
                DiagnosticSummary::TestFailure,
                "Test failed: widget broken.\n\nDiagnostic output from test:\n  expected 1\n"
                    .to_owned(),
            ),
            (
                Severity::Warning,
                DiagnosticSummary::UnexpectedPass,
                "Bonus test pass: flaky.\n\n\
                 This test is marked as a TODO test, but yet it passed. \
                 Consider removing the TODO directive from this test."
                    .to_owned(),
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn nonzero_exit() -> Result<()> {
    let fixture = ScriptFixture::new(indoc! {"
        echo '1..1'
        echo 'not ok 1 - not reported'
        echo boom >&2
        exit 2
    "})?;
    let diagnostics = evaluate(&fixture).await;
    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    let (severity, summary, detail) = &diagnostics[0];
    assert_eq!(*severity, Severity::Error);
    assert_eq!(*summary, DiagnosticSummary::ProgramFailed);
    assert!(detail.starts_with("Error running test program: "), "{detail}");
    assert!(detail.contains("boom"), "{detail}");
    Ok(())
}

#[tokio::test]
async fn stray_stderr() -> Result<()> {
    let fixture = ScriptFixture::new(indoc! {"
        echo '1..1'
        echo 'ok 1'
        echo 'warning: leaked fd' >&2
    "})?;
    assert_eq!(
        evaluate(&fixture).await,
        vec![(
            Severity::Error,
            DiagnosticSummary::StrayStderr,
            "The test program produced the following error messages:\nwarning: leaked fd\n  "
                .to_owned(),
        )]
    );
    Ok(())
}

#[tokio::test]
async fn environment_reaches_program() -> Result<()> {
    let environment: EnvironmentMap = [("WIDGET_COUNT", "3")].into_iter().collect();
    let fixture = ScriptFixture::with_env(
        indoc! {"
            echo \"1..$WIDGET_COUNT\"
            i=1
            while [ $i -le $WIDGET_COUNT ]; do
                echo \"ok $i - widget $i\"
                i=$((i + 1))
            done
        "},
        environment,
    )?;
    assert_eq!(evaluate(&fixture).await, vec![]);
    Ok(())
}

#[tokio::test]
async fn cancellation() -> Result<()> {
    let fixture = ScriptFixture::new(indoc! {"
        echo '1..1'
        sleep 30
        echo 'ok 1'
    "})?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let mapper =
        DiagnosticMapper::new(LocalRunner::new().with_grace_period(Duration::from_millis(100)));
    let diagnostics = mapper.evaluate(&fixture.spec, &cancel).await;
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].detail,
        "Error running test program: execution was cancelled."
    );
    Ok(())
}
