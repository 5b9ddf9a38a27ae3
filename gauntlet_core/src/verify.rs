use crate::checker::ACCEPTED;
use crate::note;
use crate::program::{Program, RunError};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Where a campaign persists the current trial's input for `program`.
///
/// The file is overwritten every trial, so after a failed stress test it
/// holds the breaking input.
pub fn persisted_input_path(program: &Program) -> PathBuf {
    PathBuf::from(format!("input_{}.txt", program.name()))
}

fn materialize_input<G>(
    program: &Program,
    input_generator: &mut G,
    persist_input: bool,
) -> Result<String, RunError>
where
    G: FnMut() -> String,
{
    let input = input_generator();
    if persist_input {
        let path = persisted_input_path(program);
        fs::write(&path, input.as_bytes()).map_err(|source| RunError::Io {
            program: program.path().display().to_string(),
            source,
        })?;
    }
    Ok(input)
}

/// Wall-clock summary of a completed profiling campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileReport {
    pub runs: usize,
    pub max: Duration,
    pub min: Duration,
    pub mean: Duration,
}

impl ProfileReport {
    fn from_runtimes(runtimes: &[Duration]) -> Option<Self> {
        let (first, rest) = runtimes.split_first()?;
        let mut max = *first;
        let mut min = *first;
        let mut total = *first;
        for elapsed in rest {
            max = max.max(*elapsed);
            min = min.min(*elapsed);
            total += *elapsed;
        }
        Some(ProfileReport {
            runs: runtimes.len(),
            max,
            min,
            mean: total / runtimes.len() as u32,
        })
    }
}

/// Times `run_count` runs of `program` over freshly generated inputs.
///
/// Output is discarded; only the wall clock is measured. The campaign
/// reports and returns `None` the moment a trial fails.
/// `run_count == 0` is a no-op with no summary.
pub fn profile<G>(
    program: &Program,
    mut input_generator: G,
    run_count: usize,
    persist_input: bool,
) -> Result<Option<ProfileReport>, RunError>
where
    G: FnMut() -> String,
{
    if run_count == 0 {
        return Ok(None);
    }
    note!(
        "performing {run_count} profiling runs on {}",
        program.path().display()
    );
    let mut runtimes = Vec::with_capacity(run_count);
    for _ in 0..run_count {
        let input = materialize_input(program, &mut input_generator, persist_input)?;
        match program.timed_run(&input)? {
            Some(elapsed) => runtimes.push(elapsed),
            // The failed trial already reported itself.
            None => return Ok(None),
        }
    }
    let report = ProfileReport::from_runtimes(&runtimes);
    if let Some(report) = &report {
        note!(
            "max {:.2?} min {:.2?} mean {:.2?}",
            report.max, report.min, report.mean
        );
    }
    Ok(report)
}

/// How a stress-test campaign ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StressOutcome {
    /// Every trial scored at or above [`ACCEPTED`].
    Passed { trials: usize },
    /// Reference or candidate failed at runtime on the given (1-based)
    /// trial; no checker was invoked for it.
    RuntimeFailure { trial: usize },
    /// The checker scored the given trial below [`ACCEPTED`].
    Mismatch {
        trial: usize,
        score: f64,
        /// Where the breaking input was persisted, when persistence was on.
        input_path: Option<PathBuf>,
    },
}

/// Stress-tests `candidate` against `reference` for up to `run_count`
/// trials.
///
/// Each trial generates one input, runs it through both programs, and scores
/// the pair of outputs with `checker`. The campaign stops at the first trial
/// that fails at runtime or scores below [`ACCEPTED`]; launch errors
/// propagate, everything else is reported and encoded in the outcome.
pub fn stress_test<G, C>(
    reference: &Program,
    candidate: &Program,
    mut input_generator: G,
    checker: C,
    run_count: usize,
    persist_input: bool,
) -> Result<StressOutcome, RunError>
where
    G: FnMut() -> String,
    C: Fn(&str, &str, &str) -> f64,
{
    if run_count == 0 {
        return Ok(StressOutcome::Passed { trials: 0 });
    }
    note!(
        "performing a {run_count}-run stress test on {} against {}",
        candidate.path().display(),
        reference.path().display()
    );
    for trial in 1..=run_count {
        let input = materialize_input(reference, &mut input_generator, persist_input)?;
        let expected = reference.batch_run(&input)?;
        let actual = candidate.batch_run(&input)?;
        let (expected, actual) = match (expected, actual) {
            (Some(expected), Some(actual)) => (expected, actual),
            _ => {
                note!("runtime error on trial {trial}, aborting stress test");
                return Ok(StressOutcome::RuntimeFailure { trial });
            }
        };
        let score = checker(&input, &expected, &actual);
        if score < ACCEPTED {
            note!("wrong answer on trial {trial} (score {score:.3})");
            let input_path = persist_input.then(|| persisted_input_path(reference));
            if let Some(path) = &input_path {
                note!("breaking input saved to {}", path.display());
            }
            return Ok(StressOutcome::Mismatch {
                trial,
                score,
                input_path,
            });
        }
    }
    note!("stress test found no errors in {run_count} trials");
    Ok(StressOutcome::Passed { trials: run_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::token_checker;
    use crate::program::test_target;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_generator(calls: &Rc<Cell<usize>>) -> impl FnMut() -> String {
        let calls = Rc::clone(calls);
        move || {
            calls.set(calls.get() + 1);
            format!("{}\n", calls.get())
        }
    }

    #[test]
    fn profile_zero_runs_is_a_no_op() {
        let program = Program::new(test_target("echo_stdin.sh"));
        let calls = Rc::new(Cell::new(0));
        let report = profile(&program, counting_generator(&calls), 0, false).unwrap();
        assert!(report.is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn profile_reports_over_all_trials() {
        let program = Program::new(test_target("echo_stdin.sh"));
        let calls = Rc::new(Cell::new(0));
        let report = profile(&program, counting_generator(&calls), 3, false)
            .unwrap()
            .expect("campaign should complete");
        assert_eq!(report.runs, 3);
        assert_eq!(calls.get(), 3);
        assert!(report.min <= report.mean && report.mean <= report.max);
    }

    #[test]
    fn profile_aborts_on_first_failed_trial() {
        let program = Program::new(test_target("fail.sh"));
        let calls = Rc::new(Cell::new(0));
        let report = profile(&program, counting_generator(&calls), 5, false).unwrap();
        assert!(report.is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn profile_launch_error_propagates() {
        let program = Program::new("./missing_profile_target_99");
        let result = profile(&program, || String::new(), 2, false);
        assert!(matches!(result, Err(RunError::Launch { .. })));
    }

    #[test]
    fn stress_matching_candidate_passes_all_trials() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        let candidate = Program::new(test_target("echo_stdin.sh"));
        let calls = Rc::new(Cell::new(0));
        let outcome = stress_test(
            &reference,
            &candidate,
            counting_generator(&calls),
            token_checker,
            5,
            false,
        )
        .unwrap();
        assert_eq!(outcome, StressOutcome::Passed { trials: 5 });
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn stress_stops_at_the_diverging_trial() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        // flaky_echo.sh echoes its input except when given "3".
        let candidate = Program::new(test_target("flaky_echo.sh"));
        let calls = Rc::new(Cell::new(0));
        let outcome = stress_test(
            &reference,
            &candidate,
            counting_generator(&calls),
            token_checker,
            5,
            false,
        )
        .unwrap();
        match outcome {
            StressOutcome::Mismatch {
                trial,
                score,
                input_path,
            } => {
                assert_eq!(trial, 3);
                assert!(score < ACCEPTED);
                assert!(input_path.is_none());
            }
            other => panic!("expected a mismatch on trial 3, got {other:?}"),
        }
        // Trials 4 and 5 never ran.
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn stress_runtime_failure_aborts_without_scoring() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        let candidate = Program::new(test_target("fail.sh"));
        let outcome = stress_test(
            &reference,
            &candidate,
            || "1\n".to_string(),
            |_, _, _| panic!("checker must not run after a runtime failure"),
            5,
            false,
        )
        .unwrap();
        assert_eq!(outcome, StressOutcome::RuntimeFailure { trial: 1 });
    }

    #[test]
    fn stress_interrupted_candidate_stops_the_campaign() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        let candidate = Program::new(test_target("self_interrupt.sh"));
        let calls = Rc::new(Cell::new(0));
        let outcome = stress_test(
            &reference,
            &candidate,
            counting_generator(&calls),
            token_checker,
            5,
            false,
        )
        .unwrap();
        assert_eq!(outcome, StressOutcome::RuntimeFailure { trial: 1 });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn stress_persists_the_breaking_input() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        let candidate = Program::new(test_target("flaky_echo.sh"));
        let calls = Rc::new(Cell::new(0));
        let outcome = stress_test(
            &reference,
            &candidate,
            counting_generator(&calls),
            token_checker,
            5,
            true,
        )
        .unwrap();
        let path = match outcome {
            StressOutcome::Mismatch {
                input_path: Some(path),
                ..
            } => path,
            other => panic!("expected a mismatch with a persisted input, got {other:?}"),
        };
        assert_eq!(path, persisted_input_path(&reference));
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "3\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn stress_zero_runs_passes_vacuously() {
        let reference = Program::new(test_target("echo_stdin.sh"));
        let candidate = Program::new(test_target("echo_stdin.sh"));
        let outcome = stress_test(
            &reference,
            &candidate,
            || unreachable!("generator must not run"),
            token_checker,
            0,
            false,
        )
        .unwrap();
        assert_eq!(outcome, StressOutcome::Passed { trials: 0 });
    }
}
