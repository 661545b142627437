use crate::app::health::{HealthCheckPlan, NestedRunner, RunCounts};
use crate::error::RunnerError;
use lazy_static::*;
use regex::Regex;
use std::process::{Command, Stdio};
use std::time::Instant;

lazy_static! {
    static ref TEST_LINE_REGEX: Regex = Regex::new(
        r"^test (?P<name>\S+)(?: - should panic)? \.\.\. (?P<result>ok|FAILED|ignored)"
    )
    .expect("Regex compilation error");
}

/// Runs the health check as a child process speaking the libtest output format.
///
/// Named methods are passed as `<class>::<method>` filters with `--exact`;
/// without methods `<class>::` is the filter. Libtest filters match by
/// substring, so only result lines of tests inside the class are counted.
#[derive(Debug, Clone)]
pub struct LibtestRunner {
    program: String,
    args: Vec<String>,
}

impl LibtestRunner {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_owned(),
            args,
        }
    }

    fn filters(plan: &HealthCheckPlan) -> Vec<String> {
        match &plan.methods {
            Some(methods) => {
                let mut filters: Vec<String> = methods
                    .iter()
                    .map(|method| format!("{}::{}", plan.class_name, method))
                    .collect();
                filters.push("--exact".to_owned());
                filters
            }
            None => vec![class_prefix(&plan.class_name)],
        }
    }
}

impl NestedRunner for LibtestRunner {
    fn run(&self, plan: &HealthCheckPlan) -> Result<RunCounts, RunnerError> {
        let filters = Self::filters(plan);
        debug!("Launching {} {:?} {:?}", self.program, self.args, filters);

        let now = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&filters)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunnerError::Launch {
                program: self.program.clone(),
                source,
            })?;
        info!(
            "Nested run of '{}' exited with {} in {} ms",
            plan.class_name,
            output.status,
            now.elapsed().as_millis()
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        let counts = parse_counts(&stdout, &plan.class_name);
        // libtest exits non-zero when tests fail; anything else is a broken run
        if !output.status.success() && counts.failed == 0 {
            return Err(RunnerError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(counts)
    }
}

fn class_prefix(class_name: &str) -> String {
    format!("{}::", class_name)
}

/// Counts result lines of tests that belong to `class_name`.
pub fn parse_counts(output: &str, class_name: &str) -> RunCounts {
    let prefix = class_prefix(class_name);
    let mut counts = RunCounts::default();
    for line in output.lines() {
        let caps = match TEST_LINE_REGEX.captures(line.trim_end()) {
            Some(caps) => caps,
            None => continue,
        };
        if !caps["name"].starts_with(&prefix) {
            trace!("Ignoring nested test {} outside of '{}'", &caps["name"], class_name);
            continue;
        }
        trace!("Nested test {} -> {}", &caps["name"], &caps["result"]);
        match &caps["result"] {
            "ok" => counts.passed += 1,
            "FAILED" => counts.failed += 1,
            _ => counts.skipped += 1,
        }
    }
    counts
}

#[cfg(test)]
mod test {
    use super::*;

    const OUTPUT: &'static str = "
running 4 tests
test smoke::login ... ok
test smoke::search ... FAILED
test smoke::logout ... ignored
test smoke::panics - should panic ... ok

failures:
    smoke::search

test result: FAILED. 2 passed; 1 failed; 1 ignored; 0 measured; 0 filtered out
";

    #[test]
    fn test_parse_counts_from_libtest_output() {
        let counts = parse_counts(OUTPUT, "smoke");

        assert_eq!(
            counts,
            RunCounts {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_nothing_run_is_all_zero() {
        let counts = parse_counts("\nrunning 0 tests\n\ntest result: ok. 0 passed; 0 failed\n", "smoke");

        assert_eq!(counts, RunCounts::default());
    }

    #[test]
    fn test_filters_for_named_methods() {
        let plan = HealthCheckPlan {
            class_name: "smoke".to_owned(),
            methods: Some(vec!["login".to_owned(), "logut".to_owned()]),
        };

        assert_eq!(
            LibtestRunner::filters(&plan),
            vec!["smoke::login", "smoke::logut", "--exact"]
        );
    }

    #[test]
    fn test_filters_for_whole_class() {
        let plan = HealthCheckPlan {
            class_name: "smoke".to_owned(),
            methods: None,
        };

        assert_eq!(LibtestRunner::filters(&plan), vec!["smoke::"]);
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let runner = LibtestRunner::new("./definitely-not-a-test-binary", vec![]);
        let plan = HealthCheckPlan {
            class_name: "smoke".to_owned(),
            methods: None,
        };

        assert!(matches!(runner.run(&plan), Err(RunnerError::Launch { .. })));
    }

    #[test]
    fn test_tests_outside_class_are_not_counted() {
        let output = "
test smoke::ping ... ok
test smoke_slow::heavy ... ok
test api::smoke ... ok
test api::smoke::nested ... FAILED
";

        assert_eq!(
            parse_counts(output, "smoke"),
            RunCounts {
                passed: 1,
                failed: 0,
                skipped: 0
            }
        );
    }

    fn shell(script: &str) -> LibtestRunner {
        LibtestRunner::new("sh", vec!["-c".to_owned(), script.to_owned(), "sh".to_owned()])
    }

    fn whole_class() -> HealthCheckPlan {
        HealthCheckPlan {
            class_name: "smoke".to_owned(),
            methods: None,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_counts_only_the_class() {
        let runner = shell(
            "echo 'test smoke::ping ... ok'; echo 'test smoke_slow::heavy ... ok'; echo 'test api::smoke ... ok'",
        );

        let counts = runner.run(&whole_class()).unwrap();

        assert_eq!(counts.passed, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_crashed_run_is_an_error() {
        let runner = shell("echo 'test smoke::ping ... ok'; kill -ABRT $$");

        assert!(matches!(runner.run(&whole_class()), Err(RunnerError::Exit { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tests_keep_their_counts() {
        let runner = shell("echo 'test smoke::ping ... ok'; echo 'test smoke::login ... FAILED'; exit 101");

        let counts = runner.run(&whole_class()).unwrap();

        assert_eq!(
            counts,
            RunCounts {
                passed: 1,
                failed: 1,
                skipped: 0
            }
        );
    }
}
