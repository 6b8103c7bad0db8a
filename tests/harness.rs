use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use mython::fixtures::{self, CaseClass};
use mython::{interpreter, parser};

fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

fn run_program(source: &str) -> Result<String> {
    let mut output = Vec::new();
    interpreter::run_source(source, &mut output)?;
    String::from_utf8(output).context("Interpreter output was not valid UTF-8")
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = fixtures::load_cases(Path::new("tests/programs"))?;

    for case in cases {
        let source = fs::read_to_string(&case.program_path)
            .with_context(|| format!("Reading {}", case.name))?;

        match case.spec.class {
            CaseClass::RuntimeSuccess => {
                let stdout_file = case
                    .spec
                    .expected
                    .stdout_file
                    .as_deref()
                    .with_context(|| format!("Missing stdout_file in {}", case.name))?;
                let expected = case.read_text(stdout_file)?;
                let output =
                    run_program(&source).with_context(|| format!("Running {}", case.name))?;
                assert_eq!(
                    normalize_output(&output),
                    normalize_output(&expected),
                    "Output mismatch for {}",
                    case.name
                );
            }
            CaseClass::FrontendError => {
                let expected_error = expected_error_text(&case)?;
                let result = parser::parse_source(&source);
                ensure!(
                    result.is_err(),
                    "Expected frontend error in {}, but parsing succeeded",
                    case.name
                );
                let actual = result.expect_err("checked as err").to_string();
                ensure!(
                    actual.contains(&expected_error),
                    "Expected frontend error containing '{expected_error}' in {}, got '{actual}'",
                    case.name
                );
            }
            CaseClass::RuntimeError => {
                let expected_error = expected_error_text(&case)?;
                let program = parser::parse_source(&source)
                    .with_context(|| format!("Parsing {}", case.name))?;
                let mut output = Vec::new();
                let result = interpreter::run(&program, &mut output);
                ensure!(
                    result.is_err(),
                    "Expected runtime error in {}, but execution succeeded",
                    case.name
                );
                let actual = result.expect_err("checked as err").to_string();
                ensure!(
                    actual.contains(&expected_error),
                    "Expected runtime error containing '{expected_error}' in {}, got '{actual}'",
                    case.name
                );
            }
        }
    }

    Ok(())
}

fn expected_error_text(case: &fixtures::Case) -> Result<String> {
    let expected = case
        .spec
        .expected
        .error_contains
        .clone()
        .with_context(|| format!("Missing error_contains in {}", case.name))?;
    Ok(expected.trim().to_string())
}
