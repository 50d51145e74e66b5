//! Drives one generation from parsed arguments.

use crate::cli::{Cli, CliError, SecretsReportFormat};
use rnflow_engine::secrets::render_report;
use rnflow_engine::{Generated, Generator, PresetRegistry, SecretRequirement};
use rnflow_github::GitHubActionsEmitter;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Run the CLI.
///
/// The workflow goes to `out` unless `--output` is given; the secrets report
/// goes to `diag` once the workflow has been written. The output file is only
/// written once generation has fully succeeded.
///
/// # Errors
///
/// Returns a [`CliError`] for unreadable input, failed generation or failed
/// writes.
#[instrument(skip_all, fields(preset = cli.preset.as_deref(), config = ?cli.config))]
pub fn run(cli: &Cli, out: &mut impl Write, diag: &mut impl Write) -> Result<(), CliError> {
    let registry = PresetRegistry::builtin();
    if cli.list_presets {
        return list_presets(registry, out);
    }

    let emitter = GitHubActionsEmitter::new();
    let generator = Generator::new(registry, &emitter);
    let document = cli.config.as_deref().map(load_document).transpose()?;

    let generated = match (cli.preset.as_deref(), document) {
        (Some(preset), overrides) => generator.generate_with_preset(
            preset,
            &overrides.unwrap_or_else(|| Value::Object(Map::new())),
        )?,
        (None, Some(document)) => generator.generate(&document)?,
        (None, None) => {
            return Err(CliError::config_with_help(
                "no configuration given",
                "Pass --config <path> or --preset <name>",
            ));
        }
    };

    match &cli.output {
        Some(path) => {
            let written = write_workflow(path, &generated)?;
            tracing::info!(path = %written.display(), "Workflow written");
        }
        None => out
            .write_all(generated.workflow.as_bytes())
            .map_err(|e| CliError::other(format!("failed to write workflow: {e}")))?,
    }

    write_secrets_report(&generated.secrets, cli.secrets_report, diag)
}

/// Read a configuration document; `.json` files are parsed as JSON, anything
/// else as YAML.
///
/// # Errors
///
/// Returns [`CliError::Config`] when the file is missing or malformed.
pub fn load_document(path: &Path) -> Result<Value, CliError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        CliError::config_with_help(
            format!("cannot read {}: {e}", path.display()),
            "Check that the configuration file exists and is readable",
        )
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        CliError::config(format!(
            "{} is not valid {}: {e}",
            path.display(),
            if is_json { "JSON" } else { "YAML" }
        ))
    })
}

fn list_presets(registry: &PresetRegistry, out: &mut impl Write) -> Result<(), CliError> {
    let presets = registry.list();
    let width = presets.iter().map(|p| p.slug.len()).max().unwrap_or(0);
    let mut listing = String::new();
    for preset in presets {
        let _ = writeln!(listing, "{:width$}  {}", preset.slug, preset.description);
    }
    out.write_all(listing.as_bytes())
        .map_err(|e| CliError::other(format!("failed to write preset list: {e}")))
}

fn write_secrets_report(
    secrets: &[SecretRequirement],
    format: SecretsReportFormat,
    diag: &mut impl Write,
) -> Result<(), CliError> {
    let report = match format {
        SecretsReportFormat::Text => render_report(secrets),
        SecretsReportFormat::Json => {
            let mut json = serde_json::to_string_pretty(secrets)
                .map_err(|e| CliError::other(format!("failed to serialize secrets: {e}")))?;
            json.push('\n');
            json
        }
    };
    diag.write_all(report.as_bytes())
        .map_err(|e| CliError::other(format!("failed to write secrets report: {e}")))
}

/// Whether `--output` names a directory: an existing one, or any path with a
/// trailing separator.
fn is_directory_target(path: &Path) -> bool {
    path.is_dir()
        || path
            .as_os_str()
            .to_string_lossy()
            .ends_with(std::path::is_separator)
}

fn write_workflow(path: &Path, generated: &Generated) -> Result<PathBuf, CliError> {
    let target = if is_directory_target(path) {
        path.join(&generated.file_name)
    } else {
        path.to_path_buf()
    };
    let io_error = |e: std::io::Error| {
        CliError::other_with_help(
            format!("cannot write {}: {e}", target.display()),
            "Check file permissions and ensure the directory is writable",
        )
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(&target, &generated.workflow).map_err(io_error)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rnflow").chain(args.iter().copied())).unwrap()
    }

    fn run_capture(cli: &Cli) -> (Result<(), CliError>, String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = run(cli, &mut out, &mut diag);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("ci.yaml");
        fs::write(&yaml, "kind: lint\noptions:\n  triggers:\n    branches: [main]\n").unwrap();
        let json = dir.path().join("ci.JSON");
        fs::write(&json, r#"{"kind": "lint", "options": {"triggers": {"branches": ["main"]}}}"#)
            .unwrap();

        assert_eq!(load_document(&yaml).unwrap(), load_document(&json).unwrap());
    }

    #[test]
    fn test_load_reports_syntax_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ci.json");
        fs::write(&path, "kind: lint").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("is not valid JSON"));

        let missing = load_document(&dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(missing, CliError::Config { help: Some(_), .. }));
    }

    #[test]
    fn test_preset_to_stdout() {
        let (result, out, diag) = run_capture(&cli(&["--preset", "react-native-lint"]));
        result.unwrap();
        assert!(out.starts_with("# Generated by rnflow"));
        assert!(out.contains("name: Lint"));
        assert_eq!(diag, "No additional secrets required.\n");
    }

    #[test]
    fn test_output_directory_uses_workflow_file_name() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join(".github/workflows");
        fs::create_dir_all(&nested).unwrap();
        let (result, out, _) = run_capture(&cli(&[
            "--preset",
            "react-native-ios-release",
            "--output",
            nested.to_str().unwrap(),
        ]));
        result.unwrap();
        assert!(out.is_empty());
        let written = fs::read_to_string(nested.join("ios-release-build.yml")).unwrap();
        assert!(written.contains("runs-on: macos-latest"));
    }

    #[test]
    fn test_output_directory_created_from_trailing_separator() {
        let dir = TempDir::new().unwrap();
        let target = format!("{}/.github/workflows/", dir.path().display());
        let (result, out, diag) =
            run_capture(&cli(&["--preset", "react-native-lint", "--output", &target]));
        result.unwrap();
        assert!(out.is_empty());
        assert_eq!(diag, "No additional secrets required.\n");
        let written = dir.path().join(".github/workflows/lint.yml");
        assert!(fs::read_to_string(written).unwrap().contains("name: Lint"));
    }

    #[test]
    fn test_failed_write_leaves_no_report() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "").unwrap();
        let target = blocker.join("ci.yml");
        let (result, _, diag) = run_capture(&cli(&[
            "--preset",
            "react-native-ios-release",
            "--output",
            target.to_str().unwrap(),
        ]));
        assert!(matches!(result, Err(CliError::Other { .. })));
        assert!(diag.is_empty());
    }

    #[test]
    fn test_directory_targets() {
        let dir = TempDir::new().unwrap();
        assert!(is_directory_target(dir.path()));
        assert!(is_directory_target(Path::new("missing/workflows/")));
        assert!(!is_directory_target(Path::new("missing/workflows/ci.yml")));
    }

    #[test]
    fn test_secrets_report_json() {
        let (result, _, diag) = run_capture(&cli(&[
            "--preset",
            "react-native-android-debug",
            "--secrets-report",
            "json",
        ]));
        result.unwrap();
        let report: Value = serde_json::from_str(&diag).unwrap();
        let names: Vec<_> = report
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"FIREBASE_APP_ID"));
        assert!(names.contains(&"SLACK_WEBHOOK_URL"));
    }

    #[test]
    fn test_failed_generation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("ci.yml");
        fs::write(&config, "kind: deploy\n").unwrap();
        let output = dir.path().join("out/ci.yml");
        let (result, out, diag) = run_capture(&cli(&[
            "-c",
            config.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]));
        assert!(matches!(result, Err(CliError::Generation(_))));
        assert!(out.is_empty());
        assert!(diag.is_empty());
        assert!(!output.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_list_presets() {
        let (result, out, _) = run_capture(&cli(&["--list-presets"]));
        result.unwrap();
        assert_eq!(out.lines().count(), PresetRegistry::builtin().len());
        assert!(out.lines().any(|l| l.starts_with("react-native-static-analysis  ")));
    }
}
