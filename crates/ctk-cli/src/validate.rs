//! # Validate Subcommand
//!
//! Scans one or more repository roots for skill, subagent and MCP-server
//! contributions, checks each against its structural rules and manifest
//! schema, and prints the report.
//!
//! Configuration is layered: built-in defaults, then the `--config` file,
//! then command-line flags.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use ctk_core::LintConfig;
use ctk_lint::{prepare_registry, LintEngine, ValidationReport};

/// Every entry passed.
pub const EXIT_PASSED: u8 = 0;
/// At least one entry failed.
pub const EXIT_FAILED: u8 = 1;
/// Bad arguments, configuration or schemas; no report was produced.
pub const EXIT_USAGE: u8 = 2;

/// Report rendering.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One block per entry followed by a summary line.
    #[default]
    Text,
    /// JSON array of entry reports in scan order.
    Json,
    /// JSON object with the overall status, summary counts and entries.
    JsonSummary,
}

/// Arguments for the `ctk validate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Repository root to scan. May be given more than once.
    #[arg(long = "path", value_name = "ROOT", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Directory of `<identifier>.schema.json` documents overriding the
    /// built-in schemas.
    #[arg(long = "schemas", value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-file size ceiling in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,
}

impl Default for ValidateArgs {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            strict: false,
            format: OutputFormat::Text,
            schema_dir: None,
            jobs: None,
            max_file_size: None,
        }
    }
}

/// Execute the validate subcommand, writing the report to stdout.
///
/// Returns [`EXIT_PASSED`] or [`EXIT_FAILED`]. Errors mean no report was
/// produced and map to [`EXIT_USAGE`] in `main`.
pub fn run_validate(args: &ValidateArgs, config: Option<&Path>) -> Result<u8> {
    let report = validate(args, config)?;
    let rendered = render(&report, args.format)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write report")?;

    Ok(exit_code(&report))
}

/// Resolve configuration and run the engine.
pub fn validate(args: &ValidateArgs, config: Option<&Path>) -> Result<ValidationReport> {
    let config = resolve_config(args, config)?;
    let registry = prepare_registry(&config).context("failed to load schemas")?;

    tracing::info!(
        paths = ?args.paths,
        strict = args.strict,
        schema_dir = ?config.schema_dir,
        "validating contributions"
    );

    LintEngine::new(&config, &registry)
        .run(&args.paths, args.strict)
        .context("validation aborted")
}

/// Defaults, then the configuration file, then flags.
pub fn resolve_config(args: &ValidateArgs, path: Option<&Path>) -> Result<LintConfig> {
    let mut config = match path {
        Some(path) => LintConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => LintConfig::default(),
    };

    if let Some(dir) = &args.schema_dir {
        config.schema_dir = Some(dir.clone());
    }
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    if let Some(max) = args.max_file_size {
        config.max_file_size = max;
    }

    config.check()?;
    tracing::debug!(
        max_file_size = config.max_file_size,
        jobs = ?config.jobs,
        kinds = config.kinds.iter().count(),
        "configuration resolved"
    );
    Ok(config)
}

/// Render the report in the requested format.
pub fn render(report: &ValidationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.render_text()),
        OutputFormat::Json => report.to_json().context("failed to serialize report"),
        OutputFormat::JsonSummary => report
            .to_json_summary()
            .context("failed to serialize report"),
    }
}

/// Process exit code for a finished run.
pub fn exit_code(report: &ValidationReport) -> u8 {
    if report.passed() {
        EXIT_PASSED
    } else {
        EXIT_FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn args_for(root: &Path) -> ValidateArgs {
        ValidateArgs {
            paths: vec![root.to_path_buf()],
            ..ValidateArgs::default()
        }
    }

    #[test]
    fn flags_override_the_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("ctk.yaml");
        fs::write(&file, "max_file_size: 4096\njobs: 2\nschema_dir: schemas\n").unwrap();

        let from_file = resolve_config(&ValidateArgs::default(), Some(&file)).unwrap();
        assert_eq!(from_file.max_file_size, 4096);
        assert_eq!(from_file.jobs, Some(2));
        assert_eq!(from_file.schema_dir, Some(tmp.path().join("schemas")));

        let args = ValidateArgs {
            jobs: Some(5),
            max_file_size: Some(10),
            schema_dir: Some(PathBuf::from("/elsewhere")),
            ..ValidateArgs::default()
        };
        let merged = resolve_config(&args, Some(&file)).unwrap();
        assert_eq!(merged.max_file_size, 10);
        assert_eq!(merged.jobs, Some(5));
        assert_eq!(merged.schema_dir, Some(PathBuf::from("/elsewhere")));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let args = ValidateArgs {
            jobs: Some(0),
            ..ValidateArgs::default()
        };
        let err = resolve_config(&args, None).unwrap_err();
        assert!(format!("{err:#}").contains("jobs must be at least 1"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = resolve_config(&ValidateArgs::default(), Some(Path::new("/no/such/ctk.yaml")))
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to load configuration"));
    }

    #[test]
    fn exit_code_follows_status() {
        let tmp = tempfile::tempdir().unwrap();
        touch(
            &tmp.path().join("subagents/examples/reviewer/config.json"),
            r#"{"name": "reviewer", "model": "m", "system": "s"}"#,
        );
        touch(&tmp.path().join("subagents/examples/reviewer/README.md"), "# r\n");
        let report = validate(&args_for(tmp.path()), None).unwrap();
        assert_eq!(exit_code(&report), EXIT_PASSED);

        touch(
            &tmp.path().join("subagents/examples/broken/config.json"),
            r#"{"name": "broken"}"#,
        );
        let report = validate(&args_for(tmp.path()), None).unwrap();
        assert_eq!(exit_code(&report), EXIT_FAILED);
    }

    #[test]
    fn json_rendering_is_parseable() {
        let tmp = tempfile::tempdir().unwrap();
        touch(
            &tmp.path().join("subagents/examples/broken/config.json"),
            r#"{"name": "broken"}"#,
        );
        let report = validate(&args_for(tmp.path()), None).unwrap();
        let json = render(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["entry"], "broken");
        assert_eq!(value[0]["status"], "failed");

        let json = render(&report, OutputFormat::JsonSummary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["entries"][0]["entry"], "broken");

        let text = render(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("subagent broken"));
    }

    #[test]
    fn bad_schema_dir_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("schemas/skill.schema.json"), "not json");
        let args = ValidateArgs {
            schema_dir: Some(tmp.path().join("schemas")),
            ..args_for(tmp.path())
        };
        let err = validate(&args, None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load schemas"));
    }
}
