mod config;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use config::{CliConfig, OutputFormat};
use form_spec::{
    ChartSpec, FormSpec, StoredResponse, Submission, ValidationResult, VisibilityMode,
    aggregate, answers_schema, build_render_payload, check_logic, render_json_ui,
    render_series_text, render_text, resolve_visibility, tools::tool_definitions, validate,
};
use schemars::schema_for;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form spec, submission and chart helper",
    long_about = "Checks conditional rules, validates submissions and aggregates responses into chart series"
)]
struct Cli {
    /// Log filter (overrides FORMKIT_LOG), e.g. `debug` or `form_spec=trace`.
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,
    /// Output format (overrides FORMKIT_FORMAT).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Model {
    Form,
    Submission,
    Response,
    Chart,
    Tools,
}

#[derive(Subcommand)]
enum Command {
    /// Lint the conditional rules of a form.
    Check {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Print which fields are shown for a set of answers.
    Visible {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Drop answers of hidden fields before evaluating their dependents.
        #[arg(long)]
        cascade: bool,
    },
    /// Validate a submission body against a form.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "SUBMISSION")]
        submission: PathBuf,
    },
    /// Print the answers JSON schema for the currently visible fields.
    Schema {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
    },
    /// Print the JSON schema of a data model, or the agent tool definitions.
    Model {
        #[arg(value_enum)]
        kind: Model,
    },
    /// Render the submission form state for a set of answers.
    Render {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Same meaning as for `visible`.
        #[arg(long)]
        cascade: bool,
    },
    /// Aggregate responses into a chart series.
    Chart {
        #[arg(long, value_name = "CHART")]
        chart: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
    },
    /// Apply one agent tool call to a chart board.
    Tool {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
        /// JSON file with `{ "name": ..., "arguments": ... }`.
        #[arg(long, value_name = "CALL")]
        call: PathBuf,
        /// Board file; created if missing and rewritten after the call.
        #[arg(long, value_name = "BOARD")]
        board: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_env().with_overrides(cli.log, cli.format);
    init_tracing(&config.log_filter);
    let format = config.format;

    match cli.command {
        Command::Check { form } => run_check(&form, format),
        Command::Visible {
            form,
            answers,
            cascade,
        } => run_visible(&form, answers.as_deref(), cascade, format),
        Command::Validate { form, submission } => run_validate(&form, &submission, format),
        Command::Schema { form, answers } => run_schema(&form, answers.as_deref()),
        Command::Model { kind } => run_model(kind),
        Command::Render {
            form,
            answers,
            cascade,
        } => run_render(&form, answers.as_deref(), cascade, format),
        Command::Chart { chart, responses } => run_chart(&chart, &responses, format),
        Command::Tool {
            form,
            responses,
            call,
            board,
        } => run_tool(&form, &responses, &call, board.as_deref()),
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    debug!(path = %path.display(), "reading json input");
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    let value = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse {}: {}", path.display(), err))?;
    Ok(value)
}

fn read_answers(path: Option<&Path>) -> CliResult<Value> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Value::Object(Map::new())),
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_check(form_path: &Path, format: OutputFormat) -> CliResult<()> {
    let spec: FormSpec = read_json(form_path)?;
    let issues = check_logic(&spec);

    match format {
        OutputFormat::Json => print_json(&json!({
            "valid": issues.is_empty(),
            "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Text if issues.is_empty() => {
            println!("Form '{}' rules are consistent.", spec.id)
        }
        OutputFormat::Text => {
            println!("Form '{}' has {} rule issue(s):", spec.id, issues.len());
            for issue in &issues {
                println!("  - {}", issue);
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err("conditional rules are inconsistent".into())
    }
}

fn visibility_mode(cascade: bool) -> VisibilityMode {
    if cascade {
        VisibilityMode::Cascade
    } else {
        VisibilityMode::Direct
    }
}

fn run_visible(
    form_path: &Path,
    answers_path: Option<&Path>,
    cascade: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let spec: FormSpec = read_json(form_path)?;
    let answers = read_answers(answers_path)?;
    let visibility = resolve_visibility(&spec, &answers, visibility_mode(cascade));

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&visibility)?)?,
        OutputFormat::Text => {
            for field in &spec.fields {
                let visible = visibility.get(&field.id).copied().unwrap_or(true);
                let marker = if visible { "shown " } else { "hidden" };
                println!("{} {}", marker, field.id);
            }
        }
    }
    Ok(())
}

fn run_validate(form_path: &Path, submission_path: &Path, format: OutputFormat) -> CliResult<()> {
    let spec: FormSpec = read_json(form_path)?;
    let submission: Submission = read_json(submission_path)?;

    let result = validate(&spec, &submission);
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&result)?)?,
        OutputFormat::Text => {
            println!(
                "Validation result: {}",
                if result.valid { "valid" } else { "invalid" }
            );
            describe_validation(&result);
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn run_schema(form_path: &Path, answers_path: Option<&Path>) -> CliResult<()> {
    let spec: FormSpec = read_json(form_path)?;
    let answers = read_answers(answers_path)?;
    let visibility = resolve_visibility(&spec, &answers, VisibilityMode::Direct);
    print_json(&answers_schema(&spec, &visibility))
}

fn run_model(kind: Model) -> CliResult<()> {
    let schema = match kind {
        Model::Form => serde_json::to_value(schema_for!(FormSpec))?,
        Model::Submission => serde_json::to_value(schema_for!(Submission))?,
        Model::Response => serde_json::to_value(schema_for!(StoredResponse))?,
        Model::Chart => serde_json::to_value(schema_for!(ChartSpec))?,
        Model::Tools => tool_definitions(),
    };
    print_json(&schema)
}

fn run_render(
    form_path: &Path,
    answers_path: Option<&Path>,
    cascade: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let spec: FormSpec = read_json(form_path)?;
    let answers = read_answers(answers_path)?;
    let payload = build_render_payload(&spec, &answers, visibility_mode(cascade));
    match format {
        OutputFormat::Json => print_json(&render_json_ui(&payload)),
        OutputFormat::Text => {
            println!("{}", render_text(&payload));
            Ok(())
        }
    }
}

fn run_chart(chart_path: &Path, responses_path: &Path, format: OutputFormat) -> CliResult<()> {
    let chart: ChartSpec = read_json(chart_path)?;
    chart.check().map_err(|err| err.to_string())?;
    let responses: Vec<StoredResponse> = read_json(responses_path)?;
    let series = aggregate(&chart, &responses);
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&series)?),
        OutputFormat::Text => {
            println!("{}", render_series_text(&chart, &series));
            Ok(())
        }
    }
}

fn run_tool(
    form_path: &Path,
    responses_path: &Path,
    call_path: &Path,
    board_path: Option<&Path>,
) -> CliResult<()> {
    let form: FormSpec = read_json(form_path)?;
    let form_json = serde_json::to_string(&form)?;
    let responses_json = fs::read_to_string(responses_path)?;
    let call_json = fs::read_to_string(call_path)?;
    let board_json = match board_path {
        Some(path) if path.exists() => fs::read_to_string(path)?,
        _ => String::new(),
    };

    let output: Value = serde_json::from_str(&form_component::apply_tool(
        &form.id,
        &form_json,
        &responses_json,
        &board_json,
        &call_json,
    ))?;
    if let Some(error) = output.get("error").and_then(Value::as_str) {
        return Err(error.to_string().into());
    }

    if let Some(path) = board_path {
        fs::write(path, serde_json::to_string_pretty(&output["board"])?)?;
    }
    print_json(&output["result"])
}
