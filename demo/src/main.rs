//! Warrant demo CLI
//!
//! Loads a TOML policy file and either answers one access question or
//! validates every policy in the file.
//!
//! Usage:
//!   cargo run -p warrant-demo -- check --policies demo/policies/documents.toml \
//!       --action update --subject '{"id": 10, "role": "member"}' \
//!       --resource '{"type": "doc", "owner_id": 10}'
//!   cargo run -p warrant-demo -- check --policies demo/policies/documents.toml \
//!       --action read --subject '{"id": 10}' --resource-type doc
//!   cargo run -p warrant-demo -- validate --policies demo/policies/documents.toml \
//!       --context-schema demo/policies/context.schema.json

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use warrant_contracts::{
    context::{AuthContext, DynamicResource},
    error::{WarrantError, WarrantResult},
};
use warrant_core::{traits::PolicySource, AccessControl};
use warrant_diagnostics::{FanOut, InMemoryDiagnostics, TracingDiagnostics};
use warrant_policy::TomlPolicySource;
use warrant_verify::{PolicyValidator, ValidatingPolicySource};

const EXIT_ALLOW: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_DENY: i32 = 2;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Warrant: attribute-based access control over TOML policy files.
#[derive(Parser)]
#[command(
    name = "warrant-demo",
    about = "Warrant ABAC demo",
    long_about = "Answers access questions against a TOML policy file and validates\n\
                  the condition trees it contains."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide whether a subject may perform an action.
    Check(CheckArgs),
    /// Validate every policy in a policy file.
    Validate(ValidateArgs),
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["resource", "resource_type"])
))]
struct CheckArgs {
    /// TOML policy file.
    #[arg(long)]
    policies: PathBuf,

    /// Action name, one of the file's `actions`.
    #[arg(long)]
    action: String,

    /// Subject attributes as a JSON object.
    #[arg(long)]
    subject: String,

    /// Resource instance as a JSON object carrying a `type` field.
    #[arg(long)]
    resource: Option<String>,

    /// Bare resource type, for type-level questions.
    #[arg(long)]
    resource_type: Option<String>,

    /// JSON Schema of the evaluation context. Enables policy validation.
    #[arg(long)]
    context_schema: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    /// TOML policy file.
    #[arg(long)]
    policies: PathBuf,

    /// JSON Schema of the evaluation context.
    #[arg(long)]
    context_schema: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for lookup and evaluation traces.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args).await,
        Command::Validate(args) => run_validate(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("warrant-demo error: {}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

// ── check ─────────────────────────────────────────────────────────────────────

async fn run_check(args: CheckArgs) -> WarrantResult<i32> {
    let policies = TomlPolicySource::from_file(&args.policies)?;
    let actions = policies.action_set().clone();
    let evaluator = policies.evaluator();

    let subject = parse_json("--subject", &args.subject)?;
    let resource = args
        .resource
        .as_deref()
        .map(|raw| parse_json("--resource", raw).and_then(DynamicResource::from_value))
        .transpose()?;

    let source: Box<dyn PolicySource<Value>> = match &args.context_schema {
        Some(path) => {
            let validator = load_validator(path, evaluator.max_depth())?;
            if let Some(resource) = &resource {
                let ctx = AuthContext::for_resource(&subject, resource)?;
                let report = validator.validate_context(&ctx);
                if !report.passed {
                    println!("warning: context does not match schema: {}", report.summary());
                }
            }
            Box::new(ValidatingPolicySource::new(policies, validator))
        }
        None => Box::new(policies),
    };

    let recorded = InMemoryDiagnostics::new();
    let sink = FanOut::new()
        .with(Box::new(TracingDiagnostics))
        .with(Box::new(recorded.clone()));

    let control: AccessControl<Value> =
        AccessControl::new(actions, source, Box::new(sink)).with_evaluator(Box::new(evaluator));
    let permissions = control.can(subject);
    let checker = permissions.action(&args.action).ok_or_else(|| WarrantError::Config {
        reason: format!(
            "unknown action '{}'; configured actions: {}",
            args.action,
            control.actions().iter().collect::<Vec<_>>().join(", ")
        ),
    })?;

    let allowed = match (&resource, &args.resource_type) {
        (Some(resource), _) => checker.resource(resource).await,
        (None, Some(resource_type)) => checker.resource_type(resource_type).await,
        (None, None) => {
            return Err(WarrantError::Config {
                reason: "either --resource or --resource-type is required".to_string(),
            })
        }
    };

    println!("{}", if allowed { "ALLOW" } else { "DENY" });
    for event in recorded.events() {
        println!("  diagnostic #{}: {}", event.sequence, event.diagnostic);
    }

    Ok(if allowed { EXIT_ALLOW } else { EXIT_DENY })
}

// ── validate ──────────────────────────────────────────────────────────────────

fn run_validate(args: ValidateArgs) -> WarrantResult<i32> {
    let policies = TomlPolicySource::from_file(&args.policies)?;
    let max_depth = policies.config().max_depth;
    let validator = match &args.context_schema {
        Some(path) => load_validator(path, max_depth)?,
        None => PolicyValidator::new().with_max_depth(max_depth),
    };

    let report = validator.validate_entitlements(policies.entitlements());
    let policy_count: usize = policies.entitlements().iter().map(|e| e.policies.len()).sum();

    if report.passed {
        println!(
            "OK: {} policies in {} entitlements are valid",
            policy_count,
            policies.entitlements().len()
        );
        return Ok(EXIT_ALLOW);
    }

    println!("FAILED: {} problems found", report.failures.len());
    for failure in &report.failures {
        println!("  [{}] {}", failure.rule_id, failure.message);
    }
    Ok(EXIT_ERROR)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_json(flag: &str, raw: &str) -> WarrantResult<Value> {
    serde_json::from_str(raw).map_err(|e| WarrantError::Config {
        reason: format!("{flag} is not valid JSON: {e}"),
    })
}

fn load_validator(path: &Path, max_depth: usize) -> WarrantResult<PolicyValidator> {
    let raw = std::fs::read_to_string(path).map_err(|e| WarrantError::Config {
        reason: format!("failed to read context schema '{}': {}", path.display(), e),
    })?;
    let schema = parse_json("--context-schema", &raw)?;
    PolicyValidator::new()
        .with_max_depth(max_depth)
        .with_context_schema(schema)
}
