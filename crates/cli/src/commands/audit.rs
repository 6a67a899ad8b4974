//! Audit CLI command

use anyhow::{bail, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, AuditReport, AuditRequest, DesignParameters, Narrative};
use crate::output::{
    format_decimals, format_timestamp, print_error, print_info, print_json, print_warning,
    OutputFormat,
};

const MISSING_KEY: &str = "Please provide a Gemini API key (--api-key or GEMINI_API_KEY) to generate the technical report";

/// Row for the input parameters table
#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Parameter")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn parameter_rows(p: &DesignParameters) -> Vec<ParameterRow> {
    vec![
        ParameterRow {
            name: "f'c (MPa)",
            value: format_decimals(p.fc, 0),
        },
        ParameterRow {
            name: "b (mm)",
            value: format_decimals(p.b, 0),
        },
        ParameterRow {
            name: "d (mm)",
            value: format_decimals(p.d, 0),
        },
        ParameterRow {
            name: "a (mm)",
            value: format_decimals(p.a, 0),
        },
        ParameterRow {
            name: "rho",
            value: format_decimals(p.rho, 4),
        },
    ]
}

/// Require a non-blank key before contacting the service
fn require_api_key(api_key: Option<String>) -> Result<String> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => {
            print_error(MISSING_KEY);
            bail!("missing API key")
        }
    }
}

/// Run a full audit
pub async fn run_audit(
    client: &ApiClient,
    parameters: DesignParameters,
    api_key: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let api_key = require_api_key(api_key)?;

    let request = AuditRequest {
        parameters,
        api_key,
    };
    let report: AuditReport = client.post("api/v1/audit", &request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &AuditReport) {
    println!("{}", "Corbel Audit".bold());
    println!("{}", "=".repeat(60));

    let table = tabled::Table::new(parameter_rows(&report.parameters))
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!();

    println!(
        "Predicted load capacity (Pu): {}",
        format!("{:.2} kN", report.predicted_load_kn).cyan().bold()
    );
    print_info(&format!("a/d ratio: {:.2}", report.ad_ratio));
    if let Some(warning) = &report.warning {
        print_warning(warning);
    }
    println!();

    println!("{}", "Technical Report".bold());
    println!("{}", "-".repeat(60));
    match &report.narrative {
        Narrative::Generated { text } => println!("{}", text),
        Narrative::Failed { error } => {
            print_error(&format!("Connection error with the AI service: {}", error))
        }
    }
    println!();
    println!(
        "Model {} | {}",
        report.model_version,
        format_timestamp(report.generated_at)
    );
}
