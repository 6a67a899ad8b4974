//! Parameter bounds CLI command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, ParameterSpec};
use crate::output::{format_decimals, print_json, OutputFormat};

/// Row for the bounds table
#[derive(Tabled)]
struct BoundsRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Parameter")]
    label: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl From<&ParameterSpec> for BoundsRow {
    fn from(spec: &ParameterSpec) -> Self {
        Self {
            column: spec.column.clone(),
            label: spec.label.clone(),
            unit: if spec.unit.is_empty() {
                "-".to_string()
            } else {
                spec.unit.clone()
            },
            min: format_decimals(spec.min, spec.decimals),
            max: format_decimals(spec.max, spec.decimals),
            default: format_decimals(spec.default, spec.decimals),
        }
    }
}

/// Show the design parameter bounds
pub async fn show_bounds(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let specs: Vec<ParameterSpec> = client.get("api/v1/parameters").await?;

    match format {
        OutputFormat::Json => print_json(&specs)?,
        OutputFormat::Table => {
            let rows: Vec<BoundsRow> = specs.iter().map(BoundsRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
