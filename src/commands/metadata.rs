use crate::cli::OutputFormat;
use crate::config::Config;
use crate::fits::{open_readonly, HduSelector};
use crate::metadata::{derive_from, DerivedField, DerivedValue};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
struct FieldRow {
    field: DerivedField,
    keyword: &'static str,
    value: Option<DerivedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn show_metadata(
    fitsfile: &Path,
    extension: Option<&str>,
    fields: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let which = HduSelector::parse(extension)?;
    let fields: Vec<DerivedField> = match fields {
        Some(list) => list
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()?,
        None => DerivedField::ALL.to_vec(),
    };

    // One open handle for every field
    let mut fits = open_readonly(fitsfile)?;
    let rows: Vec<FieldRow> = fields
        .into_iter()
        .map(|field| match derive_from(field, &mut fits, &which, config) {
            Ok(value) => FieldRow {
                field,
                keyword: field.source_keyword(),
                value: Some(value),
                error: None,
            },
            Err(e) => {
                warn!("Cannot derive {} from {}: {}", field, fitsfile.display(), e);
                FieldRow {
                    field,
                    keyword: field.source_keyword(),
                    value: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            println!("{:<10} {:<10} {:<30}", "Field", "Keyword", "Value");
            println!("{:-<52}", "");
            for row in rows {
                let value = row
                    .value
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<10} {:<10} {:<30}", row.field.name(), row.keyword, value);
            }
        }
    }

    Ok(())
}
