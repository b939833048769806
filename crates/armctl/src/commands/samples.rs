//! `samples` command implementation

use armctl_core::SampleKind;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;
use crate::output::print_output;

pub fn handle_samples(output_format: OutputFormat) -> CliResult<()> {
    let catalog = catalog();
    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(catalog, output_format)?,
        OutputFormat::Table => {
            let rows: Vec<_> = SampleKind::all()
                .iter()
                .map(|kind| {
                    let keys: Vec<_> = kind.settings().iter().map(|(k, _)| *k).collect();
                    json!({
                        "sample": kind.name(),
                        "description": kind.description(),
                        "settings": keys.join(", "),
                    })
                })
                .collect();
            print_output(rows, output_format)?;
        }
    }
    Ok(())
}

/// Every sample with its settings and their defaults
fn catalog() -> Value {
    Value::Array(
        SampleKind::all()
            .iter()
            .map(|kind| {
                let settings: serde_json::Map<String, Value> = kind
                    .settings()
                    .iter()
                    .map(|(k, v)| (k.to_string(), json!(v)))
                    .collect();
                json!({
                    "name": kind.name(),
                    "description": kind.description(),
                    "settings": settings,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_sample() {
        let catalog = catalog();
        let names: Vec<_> = catalog
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names.len(), SampleKind::all().len());
        assert!(names.contains(&"service-bus".to_string()));
        assert!(catalog[0]["settings"].is_object());
    }
}
