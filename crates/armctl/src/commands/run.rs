//! `run` and `cleanup` command implementations

use armctl_core::{
    OperationStatus, ProgressCallback, ProgressEvent, RunOverrides, RunReport, SampleKind,
    SampleSettings, Sequencer,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::cli::{OutputFormat, TargetArgs};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

/// Everything `run` needs beyond the global flags
pub struct RunRequest<'a> {
    pub sample: SampleKind,
    pub target: &'a TargetArgs,
    pub keep_resources: bool,
    pub template_dir: Option<&'a PathBuf>,
    pub names: &'a [String],
}

/// Flags that override environment and profile values
pub fn overrides(target: &TargetArgs, keep_resources: bool) -> RunOverrides {
    RunOverrides {
        subscription_id: target.subscription.clone(),
        location: target.location.clone(),
        resource_group: target.resource_group.clone(),
        keep_resources: keep_resources.then_some(true),
        poll_interval: target.poll_interval.map(Duration::from_secs),
        poll_timeout: target.poll_timeout.map(Duration::from_secs),
        management_endpoint: None,
    }
}

/// Sample settings from `--name` pairs and `--template-dir`
pub fn sample_settings(names: &[String], template_dir: Option<&PathBuf>) -> CliResult<SampleSettings> {
    let mut settings = SampleSettings::from_pairs(names)?;
    if let Some(dir) = template_dir {
        settings = settings.with_template_dir(dir.clone());
    }
    Ok(settings)
}

pub async fn handle_run(
    request: RunRequest<'_>,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let run_config = conn_mgr.run_config(
        profile_name,
        &overrides(request.target, request.keep_resources),
    )?;

    // Bad settings are rejected before the credential is even built
    let settings = sample_settings(request.names, request.template_dir)?;
    let workflow = request.sample.build(&settings)?;
    debug!("Built workflow for sample {}", request.sample);

    let provider = conn_mgr.create_provider(profile_name, &run_config)?;

    let pb = spinner(output_format);
    pb.set_message(format!("Running {}", request.sample));
    let result = Sequencer::new(&run_config, &provider)
        .with_progress(progress_callback(&pb))
        .run(workflow.as_ref())
        .await;
    pb.finish_and_clear();

    let report = result?;
    info!(sample = %report.sample, stage = %report.stage, "run finished");
    print_report(&report, output_format)?;
    Ok(())
}

pub async fn handle_cleanup(
    target: &TargetArgs,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let run_config = conn_mgr.run_config(profile_name, &overrides(target, false))?;
    let provider = conn_mgr.create_provider(profile_name, &run_config)?;

    let pb = spinner(output_format);
    pb.set_message(format!("Deleting {}", run_config.resource_group));
    let result = Sequencer::new(&run_config, &provider)
        .with_progress(progress_callback(&pb))
        .teardown()
        .await;
    pb.finish_and_clear();
    let deleted = result?;

    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(
            json!({
                "resource_group": run_config.resource_group,
                "deleted": deleted,
                "kept": run_config.keep_resources,
            }),
            output_format,
        )?,
        OutputFormat::Table => {
            if deleted {
                println!("cleaned up successfully.");
            } else if run_config.keep_resources {
                println!("Keeping resource group '{}'", run_config.resource_group);
            } else {
                println!("Resource group '{}' does not exist", run_config.resource_group);
            }
        }
    }
    Ok(())
}

fn print_report(report: &RunReport, output_format: OutputFormat) -> CliResult<()> {
    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(report, output_format)?,
        OutputFormat::Table => {
            let rows: Vec<_> = report
                .steps
                .iter()
                .map(|step| {
                    json!({
                        "step": step.label,
                        "result": step
                            .id
                            .clone()
                            .map(serde_json::Value::String)
                            .or_else(|| step.detail.clone())
                            .unwrap_or(serde_json::Value::Null),
                    })
                })
                .collect();
            println!("{}", output::render_table(&serde_json::Value::Array(rows)));
            println!(
                "{} {} in '{}' ({})",
                "\u{2713}".green(),
                report.sample.bold(),
                report.resource_group,
                report.location
            );
            if report.torn_down {
                println!("cleaned up successfully.");
            } else {
                println!("Resources kept in '{}'", report.resource_group);
            }
        }
    }
    Ok(())
}

/// Spinner on stderr, hidden unless the output is a table
fn spinner(output_format: OutputFormat) -> ProgressBar {
    if output_format != OutputFormat::Table {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Box::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started { operation } => {
            pb.set_message(format!("{} started", operation));
        }
        ProgressEvent::Polling {
            operation,
            status,
            elapsed,
        } => {
            pb.set_message(format!(
                "{}: {} ({:.0}s)",
                operation,
                format_status(status),
                elapsed.as_secs_f64()
            ));
        }
        ProgressEvent::Completed { operation } => {
            pb.println(format!("{} {}", "\u{2713}".green(), operation));
        }
        ProgressEvent::Failed { operation, error } => {
            pb.println(format!("{} {}: {}", "\u{2717}".red(), operation, error));
        }
    })
}

fn format_status(status: OperationStatus) -> String {
    match status {
        OperationStatus::InProgress => format!("\u{21bb} {}", status),
        OperationStatus::Succeeded => format!("\u{2713} {}", status),
        OperationStatus::Failed => format!("\u{2717} {}", status),
        OperationStatus::Canceled => format!("\u{2298} {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keep_flag_only_overrides_when_set() {
        let target = TargetArgs {
            subscription: Some("sub".to_string()),
            poll_interval: Some(3),
            ..Default::default()
        };
        let unset = overrides(&target, false);
        assert_eq!(unset.keep_resources, None);
        assert_eq!(unset.poll_interval, Some(Duration::from_secs(3)));
        assert_eq!(overrides(&target, true).keep_resources, Some(true));
    }

    #[test]
    fn settings_carry_template_dir() {
        let dir = PathBuf::from("/tmp/templates");
        let settings =
            sample_settings(&["deployment=d1".to_string()], Some(&dir)).unwrap();
        assert_eq!(settings.get("deployment", "x"), "d1");
        assert_eq!(settings.template_dir(), Some(&dir));
    }

    #[test]
    fn malformed_setting_is_invalid_input() {
        let err = sample_settings(&["oops".to_string()], None).unwrap_err();
        assert!(err.to_string().starts_with("Invalid input"));
    }
}
