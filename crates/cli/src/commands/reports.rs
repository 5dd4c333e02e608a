//! Usage report commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Report, Series};
use crate::output::{
    color_alignment, format_slot, format_status, print_info, print_warning, OutputFormat, SENTINEL,
};

/// Which grouping of an experiment's usage to fetch
#[derive(Debug, Clone, Copy)]
pub enum ReportScope {
    Pods,
    Workloads,
    Nodes,
}

impl ReportScope {
    fn path_segment(&self) -> &'static str {
        match self {
            ReportScope::Pods => "pods",
            ReportScope::Workloads => "workloads",
            ReportScope::Nodes => "nodes",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReportScope::Pods => "Usage by Pod",
            ReportScope::Workloads => "Usage by Workload",
            ReportScope::Nodes => "Usage by Node",
        }
    }
}

/// Row for one time slot of a series
#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn slot_rows(series: &Series) -> Vec<SlotRow> {
    series
        .time_axis
        .iter()
        .enumerate()
        .map(|(i, time)| SlotRow {
            time: time.clone(),
            cpu: series.cpu.get(i).copied().map(format_slot).unwrap_or_default(),
            memory: series
                .memory
                .get(i)
                .copied()
                .map(format_slot)
                .unwrap_or_default(),
            status: format_status(
                series
                    .app_status
                    .as_ref()
                    .and_then(|status| status.get(i).copied()),
            ),
        })
        .collect()
}

/// Show a usage report for an experiment
pub async fn show_report(
    client: &ApiClient,
    scope: ReportScope,
    chaos_name: &str,
    format: OutputFormat,
) -> Result<()> {
    let url = client.endpoint(&["chaos", chaos_name, "usage", scope.path_segment()])?;
    let report: Report = client.get(url).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{} {}", scope.title().bold(), report.chaos_name.cyan());
            println!("{}", "=".repeat(50));

            if report.items.is_empty() {
                print_info("Experiment has no matching resources");
                return Ok(());
            }

            for series in &report.items {
                println!(
                    "{} ({})",
                    series.resource_label.bold(),
                    color_alignment(&series.alignment)
                );

                let table = tabled::Table::new(slot_rows(series))
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
                println!();
            }

            let gaps: usize = report
                .items
                .iter()
                .map(|s| s.cpu.iter().filter(|v| **v == SENTINEL).count())
                .sum();
            if gaps > 0 {
                print_warning(&format!("{} slots had no matching sample", gaps));
            }
        }
    }

    Ok(())
}
