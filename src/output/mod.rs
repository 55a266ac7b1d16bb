pub mod charts;
pub mod pdf;

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::error::{RiskError, RiskResult};
use crate::features::FEATURE_NAMES;
use crate::scoring::{summary, CohortSummary, RiskContext, RocCurve, ScoredRecord};

pub const CSV_FILE: &str = "cardiac_risk_report.csv";
pub const PDF_FILE: &str = "cardiac_risk_report.pdf";
pub const SUMMARY_FILE: &str = "cohort_summary.json";

/// Columns appended after the feature columns, in this order.
pub const SCORE_COLUMNS: [&str; 3] = ["riskLabel", "riskProbabilityPercent", "riskCategory"];

/// Machine-readable companion to the PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub cohort: CohortSummary,
    pub reference_roc: RocCurve,
}

/// Everything produced for one scored batch. Nothing is written until `save_results`.
#[derive(Debug, Clone)]
pub struct Report {
    pub summary: ReportSummary,
    pub csv: Vec<u8>,
    pub pdf: Vec<u8>,
}

/// Serialize a scored batch: feature columns then label, probability percent, category.
pub fn to_csv(scored: &[ScoredRecord]) -> RiskResult<Vec<u8>> {
    if scored.is_empty() {
        return Err(RiskError::EmptyBatch);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.extend(SCORE_COLUMNS);
    writer.write_record(&header)?;

    for record in scored {
        let mut row: Vec<String> = record.record.to_array().iter().map(|v| v.to_string()).collect();
        row.push(record.label.to_string());
        row.push(format!("{:.2}", record.probability_percent()));
        row.push(record.category.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| RiskError::Io(e.into_error()))
}

/// Render the CSV, charts and PDF for a scored batch entirely in memory.
pub fn build_report(
    ctx: &RiskContext,
    scored: &[ScoredRecord],
    config: &ReportConfig,
) -> RiskResult<Report> {
    let cohort = summary::summarize(scored)?;
    let roc = ctx.roc_curve()?;

    let csv = to_csv(scored)?;

    let pie = charts::category_pie(&cohort, config.chart_width_px, config.chart_height_px)?;
    let roc_image = charts::roc_chart(roc, config.chart_width_px, config.chart_height_px)?;
    let pdf = pdf::to_pdf(&cohort, &pie, &roc_image, roc.auc, config)?;

    info!(
        "Built report for {} patients ({} at risk, reference AUC {:.3})",
        cohort.total_count, cohort.risky_count, roc.auc
    );

    Ok(Report {
        summary: ReportSummary {
            generated_at: Utc::now(),
            model_version: ctx.model().version().to_string(),
            cohort,
            reference_roc: roc.clone(),
        },
        csv,
        pdf,
    })
}

/// Write the CSV, PDF and JSON summary into `output_dir`.
pub fn save_results<P: AsRef<Path>>(report: &Report, output_dir: P) -> RiskResult<Vec<PathBuf>> {
    let output_path = output_dir.as_ref();

    let csv_path = output_path.join(CSV_FILE);
    std::fs::write(&csv_path, &report.csv)?;

    let pdf_path = output_path.join(PDF_FILE);
    std::fs::write(&pdf_path, &report.pdf)?;

    let summary_path = output_path.join(SUMMARY_FILE);
    save_report_summary(&report.summary, &summary_path)?;

    info!("Report saved to {:?}", output_path);
    Ok(vec![csv_path, pdf_path, summary_path])
}

fn save_report_summary<P: AsRef<Path>>(summary: &ReportSummary, path: P) -> RiskResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Text summary printed after a batch run.
pub fn console_summary(report: &Report) -> String {
    let cohort = &report.summary.cohort;
    let mut lines: Vec<String> = cohort.summary_lines().to_vec();
    lines.extend(cohort.distribution_lines());
    lines.push(format!(
        "Reference ROC AUC (model {}): {:.2}",
        report.summary.model_version, report.summary.reference_roc.auc
    ));
    lines.join("\n")
}
