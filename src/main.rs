use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

mod config;
mod dataset;
mod error;
mod features;
mod model;
mod normalize;
mod output;
mod scoring;

#[cfg(test)]
mod fixtures;

use crate::config::Config;
use crate::features::{Categorical, ChestPain, Flag, PatientRecord, RestingEcg, Sex, StSlope, Thal};
use crate::scoring::RiskContext;

#[derive(Parser)]
#[command(name = "cardio_risk")]
#[command(about = "Cardiac risk scoring with cohort reports")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a single patient given on the command line
    Predict(PatientArgs),

    /// Score a CSV batch and write the CSV, PDF and JSON reports
    Batch {
        /// Input CSV with the 13 feature columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the ROC AUC of the model on the reference dataset
    Roc,
}

#[derive(Args)]
struct PatientArgs {
    /// Age in years (20-100)
    #[arg(long)]
    age: f64,

    /// Female/Male or 0/1
    #[arg(long, value_parser = Sex::parse)]
    sex: Sex,

    /// Chest pain type, label or code 0-3
    #[arg(long, value_parser = ChestPain::parse)]
    cp: ChestPain,

    /// Resting blood pressure in mmHg (80-200)
    #[arg(long)]
    trestbps: f64,

    /// Serum cholesterol in mg/dl (100-600)
    #[arg(long)]
    chol: f64,

    /// Fasting blood sugar > 120 mg/dl, Yes/No or 1/0
    #[arg(long, value_parser = Flag::parse)]
    fbs: Flag,

    /// Resting ECG result, label or code 0-2
    #[arg(long, value_parser = RestingEcg::parse)]
    restecg: RestingEcg,

    /// Maximum heart rate achieved (60-220)
    #[arg(long)]
    thalach: f64,

    /// Exercise induced angina, Yes/No or 1/0
    #[arg(long, value_parser = Flag::parse)]
    exang: Flag,

    /// ST depression induced by exercise (0-6)
    #[arg(long)]
    oldpeak: f64,

    /// Slope of the peak exercise ST segment, label or code 0-2
    #[arg(long, value_parser = StSlope::parse)]
    slope: StSlope,

    /// Major vessels colored by fluoroscopy (0-3)
    #[arg(long, default_value_t = 0.0)]
    ca: f64,

    /// Thalassemia, label or code 0-3
    #[arg(long, value_parser = Thal::parse)]
    thal: Thal,
}

impl PatientArgs {
    fn to_record(&self) -> PatientRecord {
        PatientRecord {
            age: self.age,
            sex: f64::from(self.sex.code()),
            cp: f64::from(self.cp.code()),
            trestbps: self.trestbps,
            chol: self.chol,
            fbs: f64::from(self.fbs.code()),
            restecg: f64::from(self.restecg.code()),
            thalach: self.thalach,
            exang: f64::from(self.exang.code()),
            oldpeak: self.oldpeak,
            slope: f64::from(self.slope.code()),
            ca: self.ca,
            thal: f64::from(self.thal.code()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    // Load configuration
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
    info!("Loaded configuration from {:?}", cli.config);

    let ctx = RiskContext::initialize(&config).context("failed to initialize scoring context")?;

    match &cli.command {
        Command::Predict(args) => {
            let record = args.to_record();
            debug!(
                "Patient: sex {}, chest pain {}, ECG {}, slope {}, thal {}",
                args.sex.label(),
                args.cp.label(),
                args.restecg.label(),
                args.slope.label(),
                args.thal.label()
            );
            record.validate_entry().context("invalid patient record")?;
            let prediction = ctx.predict_one(&record)?;
            debug!("Prediction: {:?}", prediction);
            println!("{}", prediction.message());
            println!("Risk category: {}", prediction.category());
        }
        Command::Batch { input, output } => {
            let records = dataset::read_batch_file(input)
                .with_context(|| format!("failed to read batch {:?}", input))?;
            info!("Scoring {} patients from {:?}", records.len(), input);

            let scored = ctx.score_batch(&records)?;
            let report = output::build_report(&ctx, &scored, &config.report)?;

            // Create output directory if it doesn't exist
            std::fs::create_dir_all(output)
                .with_context(|| format!("failed to create output directory {:?}", output))?;
            output::save_results(&report, output)?;
            info!("Results saved to {:?}", output);

            println!("{}", output::console_summary(&report));
        }
        Command::Roc => {
            let curve = ctx.roc_curve()?;
            println!(
                "Reference ROC AUC: {:.4} ({} points, {} patients, {} positive)",
                curve.auc,
                curve.points.len(),
                ctx.reference().len(),
                ctx.reference().positives()
            );
        }
    }

    Ok(())
}
