//! # Letterpress CLI
//!
//! Usage:
//!   letterpress render template.json records.json -o out/
//!   letterpress render template.json records.json --config batch.json --workers 4
//!   letterpress inspect template.json records.json --record 3

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use letterpress::error::Result;
use letterpress::{
    layout_fields, records_from_json, render_batch, BatchConfig, CancelToken, FieldErrorPolicy,
    FontContext, Template,
};

#[derive(Parser)]
#[command(name = "letterpress")]
#[command(version)]
#[command(about = "Merge tabular records into page-positioned PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one PDF per record
    Render {
        /// Template JSON file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Records JSON file (an array of objects)
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        /// Batch configuration JSON file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long, env = "LETTERPRESS_WORKERS")]
        workers: Option<usize>,

        /// Column used to name output files
        #[arg(long)]
        key_column: Option<String>,

        /// Prefix for output file names
        #[arg(long)]
        prefix: Option<String>,

        /// What to do when a field fails: skip or fail-record
        #[arg(long, value_name = "POLICY")]
        field_errors: Option<FieldErrorPolicy>,

        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the draw commands of every field for one record
    Inspect {
        /// Template JSON file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Records JSON file (an array of objects)
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        /// Record number, starting at 1
        #[arg(short, long, default_value = "1")]
        record: usize,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            template,
            records,
            config,
            output,
            workers,
            key_column,
            prefix,
            field_errors,
            json,
        } => {
            let overrides = Overrides {
                output,
                workers,
                key_column,
                prefix,
                field_errors,
            };
            cmd_render(&template, &records, config.as_deref(), overrides, json)
        }
        Commands::Inspect {
            template,
            records,
            record,
            compact,
        } => cmd_inspect(&template, &records, record, compact),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Command-line values that win over the config file.
struct Overrides {
    output: Option<PathBuf>,
    workers: Option<usize>,
    key_column: Option<String>,
    prefix: Option<String>,
    field_errors: Option<FieldErrorPolicy>,
}

impl Overrides {
    fn apply(self, config: &mut BatchConfig) {
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(n) = self.workers {
            config.workers = n;
        }
        if let Some(col) = self.key_column {
            config.key_column = Some(col);
        }
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(policy) = self.field_errors {
            config.field_errors = policy;
        }
    }
}

fn load_inputs(template: &Path, records: &Path) -> Result<(Template, Vec<letterpress::DataRecord>)> {
    let template = Template::from_json(&fs::read_to_string(template)?)?;
    let records = records_from_json(&fs::read_to_string(records)?)?;
    Ok((template, records))
}

fn cmd_render(
    template: &Path,
    records: &Path,
    config: Option<&Path>,
    overrides: Overrides,
    json: bool,
) -> Result<ExitCode> {
    let (template, records) = load_inputs(template, records)?;
    let mut config = match config {
        Some(path) => BatchConfig::from_json_file(path)?,
        None => BatchConfig::default(),
    };
    overrides.apply(&mut config);

    let font_context = FontContext::new();
    let result = render_batch(&template, &records, &config, &font_context, &CancelToken::new())?;

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("✗ Failed to serialize result: {}", e),
        }
    } else {
        for failure in &result.errors {
            eprintln!("✗ record {} ({}): {}", failure.index + 1, failure.key, failure.message);
        }
        eprintln!(
            "✓ Written {} of {} documents to {}",
            result.succeeded,
            result.total,
            config.output_dir.display()
        );
    }

    Ok(if result.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn cmd_inspect(template: &Path, records: &Path, record: usize, compact: bool) -> Result<ExitCode> {
    let (template, records) = load_inputs(template, records)?;
    let Some(rec) = record.checked_sub(1).and_then(|i| records.get(i)) else {
        eprintln!("✗ Record {} not found ({} records)", record, records.len());
        return Ok(ExitCode::FAILURE);
    };

    let font_context = FontContext::new();
    let outputs = layout_fields(&template, rec, &font_context);
    let rendered = if compact {
        serde_json::to_string(&outputs)
    } else {
        serde_json::to_string_pretty(&outputs)
    };
    match rendered {
        Ok(s) => {
            println!("{}", s);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ Failed to serialize draw commands: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
