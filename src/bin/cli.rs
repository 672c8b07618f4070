use clap::Parser;
use excel_analyzer::config::ClientConfig;
use excel_analyzer::model::{AnalysisFilter, SelectedFile};
use excel_analyzer::{DirectorySink, HttpAnalysisService, OUTPUT_FILE_NAME, SubmitOutcome, UploadClient};
use std::path::PathBuf;
use std::process::ExitCode;

/// Upload a spreadsheet to the analysis service and save the results
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Spreadsheet to analyze (.xlsx, .xls or .csv)
    file: PathBuf,

    /// Directory analyzed_output.xlsx is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the chart PNG here
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Only analyze rows whose COLUMN equals --value-filter
    #[arg(long, requires = "value_filter")]
    column_filter: Option<String>,

    #[arg(long, requires = "column_filter")]
    value_filter: Option<String>,

    #[command(flatten)]
    client: ClientConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let service = HttpAnalysisService::new(&cli.client)?;
    let sink = DirectorySink::new(&cli.out_dir);
    let client = UploadClient::new(service, sink);

    client.select_file(SelectedFile::from_path(&cli.file)?);
    client.set_filter(AnalysisFilter::new(cli.column_filter, cli.value_filter));

    match client.submit().await {
        SubmitOutcome::Completed(result) => {
            println!("Data Summary:");
            println!("{}", result.summary_pretty());
            println!(
                "Saved {}",
                client.sink().target(OUTPUT_FILE_NAME).display()
            );
            if let Some(path) = cli.chart {
                std::fs::write(&path, &result.chart.png)?;
                println!(
                    "Saved chart ({}x{}) to {}",
                    result.chart.width,
                    result.chart.height,
                    path.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        SubmitOutcome::Rejected(message) | SubmitOutcome::Failed(message) => {
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
        SubmitOutcome::Busy => {
            eprintln!("An analysis is already running");
            Ok(ExitCode::FAILURE)
        }
    }
}
