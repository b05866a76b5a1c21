use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "parse-results",
    about = "Convert saved search-result files into parsed tweet files"
)]
struct Args {
    /// Directory of raw search-result JSON files
    #[arg(long, default_value = "data/search_results")]
    input_dir: PathBuf,

    /// Directory the parsed files are written to
    #[arg(long, default_value = "data/parsed_tweets")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("birdsift_parser=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let summary = birdsift_parser::process_directory(&args.input_dir, &args.output_dir)?;

    for report in &summary.files {
        println!(
            "Parsed {} tweets from {} and saved to {}",
            report.records,
            report.file_name,
            report.output_file.display()
        );
    }
    println!(
        "Total: Parsed {} tweets from {} files",
        summary.total_records, summary.files_processed
    );

    Ok(())
}
