//! bddscribe CLI entrypoint
//! Parses command-line arguments and dispatches to the core pipeline.

// Internal imports (std, crate)
use std::path::PathBuf;

// External imports (alphabetized)
use anyhow::Context;
use bddscribe_core::{pipeline, tracker, Config, MlflowTracker, NoopTracker, OpenAiExtractor, RunTracker};
use clap::Parser;
use url::Url;

#[derive(Parser)]
#[command(name = "bddscribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate BDD feature files and step-definition stubs from a Swagger UI page
    Generate {
        /// URL of the Swagger UI documentation page
        ///
        /// Required unless a config file provides it
        /// Example: --swagger-url https://demoqa.com/swagger/
        #[arg(long)]
        swagger_url: Option<String>,
        /// Model identifier for the extraction backend (default: gpt-3.5-turbo)
        #[arg(long)]
        model: Option<String>,
        /// Output directory for generated files (default: generated)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Optional YAML or TOML config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Base URL of the API under test, baked into generated step stubs
        #[arg(long)]
        api_base_url: Option<Url>,
        /// MLflow tracking server URI (metrics are skipped without it)
        #[arg(long)]
        tracking_uri: Option<String>,
        /// Custom template directory overriding the built-in templates
        #[arg(long)]
        template_dir: Option<PathBuf>,
        /// Cap on optional parameters expanded into scenario combinations
        #[arg(long)]
        max_optional_params: Option<usize>,
        /// Number of extraction calls kept in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the run summary as JSON instead of the file listing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            swagger_url,
            model,
            output_dir,
            config,
            api_base_url,
            tracking_uri,
            template_dir,
            max_optional_params,
            concurrency,
            json,
        } => {
            // Start from the config file when given, then overlay flags
            let mut run_config = match &config {
                Some(path) => Config::from_file(path)
                    .await
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => Config::new("", "gpt-3.5-turbo", "generated"),
            };

            if let Some(url) = swagger_url {
                run_config.swagger_url = url;
            }
            if run_config.swagger_url.is_empty() {
                anyhow::bail!(
                    "A Swagger UI URL is required: pass --swagger-url or set swagger_url in the config file"
                );
            }
            if let Some(model) = model {
                run_config.model = model;
            }
            if let Some(dir) = output_dir {
                run_config.output_dir = dir.to_string_lossy().to_string();
            }
            if let Some(url) = api_base_url {
                run_config.api_base_url = Some(url);
            }
            if let Some(uri) = tracking_uri {
                run_config.tracking_uri = Some(uri);
            }
            if let Some(dir) = template_dir {
                run_config.template_dir = Some(dir.to_string_lossy().to_string());
            }
            if let Some(cap) = max_optional_params {
                run_config.max_optional_params = cap;
            }
            if let Some(n) = concurrency {
                run_config.concurrency = n;
            }

            let api_key = std::env::var("OPENAI_API_KEY")
                .context("Missing OPENAI_API_KEY environment variable")?;
            let mut extractor = OpenAiExtractor::new(api_key, run_config.model.clone());
            if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
                extractor = extractor.with_api_base(api_base);
            }

            let run_tracker: Box<dyn RunTracker> = match &run_config.tracking_uri {
                Some(uri) => Box::new(
                    MlflowTracker::start_run(
                        uri.clone(),
                        tracker::DEFAULT_EXPERIMENT,
                        "Feature_Generation",
                    )
                    .await,
                ),
                None => Box::new(NoopTracker),
            };

            println!(
                "Generating BDD tests from {} into {}",
                run_config.swagger_url, run_config.output_dir
            );

            let summary = pipeline::run(&run_config, &extractor, run_tracker.as_ref())
                .await
                .context("Generation failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\nGenerated Files:");
                println!("\nFeature Files:");
                for file in &summary.feature_files {
                    println!("  - {}", file.display());
                }
                println!("\nStep Definition Files:");
                for file in &summary.step_files {
                    println!("  - {}", file.display());
                }
                println!(
                    "\nProcessed {} chunk(s): {} endpoint(s), {} conflict note(s), {} skipped record(s)",
                    summary.chunk_count, summary.endpoints, summary.conflicts, summary.skipped_records
                );
            }
        }
    }
    Ok(())
}
