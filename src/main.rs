use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use log::{LevelFilter, info, warn};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use ncregion::batch::{BatchOptions, BatchReport, run_extraction, run_verification};
use ncregion::cli::{
    Cli, Commands, OutputFormat, apply_batch_overrides, merge_date_range, render_template,
};
use ncregion::extract::{extract, probe};
use ncregion::grid::NetcdfGrid;
use ncregion::info::{inspect, print_grid_info_human, print_grid_info_json, print_grid_info_yaml};
use ncregion::input::JobConfig;
use ncregion::log::{config_echo, show_farewell_with_timing, show_greeting};
use ncregion::output::{
    convert_csv_to_parquet, convert_directory, parquet_path_for, write_extraction_csv,
};
use ncregion::stations::{lookup_cities, save_station_report, write_station_report};
use ncregion::verify::{VerificationResult, verify};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Option<JobConfig>> {
    path.map(|p| {
        JobConfig::from_file(p)
            .with_context(|| format!("Failed to load configuration from {}", p.display()))
    })
    .transpose()
}

fn require_config(path: Option<&Path>) -> Result<JobConfig> {
    match load_config(path)? {
        Some(config) => Ok(config),
        None => bail!("this command needs a configuration file (--config or NCREGION_CONFIG)"),
    }
}

fn write_text(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn print_structured<T: serde::Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Human => {}
    }
    Ok(())
}

/// Returns `Ok(false)` when the command ran but found failures or mismatches.
async fn run(cli: Cli) -> Result<bool> {
    let start_time = Instant::now();
    let format = cli.output_format;
    let config_path = cli.config.clone();

    let ok = match cli.command {
        Commands::Extract {
            input,
            output,
            region,
            start,
            end,
            variable,
            parquet,
        } => {
            show_greeting("extract");
            let config = load_config(config_path.as_deref())?;
            let range = merge_date_range(start, end, config.as_ref())?;
            let variable = variable.or_else(|| config.and_then(|c| c.variable));

            let grid = NetcdfGrid::open_with_variable(&input, variable.as_deref())
                .with_context(|| format!("Failed to open dataset {}", input.display()))?;
            let extraction = extract(&grid, &region, &range)
                .with_context(|| format!("Failed to extract {} from {}", region, input.display()))?;
            write_extraction_csv(&extraction, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if parquet {
                convert_csv_to_parquet(&output, parquet_path_for(&output))
                    .context("Failed to write Parquet copy")?;
            }
            grid.close()?;
            true
        }

        Commands::Verify {
            input,
            artifact,
            region,
            start,
            end,
            variable,
        } => {
            show_greeting("verify");
            let config = load_config(config_path.as_deref())?;
            let range = merge_date_range(start, end, config.as_ref())?;
            let variable = variable.or_else(|| config.and_then(|c| c.variable));

            let grid = NetcdfGrid::open_with_variable(&input, variable.as_deref())
                .with_context(|| format!("Failed to open dataset {}", input.display()))?;
            let result = verify(&grid, &artifact, &region, &range)
                .with_context(|| format!("Failed to verify {}", artifact.display()))?;
            grid.close()?;

            match format {
                OutputFormat::Human => print_verification_human(&artifact, &result),
                other => print_structured(other, &result)?,
            }
            result.is_pass()
        }

        Commands::Batch {
            netcdf_dir,
            csv_dir,
            skip_verify,
            verify_only,
            parquet,
        } => {
            show_greeting("batch");
            let config = apply_batch_overrides(
                require_config(config_path.as_deref())?,
                netcdf_dir,
                csv_dir,
                parquet,
            );
            config.validate().context("Invalid batch configuration")?;
            config_echo(&config);

            let options = BatchOptions {
                show_progress: !cli.quiet,
            };
            let mut report = BatchReport::default();
            if !verify_only {
                report.merge(run_extraction(&config, options).context("Extraction pass failed")?);
            }
            if !skip_verify {
                report
                    .merge(run_verification(&config, options).context("Verification pass failed")?);
            }

            match format {
                OutputFormat::Human => report.print_summary(),
                other => print_structured(other, &report)?,
            }
            !report.has_failures()
        }

        Commands::Validate { config_file } => {
            let path = config_file
                .or(config_path)
                .context("No configuration file given")?;
            let config = JobConfig::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid: {}", path.display());
                    config_echo(&config);
                    true
                }
                Err(e) => {
                    println!("Configuration is invalid: {}", e);
                    false
                }
            }
        }

        Commands::Info {
            file,
            variable,
            format: info_format,
        } => {
            let info = inspect(&file, variable.as_deref())
                .with_context(|| format!("Failed to inspect {}", file.display()))?;
            match info_format.unwrap_or(format) {
                OutputFormat::Human => print_grid_info_human(&info),
                OutputFormat::Json => print_grid_info_json(&info)?,
                OutputFormat::Yaml => print_grid_info_yaml(&info)?,
            }
            return Ok(true);
        }

        Commands::Probe {
            file,
            date,
            lat,
            lon,
            variable,
        } => {
            let grid = NetcdfGrid::open_with_variable(&file, variable.as_deref())
                .with_context(|| format!("Failed to open dataset {}", file.display()))?;
            let value = probe(&grid, date, lat, lon)?;
            grid.close()?;
            match format {
                OutputFormat::Human => println!(
                    "{} at {} ({}, {}) [t={}, lat={}, lon={}]: {}",
                    value.variable,
                    value.date,
                    value.latitude,
                    value.longitude,
                    value.time_index,
                    value.lat_index,
                    value.lon_index,
                    value.value
                ),
                other => print_structured(other, &value)?,
            }
            return Ok(true);
        }

        Commands::Convert { input, output } => {
            if input.is_dir() {
                if output.is_some() {
                    warn!("--output is ignored for directory input");
                }
                let written = convert_directory(&input)
                    .with_context(|| format!("Failed to convert {}", input.display()))?;
                info!("Converted {} files", written.len());
            } else {
                let target = output.unwrap_or_else(|| parquet_path_for(&input));
                convert_csv_to_parquet(&input, &target)
                    .with_context(|| format!("Failed to convert {}", input.display()))?;
            }
            true
        }

        Commands::Stations {
            cities,
            token,
            output,
            base_url,
        } => {
            let config = load_config(config_path.as_deref())?;
            let cities = if cities.is_empty() {
                config.as_ref().map(|c| c.cities.clone()).unwrap_or_default()
            } else {
                cities
            };
            if cities.is_empty() {
                bail!("no cities given (--city or the config's cities)");
            }
            let token = token
                .or_else(|| config.as_ref().and_then(|c| c.waqi_token.clone()))
                .context("no WAQI token given (--token, NCREGION_WAQI_TOKEN or waqi_token)")?;
            let output: Option<PathBuf> =
                output.or_else(|| config.as_ref().and_then(|c| c.output_file.clone()));

            let client = reqwest::Client::new();
            let results = lookup_cities(&client, &base_url, &cities, &token).await?;
            match output {
                Some(path) => save_station_report(&path, &results)?,
                None => {
                    let mut stdout = io::stdout().lock();
                    write_station_report(&mut stdout, &results)?;
                    stdout.flush()?;
                }
            }
            true
        }

        Commands::Template {
            output,
            format: config_format,
        } => {
            let text = render_template(config_format)?;
            write_text(output.as_deref(), &text)?;
            return Ok(true);
        }

        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    generate(shell, &mut cmd, name, &mut file);
                }
                None => generate(shell, &mut cmd, name, &mut io::stdout()),
            }
            return Ok(true);
        }
    };

    show_farewell_with_timing(start_time.elapsed());
    Ok(ok)
}

fn print_verification_human(artifact: &Path, result: &VerificationResult) {
    println!("{}: {}", artifact.display(), result);
    if let VerificationResult::ValueMismatch { mismatches } = result {
        for m in mismatches {
            println!(
                "  row {} ({}), column '{}': artifact {} vs grid {}",
                m.row, m.date, m.header, m.artifact, m.grid
            );
        }
    }
}
