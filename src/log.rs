use crate::input::JobConfig;
use log::info;
use std::time::Duration;

pub fn show_greeting(action: &str) {
    info!("=== NetCDF Regional Extractor ===");
    info!("Starting: {}", action);
}

pub fn config_echo(config: &JobConfig) {
    info!("Configuration:");
    info!("  NetCDF directory: {}", config.netcdf_dir.display());
    info!("  CSV directory: {}", config.csv_dir.display());
    info!(
        "  Date range: {} to {}",
        config.starting_date.as_deref().unwrap_or("<first>"),
        config.ending_date.as_deref().unwrap_or("<last>")
    );
    if let Some(variable) = &config.variable {
        info!("  Variable: {}", variable);
    }
    info!("  Number of regions: {}", config.city_coords.len());
    for (name, region) in &config.city_coords {
        info!("    {}: {}", name, region);
    }
    if config.parquet {
        info!("  Parquet copies: enabled");
    }
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    info!("=== Completed in {:.2?} ===", elapsed);
}
