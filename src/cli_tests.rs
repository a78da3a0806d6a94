//! # CLI Integration Tests
//!
//! Argument parsing for every subcommand, plus flag conflicts and error cases.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::cli::{Cli, Commands, ConfigFormat, OutputFormat};
    use crate::resolve::Region;
    use crate::time::CalendarDate;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["ncregion", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Extract regional time series"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["ncregion", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "ncregion",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/config.json",
            "template",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.json")));
    }

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from([
            "ncregion",
            "extract",
            "pm25_cams_v3.nc",
            "out.csv",
            "--region",
            "52.0,-1.0,51.0,0.0",
            "--start",
            "2020-01-01",
            "--end",
            "2020-01-31",
            "-n",
            "pm25",
            "--parquet",
        ]);

        if let Commands::Extract {
            input,
            output,
            region,
            start,
            end,
            variable,
            parquet,
        } = &cli.command
        {
            assert_eq!(input, &PathBuf::from("pm25_cams_v3.nc"));
            assert_eq!(output, &PathBuf::from("out.csv"));
            assert_eq!(region, &Region::new(52.0, -1.0, 51.0, 0.0));
            assert_eq!(start, &Some(CalendarDate::new(2020, 1, 1).unwrap()));
            assert_eq!(end, &Some(CalendarDate::new(2020, 1, 31).unwrap()));
            assert_eq!(variable, &Some("pm25".to_string()));
            assert!(parquet);
        } else {
            panic!("Expected Extract command");
        }
    }

    #[test]
    fn test_extract_requires_region() {
        let result = Cli::try_parse_from(["ncregion", "extract", "a.nc", "out.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_leading_region() {
        let cli = Cli::parse_from([
            "ncregion",
            "verify",
            "a.nc",
            "out.csv",
            "--region",
            "-10.0,-50.0,-20.0,-40.0",
        ]);
        if let Commands::Verify { region, start, .. } = &cli.command {
            assert_eq!(region, &Region::new(-10.0, -50.0, -20.0, -40.0));
            assert!(start.is_none());
        } else {
            panic!("Expected Verify command");
        }
    }

    #[test]
    fn test_invalid_region_and_date() {
        let result = Cli::try_parse_from([
            "ncregion", "extract", "a.nc", "out.csv", "--region", "1,2,3",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "ncregion",
            "extract",
            "a.nc",
            "out.csv",
            "--region",
            "1,2,3,4",
            "--start",
            "01/02/2020",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_command() {
        let cli = Cli::parse_from([
            "ncregion",
            "--config",
            "regions.yaml",
            "batch",
            "--csv-dir",
            "/tmp/out",
            "--skip-verify",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("regions.yaml")));
        if let Commands::Batch {
            netcdf_dir,
            csv_dir,
            skip_verify,
            verify_only,
            parquet,
        } = &cli.command
        {
            assert!(netcdf_dir.is_none());
            assert_eq!(csv_dir, &Some(PathBuf::from("/tmp/out")));
            assert!(skip_verify);
            assert!(!verify_only);
            assert!(!parquet);
        } else {
            panic!("Expected Batch command");
        }
    }

    #[test]
    fn test_batch_pass_flags_conflict() {
        let result =
            Cli::try_parse_from(["ncregion", "batch", "--skip-verify", "--verify-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from([
            "ncregion", "info", "test.nc", "-n", "pm25", "--format", "yaml",
        ]);

        if let Commands::Info {
            file,
            variable,
            format,
        } = &cli.command
        {
            assert_eq!(file, &PathBuf::from("test.nc"));
            assert_eq!(variable, &Some("pm25".to_string()));
            assert_eq!(format, &Some(OutputFormat::Yaml));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_probe_command() {
        let cli = Cli::parse_from([
            "ncregion",
            "probe",
            "test.nc",
            "--date",
            "2020-03-04",
            "--lat",
            "-33.9",
            "--lon",
            "18.4",
        ]);
        if let Commands::Probe {
            date, lat, lon, ..
        } = &cli.command
        {
            assert_eq!(date, &CalendarDate::new(2020, 3, 4).unwrap());
            assert_eq!(*lat, -33.9);
            assert_eq!(*lon, 18.4);
        } else {
            panic!("Expected Probe command");
        }
    }

    #[test]
    fn test_convert_command() {
        let cli = Cli::parse_from(["ncregion", "convert", "out/", "-o", "ignored.parquet"]);
        if let Commands::Convert { input, output } = &cli.command {
            assert_eq!(input, &PathBuf::from("out/"));
            assert_eq!(output, &Some(PathBuf::from("ignored.parquet")));
        } else {
            panic!("Expected Convert command");
        }
    }

    #[test]
    fn test_stations_command_reads_token_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var("NCREGION_WAQI_TOKEN", "env-token");
        }

        let cli = Cli::parse_from([
            "ncregion", "stations", "--city", "London", "--city", "Paris",
        ]);

        unsafe {
            std::env::remove_var("NCREGION_WAQI_TOKEN");
        }

        if let Commands::Stations {
            cities,
            token,
            output,
            base_url,
        } = &cli.command
        {
            assert_eq!(cities, &vec!["London".to_string(), "Paris".to_string()]);
            assert_eq!(token, &Some("env-token".to_string()));
            assert!(output.is_none());
            assert_eq!(base_url, "https://api.waqi.info");
        } else {
            panic!("Expected Stations command");
        }
    }

    #[test]
    fn test_template_command() {
        let cli = Cli::parse_from([
            "ncregion", "template", "--format", "yaml", "-o", "regions.yaml",
        ]);
        if let Commands::Template { output, format } = &cli.command {
            assert_eq!(output, &Some(PathBuf::from("regions.yaml")));
            assert_eq!(format, &ConfigFormat::Yaml);
        } else {
            panic!("Expected Template command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["ncregion", "validate", "regions.json"]);
        if let Commands::Validate { config_file } = &cli.command {
            assert_eq!(config_file, &Some(PathBuf::from("regions.json")));
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["ncregion", "--verbose", "--quiet", "info", "test.nc"]);
        assert!(result.is_err());

        let cli_quiet = Cli::parse_from(["ncregion", "--quiet", "info", "test.nc"]);
        assert!(!cli_quiet.verbose);
        assert!(cli_quiet.quiet);
    }
}
