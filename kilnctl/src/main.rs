//! Kiln CLI
//!
//! Command-line interface for operating the kiln server.

use anyhow::Result;
use clap::Parser;
use kilnctl::cli::{
    generate_completion, handle_ack, handle_config, handle_health, handle_info, handle_profile,
    handle_run, handle_status, handle_stop, Cli, Commands, OutputFormat,
};
use kilnctl::client::KilnClient;
use kilnctl::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = CliConfig::builder();

    // An explicit --config wins over --no-config and the default location
    builder = match &cli.config {
        Some(path) => builder.with_config_file_at(path)?,
        None => builder.with_config_file(!cli.no_config)?,
    };

    builder = builder.with_env_overrides();

    if let Some(ref server) = cli.server {
        builder = builder.with_server_url(server)?;
    }
    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if let Some(verbose) = cli.verbose {
        builder = builder.with_verbose(verbose);
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            if cli.verbose.unwrap_or(false) {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(1);
        }
    };

    let server_url = &config.server_url;
    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let verbose = config.verbose;

    if verbose {
        eprintln!("Verbose mode enabled");
        eprintln!("Server URL: {}", server_url);
        eprintln!("Output format: {:?}", output_format);
    }

    // Local commands never contact the server
    match cli.command {
        Commands::Completion { shell } => {
            generate_completion(shell);
            return Ok(());
        }
        Commands::Config { command } => {
            let config_path = match cli.config {
                Some(path) => path,
                None => CliConfig::config_path()?,
            };
            return report(
                handle_config(command, &config, &config_path, &output_format).await,
                verbose,
            );
        }
        _ => {}
    }

    let client = match KilnClient::with_config(
        server_url.clone(),
        config.timeout,
        3,
        std::time::Duration::from_millis(500),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: Cannot connect to kiln server at {}", server_url);
            eprintln!("Make sure the server is running and accessible.");
            eprintln!("Connection error: {}", e);
            std::process::exit(1);
        }
    };

    if verbose {
        let limits = client.limits();
        eprintln!("Successfully connected to server");
        eprintln!(
            "Temperature limits: {:.1}°C .. {:.1}°C",
            limits.min_c, limits.max_c
        );
    }

    let result = match cli.command {
        Commands::Info => handle_info(&client, &output_format).await,
        Commands::Status { watch, interval } => {
            handle_status(&client, watch, interval, &output_format).await
        }
        Commands::Health => handle_health(&client, &output_format).await,
        Commands::Profile { command } => handle_profile(&client, command, &output_format).await,
        Commands::Run { profile } => handle_run(&client, profile, &output_format).await,
        Commands::Stop => handle_stop(&client, &output_format).await,
        Commands::Ack => handle_ack(&client, &output_format).await,
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    };

    report(result, verbose)
}

fn report(result: Result<()>, verbose: bool) -> Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}
