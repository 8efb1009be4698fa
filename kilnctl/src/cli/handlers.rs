//! Command execution handlers

use anyhow::Result;
use kiln_core::{parse_points, ProfileBuilder, RunStatus};
use std::path::Path;
use std::time::Duration;

use crate::client::KilnClient;
use crate::config::{CliConfig, ConfigBuilder};
use crate::format::format_success;

use super::commands::*;

/// Handle info command
pub async fn handle_info(client: &KilnClient, format: &OutputFormat) -> Result<()> {
    let info = client.get_info().await?;
    println!("{}", crate::format::format_info(&info, &format.into())?);
    Ok(())
}

/// Handle status command
///
/// With `watch`, re-polls every `interval` seconds until Ctrl+C.
pub async fn handle_status(
    client: &KilnClient,
    watch: bool,
    interval: u64,
    format: &OutputFormat,
) -> Result<()> {
    if !watch {
        let status = client.get_status().await?;
        println!("{}", crate::format::format_status(&status, &format.into())?);
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = client.get_status().await?;
                match format {
                    // One JSON document per line so the stream can be piped
                    OutputFormat::Json => println!("{}", serde_json::to_string(&status)?),
                    OutputFormat::Table => {
                        // Clear screen and home the cursor
                        print!("\x1B[2J\x1B[H");
                        println!("{}", crate::format::format_status(&status, &format.into())?);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Handle health command
pub async fn handle_health(client: &KilnClient, format: &OutputFormat) -> Result<()> {
    let health = client.health_check().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        OutputFormat::Table => {
            println!("Server Health Check:");
            println!("{:<20} Value", "Status");
            println!("{}", "-".repeat(40));

            for (key, value) in &health {
                let value_str = match value {
                    serde_json::Value::Bool(b) => {
                        if *b { "✓".to_string() } else { "✗".to_string() }
                    }
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => value.to_string(),
                };
                println!("{:<20} {}", key, value_str);
            }
        }
    }

    Ok(())
}

/// Handle profile commands
pub async fn handle_profile(
    client: &KilnClient,
    command: ProfileCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ProfileCommands::List => {
            let profiles = client.list_profiles().await?;
            println!(
                "{}",
                crate::format::format_profiles(&profiles, &format.into())?
            );
        }
        ProfileCommands::Show { name } => {
            let profile = client.get_profile(&name).await?;
            println!("{}", crate::format::format_profile(&profile, &format.into())?);
        }
        ProfileCommands::Save { name, points, end } => {
            let points = parse_points(&points).map_err(|e| anyhow::anyhow!(e))?;
            let mut candidate = ProfileBuilder::new(name).points(points).candidate().clone();
            candidate.end_behavior = end;

            let saved = client.save_profile(&candidate).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&saved)?);
                }
                OutputFormat::Table => {
                    println!(
                        "{}",
                        format_success(&format!(
                            "Saved profile '{}' ({} points, end: {})",
                            saved.profile.name,
                            saved.profile.points.len(),
                            saved.profile.end_behavior
                        ))
                    );
                }
            }
        }
        ProfileCommands::Delete { name } => {
            client.delete_profile(&name).await?;
            println!("{}", format_success(&format!("Deleted profile: {}", name)));
        }
        ProfileCommands::Preview { name, elapsed } => {
            let target = client.preview_target(&name, elapsed).await?;
            println!("{}", crate::format::format_target(&target, &format.into())?);
        }
    }

    Ok(())
}

/// Handle run command
pub async fn handle_run(
    client: &KilnClient,
    profile: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let response = client.run(profile.as_deref()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => println!(
            "{}",
            format_success(&format!("Started run: {}", response.profile))
        ),
    }

    Ok(())
}

/// Handle stop command
pub async fn handle_stop(client: &KilnClient, format: &OutputFormat) -> Result<()> {
    let status = client.stop().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Table => {
            println!("{}", format_success("Stopped, element de-energized"));
            if status.status == RunStatus::Fault {
                println!(
                    "Fault still latched: {} (acknowledge with `kilnctl ack`)",
                    status.fault.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(())
}

/// Handle ack command
pub async fn handle_ack(client: &KilnClient, format: &OutputFormat) -> Result<()> {
    let status = client.acknowledge().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Table => println!("{}", format_success("Fault acknowledged")),
    }

    Ok(())
}

/// Handle config commands
///
/// `config_path` is the file `set` and `reset` write to.
pub async fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(current_config)?);
            }
            OutputFormat::Table => {
                println!("CLI Configuration:");
                println!("{:<20} Value", "Setting");
                println!("{}", "-".repeat(40));
                println!("{:<20} {}", "Server URL", current_config.server_url);
                println!("{:<20} {}", "Output Format", current_config.output_format);
                println!("{:<20} {}", "Verbose", current_config.verbose);
                println!("{:<20} {}s", "Timeout", current_config.timeout);
            }
        },
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = CliConfig::load_from(config_path)?;
            apply_setting(&mut config, &key, &value)?;
            config.save_to(config_path)?;
            println!("{}", format_success(&format!("Set {} = {}", key, value)));
        }
        ConfigCommands::Reset => {
            CliConfig::default().save_to(config_path)?;
            println!("{}", format_success("Configuration reset to defaults"));
        }
    }

    Ok(())
}

fn apply_setting(config: &mut CliConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "server_url" => {
            ConfigBuilder::validate_url(value)?;
            config.server_url = value.to_string();
        }
        "output_format" => {
            ConfigBuilder::validate_output_format(value)?;
            config.output_format = value.to_string();
        }
        "verbose" => {
            config.verbose = value.to_lowercase() == "true" || value == "1";
        }
        "timeout" => {
            let timeout = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid timeout value. Must be a number"))?;
            ConfigBuilder::validate_timeout(timeout)?;
            config.timeout = timeout;
        }
        _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
    }
    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_setting() {
        let mut config = CliConfig::default();

        apply_setting(&mut config, "timeout", "45").unwrap();
        assert_eq!(config.timeout, 45);

        apply_setting(&mut config, "verbose", "1").unwrap();
        assert!(config.verbose);

        assert!(apply_setting(&mut config, "timeout", "0").is_err());
        assert!(apply_setting(&mut config, "output_format", "yaml").is_err());
        assert!(apply_setting(&mut config, "server_url", "localhost").is_err());
        assert!(apply_setting(&mut config, "colour", "red").is_err());
        assert_eq!(config.output_format, "table");
    }

    #[tokio::test]
    async fn test_config_set_and_reset_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        let config = CliConfig::default();

        handle_config(
            ConfigCommands::Set {
                key: "server_url".to_string(),
                value: "http://kiln.local:3000".to_string(),
            },
            &config,
            &path,
            &OutputFormat::Table,
        )
        .await
        .unwrap();
        assert_eq!(
            CliConfig::load_from(&path).unwrap().server_url,
            "http://kiln.local:3000"
        );

        handle_config(ConfigCommands::Reset, &config, &path, &OutputFormat::Table)
            .await
            .unwrap();
        assert_eq!(CliConfig::load_from(&path).unwrap(), CliConfig::default());
    }
}
