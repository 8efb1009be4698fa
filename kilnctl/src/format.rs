//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use kiln_core::api::{
    InfoResponse, ProfileListResponse, SingleProfileResponse, StatusResponse, TargetResponse,
};
use kiln_core::{EndBehavior, RunStatus};

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

fn temp(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |t| format!("{:.1}°C", t))
}

/// `h:mm:ss` for durations and elapsed times.
fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

fn colored_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Idle => status.as_str().dimmed(),
        RunStatus::Running => status.as_str().green().bold(),
        RunStatus::Fault => status.as_str().red().bold(),
    }
}

/// Format info response
pub fn format_info(info: &InfoResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(info)?),
        OutputFormat::Table => {
            let lines = [
                "Kiln Server Information".bold().to_string(),
                format!("Version: {}", info.version.cyan()),
                format!("Software: {}", info.software.cyan()),
                format!("Uptime: {} seconds", info.uptime.to_string().yellow()),
                format!("Plant: {}", info.plant.cyan()),
                format!("Tick interval: {} ms", info.tick_interval_ms),
                format!(
                    "Temperature limits: {} .. {}",
                    temp(Some(info.min_temp_c)),
                    temp(Some(info.max_temp_c))
                ),
                format!("Profiles: {}", info.profile_count),
            ];
            Ok(lines.join("\n"))
        }
    }
}

/// Format run state snapshot
pub fn format_status(status: &StatusResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct StatusRow {
                #[tabled(rename = "Field")]
                field: &'static str,
                #[tabled(rename = "Value")]
                value: String,
            }

            let mut rows = vec![
                StatusRow {
                    field: "State",
                    value: colored_status(status.status).to_string(),
                },
                StatusRow {
                    field: "Profile",
                    value: status.active_profile.clone().unwrap_or_else(|| "-".into()),
                },
                StatusRow {
                    field: "Elapsed",
                    value: status.elapsed_sec.map_or_else(|| "-".into(), clock),
                },
                StatusRow {
                    field: "Measured",
                    value: temp(status.t_meas),
                },
                StatusRow {
                    field: "Target",
                    value: temp(status.t_set),
                },
                StatusRow {
                    field: "Delta",
                    value: status
                        .delta
                        .map_or_else(|| "-".into(), |d| format!("{:+.1}°C", d)),
                },
                StatusRow {
                    field: "Duty",
                    value: format!("{:.0}%", status.duty * 100.0),
                },
                StatusRow {
                    field: "Run switch",
                    value: if status.run_switch {
                        "on".green().to_string()
                    } else {
                        "off".yellow().to_string()
                    },
                },
            ];
            if status.finished {
                rows.push(StatusRow {
                    field: "Finished",
                    value: "yes".cyan().to_string(),
                });
            }
            if let Some(fault) = &status.fault {
                rows.push(StatusRow {
                    field: "Fault",
                    value: fault.red().to_string(),
                });
            }

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Controller Status:".bold(), table))
        }
    }
}

/// Format profile list
pub fn format_profiles(profiles: &ProfileListResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(profiles)?),
        OutputFormat::Table => {
            if profiles.profiles.is_empty() {
                return Ok("No profiles stored".dimmed().to_string());
            }

            #[derive(Tabled)]
            struct ProfileRow {
                #[tabled(rename = "Profile Name")]
                name: String,
                #[tabled(rename = "Points")]
                points: usize,
                #[tabled(rename = "Duration")]
                duration: String,
                #[tabled(rename = "End")]
                end: String,
            }

            let rows = profiles.profiles.iter().map(|p| ProfileRow {
                name: p.name.cyan().to_string(),
                points: p.point_count,
                duration: clock(p.duration_sec),
                end: p.end_behavior.to_string().yellow().to_string(),
            });

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Available Profiles:".bold(), table))
        }
    }
}

/// Format a single profile with its points
pub fn format_profile(response: &SingleProfileResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Table => {
            let profile = &response.profile;

            #[derive(Tabled)]
            struct PointRow {
                #[tabled(rename = "#")]
                index: usize,
                #[tabled(rename = "Time")]
                time: String,
                #[tabled(rename = "Seconds")]
                seconds: String,
                #[tabled(rename = "Temperature")]
                temperature: String,
            }

            let rows = profile.points.iter().enumerate().map(|(i, p)| PointRow {
                index: i,
                time: clock(p.t_sec),
                seconds: format!("{}", p.t_sec),
                temperature: temp(Some(p.temp_c)),
            });

            let end = match profile.end_behavior {
                EndBehavior::HoldLast => "holds the last temperature",
                EndBehavior::ReturnIdle => "returns to idle",
            };

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!(
                "{} {}\n{}\nAfter {} the controller {}",
                "Profile:".bold(),
                profile.name.cyan(),
                table,
                clock(profile.duration_sec()),
                end
            ))
        }
    }
}

/// Format a target preview
pub fn format_target(target: &TargetResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(target)?),
        OutputFormat::Table => {
            let value = match target.temp_c {
                Some(t) => format!("{:.1}°C", t).green().to_string(),
                None => "none (run returns to idle)".yellow().to_string(),
            };
            let mut output = format!(
                "{} at {}: {}",
                target.profile.cyan(),
                clock(target.elapsed_sec),
                value
            );
            if target.finished {
                output.push_str(&format!(" {}", "[finished]".dimmed()));
            }
            Ok(output)
        }
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
