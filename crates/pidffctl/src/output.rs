//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::json;

use crate::commands::check::CheckSummary;
use crate::commands::decode::Decoded;
use crate::commands::download::DownloadSummary;
use crate::error::CliError;

fn print_json<T: Serialize>(value: &T, what: &str) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format {} as JSON: {}", what, e),
    }
}

fn yes_no(value: bool) -> ColoredString {
    if value { "yes".green() } else { "no".dimmed() }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_type = error
        .downcast_ref::<CliError>()
        .map_or("error", CliError::type_name);
    let error_json = json!({
        "success": false,
        "error": {
            "message": format!("{:#}", error),
            "type": error_type
        }
    });
    print_json(&error_json, "error");
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_check(summary: &CheckSummary, json: bool) {
    if json {
        print_json(&json!({ "success": true, "device": summary }), "check result");
        return;
    }

    println!("{} {}", "✓".green(), summary.name.bold());
    println!(
        "    Axes: {} ({} with actuators)",
        summary.axes, summary.actuators
    );
    println!(
        "    Pool: {} ({} effects)",
        summary.pool_mode, summary.max_effects
    );
    println!("    Device gain: {}", yes_no(summary.gain));
    println!("    Autocenter: {}", yes_no(summary.autocenter));
    println!("    {}", "Effects:".bold());
    for effect in &summary.effects {
        println!("      {:<14} {}", effect.kind, effect.groups.dimmed());
    }
}

pub fn print_download(summary: &DownloadSummary, json: bool) {
    if json {
        let output = json!({
            "success": true,
            "device": summary.device,
            "effect": summary.effect,
            "handle": summary.handle,
            "reports": summary.reports,
        });
        print_json(&output, "download result");
        return;
    }

    println!(
        "{} effect #{} on {}",
        summary.effect.bold(),
        summary.handle,
        summary.device
    );
    if summary.reports.is_empty() {
        println!("{}", "No reports written".yellow());
        return;
    }
    for report in &summary.reports {
        println!(
            "  {:<7} {:<18} {}",
            report.kind.dimmed(),
            report.name.cyan(),
            report.hex
        );
    }
}

pub fn print_decoded(decoded: &Decoded, json: bool) {
    if json {
        print_json(&json!({ "success": true, "decoded": decoded }), "decoded report");
        return;
    }

    let show = |label: &str, value: Option<bool>| {
        if let Some(value) = value {
            println!("    {:<18} {}", label, yes_no(value));
        }
    };
    match decoded {
        Decoded::DeviceState {
            paused,
            actuators_enabled,
            safety_switch,
            override_switch,
            actuator_power,
            effect_playing,
            block_index,
            flags,
        } => {
            println!("{}", "PID State".bold());
            show("Paused", *paused);
            show("Actuators enabled", *actuators_enabled);
            show("Safety switch", *safety_switch);
            show("Override switch", *override_switch);
            show("Actuator power", *actuator_power);
            if let Some(index) = block_index {
                println!("    {:<18} {}", "Effect block", index);
            }
            show("Effect playing", *effect_playing);
            println!("    {:<18} {}", "Flags", flags.join(" | "));
        }
        Decoded::BlockLoad {
            block_index,
            status,
            pool_available,
        } => {
            println!("{}", "Block Load".bold());
            println!("    {:<18} {}", "Status", status);
            println!("    {:<18} {}", "Effect block", block_index);
            if let Some(available) = pool_available {
                println!("    {:<18} {}", "Pool available", available);
            }
        }
        Decoded::Unknown { report_id } => {
            println!(
                "{} report {:#04x} is not described by this device",
                "Unknown".yellow(),
                report_id
            );
        }
    }
}
