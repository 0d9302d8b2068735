//! `pidffctl download`: dry-run an effect download against a recording
//! transport and list the reports a real device would receive.

use std::path::Path;

use anyhow::{Context, Result};
use pidff_engine::prelude::*;
use pidff_engine::transport::mock::MockTransport;
use pidff_common::report::ReportKind;
use serde::Serialize;
use tracing::{debug, info};

use crate::commands::report_name;
use crate::files::{load_capabilities, load_effect};
use crate::output;

#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    pub start: bool,
    pub iterations: u32,
    pub solo: bool,
    /// Include the reports written when the session is acquired
    pub with_acquire: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportLine {
    pub report_id: u8,
    pub kind: &'static str,
    pub name: &'static str,
    pub hex: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadSummary {
    pub device: String,
    pub effect: String,
    pub handle: u32,
    pub reports: Vec<ReportLine>,
}

pub fn execute(caps_path: &Path, effect_path: &Path, options: DownloadOptions, json: bool) -> Result<()> {
    let caps = load_capabilities(caps_path)?;
    let effect = load_effect(effect_path)?;

    let transport = MockTransport::for_device(&caps);
    let device = PidDevice::new(caps, transport.clone())?;
    device
        .acquire(AccessMode::Exclusive)
        .context("Failed to acquire the device")?;
    if !options.with_acquire {
        transport.clear();
    }

    let handle = device
        .create_effect(effect.kind, Some(&effect.parameters))
        .with_context(|| format!("Failed to create {} effect", effect.kind))?;
    debug!("Created effect {}", handle);

    if options.start {
        let flags = StartFlags {
            solo: options.solo,
            ..StartFlags::default()
        };
        device
            .start(handle, options.iterations, flags)
            .with_context(|| format!("Failed to start effect {handle}"))?;
    } else {
        device
            .download(handle)
            .with_context(|| format!("Failed to download effect {handle}"))?;
    }

    let reports: Vec<ReportLine> = transport
        .written()
        .iter()
        .map(|report| ReportLine {
            report_id: report.report_id(),
            kind: match report.kind {
                ReportKind::Output => "output",
                ReportKind::Feature => "feature",
            },
            name: report_name(device.caps(), report.report_id()),
            hex: report.to_hex(),
        })
        .collect();
    info!("{} report(s) for {} effect {}", reports.len(), effect.kind, handle);

    let summary = DownloadSummary {
        device: device.caps().name.clone(),
        effect: effect.kind.name().to_string(),
        handle: handle.get(),
        reports,
    };
    output::print_download(&summary, json);
    Ok(())
}
