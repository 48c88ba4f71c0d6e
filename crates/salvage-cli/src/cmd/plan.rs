use anyhow::{Context, Result};
use clap::Args;
use salvage_core::config::load_config;
use salvage_core::reconcile::{ItemVerdict, Splice, Verdict};
use salvage_core::run::reconcile_profile;
use salvage_core::snapshot::read_profile;
use salvage_core::ReconcileOptions;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Exported profile to inspect.
    #[arg(value_name = "PROFILE")]
    pub profile: PathBuf,

    /// Run configuration file (default: ./salvage.toml, then the user config dir).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Item template table used to recognize items.
    #[arg(long, value_name = "FILE")]
    pub templates: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    profile: String,
    username: String,
    total_items: usize,
    kept: usize,
    removed: usize,
    anchors: usize,
    items: Vec<ItemVerdict>,
    splices: Vec<Splice>,
}

/// Reconcile one profile in memory and print what a run would do with it.
pub fn run_plan(args: &PlanArgs, output: OutputMode) -> Result<()> {
    let (mut config, _) = load_config(args.config.as_deref())?;
    if let Some(templates) = &args.templates {
        config.paths.templates.clone_from(templates);
    }
    let catalog = crate::cmd::load_catalog(&config)?;

    let profile = read_profile(&args.profile)?;
    let options = ReconcileOptions {
        reset_durability: config.reset_durability,
    };
    let result = reconcile_profile(&profile, &catalog, options)
        .with_context(|| format!("reconciling {}", args.profile.display()))?;

    let report = PlanReport {
        profile: args.profile.display().to_string(),
        username: profile.info.username.clone(),
        total_items: result.original_count(),
        kept: result.count(Verdict::Kept),
        removed: result.count(Verdict::Removed),
        anchors: result.count(Verdict::Anchor),
        items: result.verdicts,
        splices: result.splices,
    };

    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &PlanReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "id\ttemplate\tverdict")?;
    for item in &report.items {
        writeln!(w, "{}\t{}\t{}", item.id, item.template_id, item.verdict.as_str())?;
    }
    Ok(())
}

fn render_pretty(report: &PlanReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Plan for {}", report.profile))?;
    pretty_kv(w, "User", &report.username)?;
    pretty_kv(w, "Items", report.total_items.to_string())?;
    pretty_kv(w, "Kept", report.kept.to_string())?;
    pretty_kv(w, "Removed", report.removed.to_string())?;
    pretty_kv(w, "Anchors", report.anchors.to_string())?;

    let removed: Vec<&ItemVerdict> = report
        .items
        .iter()
        .filter(|item| item.verdict == Verdict::Removed)
        .collect();
    if !removed.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Left behind")?;
        for item in removed {
            writeln!(w, "  {} ({})", item.id, item.template_id)?;
        }
    }

    if !report.splices.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Popped out")?;
        for splice in &report.splices {
            writeln!(
                w,
                "  {} → {}: {}",
                splice.removed_id,
                splice.new_parent,
                splice.rehomed.join(", ")
            )?;
        }
    }
    Ok(())
}
