use anyhow::{Context, Result};
use clap::Args;
use salvage_core::config::load_config;
use salvage_core::gift::GiftOutbox;
use salvage_core::oracle::TemplateCatalog;
use salvage_core::run::ProfileOutcome;
use salvage_core::snapshot::{DirectoryProfileSource, DirectoryResidualWriter};
use salvage_core::{ProfileStatus, RunConfig, RunOptions, RunReport};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Run configuration file (default: ./salvage.toml, then the user config dir).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of exported profiles to migrate.
    #[arg(long, value_name = "DIR")]
    pub profiles: Option<PathBuf>,

    /// Item template table used to recognize items.
    #[arg(long, value_name = "FILE")]
    pub templates: Option<PathBuf>,

    /// Directory the residual profiles are written to.
    #[arg(long, value_name = "DIR")]
    pub residual: Option<PathBuf>,

    /// Gift outbox file.
    #[arg(long, value_name = "FILE")]
    pub outbox: Option<PathBuf>,

    /// Reconcile every profile but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Command-line paths take precedence over the config file.
    fn apply(&self, config: &mut RunConfig) {
        let paths = &mut config.paths;
        for (flag, slot) in [
            (&self.profiles, &mut paths.profiles),
            (&self.templates, &mut paths.templates),
            (&self.residual, &mut paths.residual),
            (&self.outbox, &mut paths.outbox),
        ] {
            if let Some(path) = flag {
                slot.clone_from(path);
            }
        }
    }
}

/// Run the migration and print its report.
///
/// Returns the report so the caller can pick the exit code.
pub fn run_run(args: &RunArgs, output: OutputMode) -> Result<RunReport> {
    let (mut config, source) = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    if let Some(path) = &source {
        tracing::info!(config = %path.display(), "using config file");
    }

    let report = if config.enabled {
        let options = RunOptions::from_config(&config, args.dry_run);
        let catalog = crate::cmd::load_catalog(&config)?;
        execute(&config, &catalog, &options)?
    } else {
        tracing::info!("migration disabled in the configuration");
        RunReport::disabled(args.dry_run)
    };

    render_mode(output, &report, render_text, render_pretty)?;
    Ok(report)
}

fn execute(config: &RunConfig, catalog: &TemplateCatalog, options: &RunOptions) -> Result<RunReport> {
    let source = DirectoryProfileSource::new(&config.paths.profiles);
    let mut outbox = GiftOutbox::open(&config.paths.outbox)
        .with_context(|| format!("opening gift outbox {}", config.paths.outbox.display()))?;
    let mut writer = DirectoryResidualWriter::new(&config.paths.residual);

    let report = salvage_core::run(
        &source,
        catalog,
        &mut outbox,
        &mut writer,
        options,
        &chrono::Local::now(),
    )?;
    Ok(report)
}

fn render_text(report: &RunReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "profile\tstatus\ttotal\tkept\tremoved\tgift\terror")?;
    for p in &report.profiles {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            p.key,
            p.status,
            p.total_items,
            p.kept,
            p.removed,
            p.gift_id.as_deref().unwrap_or("-"),
            p.error
                .as_ref()
                .map_or_else(|| "-".to_string(), |e| format!("{}:{}", e.step, e.code)),
        )?;
    }
    Ok(())
}

fn render_pretty(report: &RunReport, w: &mut dyn Write) -> io::Result<()> {
    if !report.enabled {
        writeln!(w, "Migration is disabled in the configuration; nothing was done.")?;
        return Ok(());
    }

    let heading = if report.dry_run {
        "Salvage run (dry run)"
    } else {
        "Salvage run"
    };
    pretty_section(w, heading)?;
    pretty_kv(w, "Profiles", report.profiles.len().to_string())?;
    pretty_kv(w, "Migrated", report.count(ProfileStatus::Migrated).to_string())?;
    pretty_kv(w, "Skipped", report.count(ProfileStatus::Skipped).to_string())?;
    pretty_kv(w, "Incomplete", report.count(ProfileStatus::Incomplete).to_string())?;
    pretty_kv(w, "Items sent", report.items_kept().to_string())?;

    for profile in &report.profiles {
        writeln!(w)?;
        render_profile(profile, w)?;
    }
    Ok(())
}

fn render_profile(p: &ProfileOutcome, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} [{}]", p.key, p.status))?;
    pretty_kv(w, "Items", p.total_items.to_string())?;
    pretty_kv(w, "Kept", p.kept.to_string())?;
    pretty_kv(w, "Removed", p.removed.to_string())?;
    if let Some(id) = &p.gift_id {
        pretty_kv(w, "Gift", id)?;
    }
    for splice in &p.splices {
        pretty_kv(
            w,
            "Spliced",
            format!(
                "{} ({}) → {} item(s) moved to {}",
                splice.removed_id,
                splice.removed_template,
                splice.rehomed.len(),
                splice.new_parent
            ),
        )?;
    }
    if let Some(err) = &p.error {
        pretty_kv(w, "Error", format!("[{}] at {}: {}", err.code, err.step, err.message))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_paths() {
        let args = RunArgs {
            profiles: Some(PathBuf::from("/in")),
            outbox: Some(PathBuf::from("/out/gifts.json")),
            ..RunArgs::default()
        };
        let mut config = RunConfig::default();
        args.apply(&mut config);

        assert_eq!(config.paths.profiles, PathBuf::from("/in"));
        assert_eq!(config.paths.outbox, PathBuf::from("/out/gifts.json"));
        assert_eq!(config.paths.templates, PathBuf::from("items.json"));
    }

    #[test]
    fn text_output_starts_with_header() {
        let report = RunReport {
            enabled: true,
            dry_run: true,
            profiles: Vec::new(),
        };
        let mut buf = Vec::new();
        render_text(&report, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("profile\tstatus"));
    }
}
