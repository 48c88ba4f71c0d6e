//! The migration run: one reconciliation pass per profile, then the gift
//! and the residual snapshot.
//!
//! A profile moves through four steps: `load`, `reconcile`, `gift`,
//! `residual`. A failure stops that profile only and is recorded in its
//! [`ProfileOutcome`]; the next profile starts fresh. The residual snapshot
//! is written only after the gift was accepted, so a profile whose items
//! were not mailed keeps its complete snapshot on disk.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt;
use tracing::{info, info_span, warn};

use crate::config::RunConfig;
use crate::error::SalvageError;
use crate::gift::{GiftMailer, assemble_gift, gift_id};
use crate::model::profile::Profile;
use crate::oracle::ItemValidityOracle;
use crate::reconcile::{self, ReconcileOptions, Reconciliation, Splice, Verdict};
use crate::snapshot::{ProfileSource, ResidualWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub enabled: bool,
    pub reconcile: ReconcileOptions,
    pub expiration_days: u32,
    pub gift_prefix: String,
    /// Reconcile every profile but enqueue and write nothing.
    pub dry_run: bool,
}

impl RunOptions {
    #[must_use]
    pub fn from_config(config: &RunConfig, dry_run: bool) -> Self {
        Self {
            enabled: config.enabled,
            reconcile: ReconcileOptions {
                reset_durability: config.reset_durability,
            },
            expiration_days: config.mail_item_expiration_days,
            gift_prefix: config.gift.id_prefix.clone(),
            dry_run,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&RunConfig::default(), false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Load,
    Reconcile,
    Gift,
    Residual,
}

impl Step {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Reconcile => "reconcile",
            Self::Gift => "gift",
            Self::Residual => "residual",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    /// Gift enqueued and residual written.
    Migrated,
    /// Reconciled under `dry_run`; nothing recorded.
    Reconciled,
    /// Never reconciled (unreadable or not a forest).
    Skipped,
    /// Reconciled, but the gift or the residual was not recorded.
    Incomplete,
}

impl ProfileStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Migrated => "migrated",
            Self::Reconciled => "reconciled",
            Self::Skipped => "skipped",
            Self::Incomplete => "incomplete",
        }
    }

    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Skipped | Self::Incomplete)
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub code: &'static str,
    pub message: String,
}

impl StepFailure {
    /// The message carries the whole cause chain, outermost first.
    fn new(step: Step, err: &SalvageError) -> Self {
        let mut message = err.to_string();
        let mut cause = std::error::Error::source(err);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self {
            step,
            code: err.code().code(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOutcome {
    pub key: String,
    pub status: ProfileStatus,
    pub total_items: usize,
    pub kept: usize,
    pub removed: usize,
    pub anchors: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splices: Vec<Splice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,
}

impl ProfileOutcome {
    fn skipped(key: &str, total_items: usize, failure: StepFailure) -> Self {
        Self {
            key: key.to_string(),
            status: ProfileStatus::Skipped,
            total_items,
            kept: 0,
            removed: 0,
            anchors: 0,
            splices: Vec::new(),
            gift_id: None,
            error: Some(failure),
        }
    }

    fn reconciled(key: &str, result: &Reconciliation) -> Self {
        Self {
            key: key.to_string(),
            status: ProfileStatus::Reconciled,
            total_items: result.original_count(),
            kept: result.count(Verdict::Kept),
            removed: result.count(Verdict::Removed),
            anchors: result.count(Verdict::Anchor),
            splices: result.splices.clone(),
            gift_id: None,
            error: None,
        }
    }

    fn fail(&mut self, failure: StepFailure) {
        self.status = ProfileStatus::Incomplete;
        self.error = Some(failure);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub enabled: bool,
    pub dry_run: bool,
    pub profiles: Vec<ProfileOutcome>,
}

impl RunReport {
    /// The report of a run that was switched off in the configuration.
    #[must_use]
    pub const fn disabled(dry_run: bool) -> Self {
        Self {
            enabled: false,
            dry_run,
            profiles: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.profiles.iter().any(|p| p.status.is_failure())
    }

    #[must_use]
    pub fn count(&self, status: ProfileStatus) -> usize {
        self.profiles.iter().filter(|p| p.status == status).count()
    }

    #[must_use]
    pub fn items_kept(&self) -> usize {
        self.profiles.iter().map(|p| p.kept).sum()
    }
}

/// Reconcile a profile's inventory without touching the profile.
///
/// # Errors
///
/// Returns [`SalvageError::Forest`] if the inventory is not a forest.
pub fn reconcile_profile<O>(
    profile: &Profile,
    oracle: &O,
    options: ReconcileOptions,
) -> Result<Reconciliation, SalvageError>
where
    O: ItemValidityOracle + ?Sized,
{
    let inventory = profile.inventory();
    let roots = inventory.root_containers();
    Ok(reconcile::reconcile(
        inventory.items.clone(),
        &roots,
        oracle,
        options,
    )?)
}

/// Migrate every profile `source` offers.
///
/// Each profile's outcome lands in the report, failed or not. `now` stamps
/// the gift messages.
///
/// # Errors
///
/// Returns [`SalvageError::SourceUnavailable`] if the source cannot list
/// its profiles. Per-profile failures are never returned here.
pub fn run<S, O, M, W, Tz>(
    source: &S,
    oracle: &O,
    mailer: &mut M,
    writer: &mut W,
    options: &RunOptions,
    now: &DateTime<Tz>,
) -> Result<RunReport, SalvageError>
where
    S: ProfileSource + ?Sized,
    O: ItemValidityOracle + ?Sized,
    M: GiftMailer + ?Sized,
    W: ResidualWriter + ?Sized,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if !options.enabled {
        info!("run disabled, nothing to do");
        return Ok(RunReport::disabled(options.dry_run));
    }
    let mut report = RunReport {
        enabled: true,
        dry_run: options.dry_run,
        profiles: Vec::new(),
    };

    let keys = source.keys()?;
    info!(profiles = keys.len(), dry_run = options.dry_run, "starting run");

    for key in keys {
        let span = info_span!("profile", profile = %key);
        let _guard = span.enter();
        let outcome = migrate_one(&key, source, oracle, mailer, writer, options, now);
        info!(status = %outcome.status, kept = outcome.kept, removed = outcome.removed, "done");
        report.profiles.push(outcome);
    }

    info!(
        migrated = report.count(ProfileStatus::Migrated),
        skipped = report.count(ProfileStatus::Skipped),
        incomplete = report.count(ProfileStatus::Incomplete),
        "run finished"
    );
    Ok(report)
}

fn migrate_one<S, O, M, W, Tz>(
    key: &str,
    source: &S,
    oracle: &O,
    mailer: &mut M,
    writer: &mut W,
    options: &RunOptions,
    now: &DateTime<Tz>,
) -> ProfileOutcome
where
    S: ProfileSource + ?Sized,
    O: ItemValidityOracle + ?Sized,
    M: GiftMailer + ?Sized,
    W: ResidualWriter + ?Sized,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut profile = match source.load(key) {
        Ok(profile) => profile,
        Err(err) => {
            let failure = StepFailure::new(Step::Load, &err);
            warn!(step = %failure.step, code = failure.code, error = %failure.message, "profile skipped");
            return ProfileOutcome::skipped(key, 0, failure);
        }
    };

    let total = profile.inventory().items.len();
    info!(total_items = total, "loaded");

    let result = match reconcile_profile(&profile, oracle, options.reconcile) {
        Ok(result) => result,
        Err(err) => {
            let failure = StepFailure::new(Step::Reconcile, &err);
            warn!(step = %failure.step, code = failure.code, error = %failure.message, "profile skipped");
            return ProfileOutcome::skipped(key, total, failure);
        }
    };

    let mut outcome = ProfileOutcome::reconciled(key, &result);
    if options.dry_run {
        return outcome;
    }

    let Reconciliation {
        valid_items,
        residual_items,
        ..
    } = result;

    let id = gift_id(&options.gift_prefix, key);
    let gift = assemble_gift(key, &profile, valid_items, total, options.expiration_days, now);
    if let Err(err) = mailer.enqueue(&id, &gift) {
        let failure = StepFailure::new(Step::Gift, &err);
        warn!(step = %failure.step, code = failure.code, error = %failure.message, "gift not recorded, residual not written");
        outcome.fail(failure);
        return outcome;
    }
    outcome.gift_id = Some(id);

    profile.inventory_mut().items = residual_items;
    if let Err(err) = writer.write(key, &profile) {
        let failure = StepFailure::new(Step::Residual, &err);
        warn!(step = %failure.step, code = failure.code, error = %failure.message, "residual not written");
        outcome.fail(failure);
        return outcome;
    }

    outcome.status = ProfileStatus::Migrated;
    outcome
}
