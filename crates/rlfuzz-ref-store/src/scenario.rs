//! End-to-end campaign wiring.
//!
//! Builds every collaborator from one `TrainingConfig`, attaches the oracle's
//! defect registry, the windowed statistics and (optionally) the transition
//! journal, then runs the trainer to completion.

use std::{fmt, path::PathBuf};

use serde::Serialize;
use tracing::info;

use rlfuzz_audit::{JournalFilter, TransitionJournal, WindowReport, WindowStats};
use rlfuzz_contracts::{
    config::TrainingConfig,
    error::{FuzzError, FuzzResult},
};
use rlfuzz_core::{traits::ServiceUnderTest, Trainer, TrainingReport};
use rlfuzz_oracle::{Finding, ServerErrorOracle};
use rlfuzz_policy::QNetwork;

use crate::{http::HttpService, payloads::TemplatePayloadGenerator, store::ReferenceStore};

/// Which service the campaign targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// The in-process reference store.
    #[default]
    Reference,
    /// A live service at `config.service.base_url`.
    Http,
}

impl std::str::FromStr for Target {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock" | "reference" => Ok(Target::Reference),
            "http" => Ok(Target::Http),
            other => Err(FuzzError::InvalidArgument {
                reason: format!("unknown target '{}': expected 'mock' or 'http'", other),
            }),
        }
    }
}

/// How the run is journaled.
#[derive(Debug, Clone, Default)]
pub struct JournalOptions {
    pub filter: JournalFilter,
    /// Stream entries here as JSON lines while the run progresses.
    pub path: Option<PathBuf>,
    /// Entries kept in memory; unbounded when unset.
    pub keep_last: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CampaignOptions {
    pub target: Target,
    /// Keep a hash-chained journal of the run.
    pub journal: Option<JournalOptions>,
}

fn journal_for(run_id: &str, options: &JournalOptions) -> FuzzResult<TransitionJournal> {
    let mut journal = TransitionJournal::new(run_id).with_filter(options.filter);
    if let Some(keep_last) = options.keep_last {
        journal = journal.with_retention(keep_last);
    }
    match &options.path {
        Some(path) => journal.streaming_to(path),
        None => Ok(journal),
    }
}

/// Everything a finished campaign produced.
#[derive(Serialize)]
pub struct CampaignOutcome {
    pub report: TrainingReport,
    /// Distinct defect combinations, most hits first.
    pub findings: Vec<Finding>,
    pub windows: Vec<WindowReport>,
    #[serde(skip)]
    pub journal: Option<TransitionJournal>,
}

impl fmt::Display for CampaignOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.report;
        writeln!(f, "Run {}", r.run_id)?;
        writeln!(
            f,
            "  episodes: {}  steps: {}  executes: {}  failed: {}",
            r.episodes, r.steps, r.executes, r.failed_executes
        )?;
        writeln!(
            f,
            "  total reward: {:.3}  defects: {}  unique combos: {}",
            r.total_reward,
            r.defects,
            self.findings.len()
        )?;
        if !self.findings.is_empty() {
            writeln!(f, "\nFindings:")?;
            for finding in &self.findings {
                writeln!(
                    f,
                    "  {:<45} {:>6} hits  (first: episode {}, step {})",
                    finding.combination, finding.hits, finding.first_episode, finding.first_step
                )?;
            }
        }
        Ok(())
    }
}

fn service_for(config: &TrainingConfig, target: Target) -> FuzzResult<Box<dyn ServiceUnderTest>> {
    Ok(match target {
        Target::Reference => Box::new(ReferenceStore::new()),
        Target::Http => Box::new(HttpService::new(&config.service)?),
    })
}

/// Assemble a trainer against `service`, returning the oracle handle that
/// shares its defect registry.
pub fn build_trainer(
    config: &TrainingConfig,
    service: Box<dyn ServiceUnderTest>,
) -> FuzzResult<(Trainer, ServerErrorOracle)> {
    let network = QNetwork::from_config(config)?;
    let payloads = TemplatePayloadGenerator::new(config.payload_seed());
    let oracle = ServerErrorOracle::new(config.rewards.clone());

    let trainer = Trainer::new(
        config.clone(),
        Box::new(network),
        service,
        Box::new(payloads),
        Box::new(oracle.clone()),
    )?;
    Ok((trainer, oracle))
}

/// Run one full campaign.
pub fn run_campaign(config: &TrainingConfig, options: &CampaignOptions) -> FuzzResult<CampaignOutcome> {
    let service = service_for(config, options.target)?;
    let (trainer, oracle) = build_trainer(config, service)?;

    let stats = WindowStats::new(config.log_every);
    let journal = options
        .journal
        .as_ref()
        .map(|o| journal_for(&trainer.run_id().to_string(), o))
        .transpose()?;

    let mut trainer = trainer.with_sink(Box::new(stats.clone()));
    if let Some(journal) = &journal {
        trainer = trainer.with_sink(Box::new(journal.clone()));
    }

    info!(
        run_id = %trainer.run_id(),
        target = ?options.target,
        episodes = config.episodes,
        seed = config.seed,
        "campaign starting"
    );
    let report = trainer.run()?;

    Ok(CampaignOutcome {
        report,
        findings: oracle.findings(),
        windows: stats.reports(),
        journal,
    })
}
