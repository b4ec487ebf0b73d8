//! Windowed training statistics.
//!
//! `WindowStats` aggregates the transition stream over fixed windows of
//! episodes and seals a `WindowReport` at the end of each window. Clones
//! share state, like `TransitionJournal`.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use rlfuzz_contracts::{
    action::ACTION_COUNT,
    error::{FuzzError, FuzzResult},
    execution::{EpisodeSummary, Transition},
};
use rlfuzz_core::traits::TransitionSink;

/// Number of defect combinations listed in a report.
pub const TOP_COMBOS: usize = 5;

/// Sealed statistics for one window of episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    /// Episode count at the end of the window (1-based, cumulative).
    pub through_episode: u64,
    pub episodes: u64,
    pub avg_reward: f64,
    /// Distinct defect combinations seen in this window.
    pub unique_defects: usize,
    pub defects: u64,
    pub executes: u64,
    pub dial_turns: u64,
    pub verbs: BTreeMap<String, u64>,
    pub resources: BTreeMap<String, u64>,
    pub fields: BTreeMap<String, u64>,
    pub strategies: BTreeMap<String, u64>,
    pub intensities: BTreeMap<String, u64>,
    /// Most frequent defect combinations, most hits first.
    pub top_defects: Vec<(String, u64)>,
    /// Times each action index was taken.
    pub action_counts: Vec<u64>,
}

impl WindowReport {
    /// Share of steps that were executes, in percent.
    pub fn execute_ratio(&self) -> f64 {
        let steps = self.executes + self.dial_turns;
        if steps == 0 {
            0.0
        } else {
            100.0 * self.executes as f64 / steps as f64
        }
    }
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(
            f,
            "Episode {} | Avg Reward: {:.3} | Unique Defect Combos: {}",
            self.through_episode, self.avg_reward, self.unique_defects
        )?;
        writeln!(
            f,
            "Execute ratio: {:.1}% ({} executes, {} dial-turns)",
            self.execute_ratio(),
            self.executes,
            self.dial_turns
        )?;

        for (title, counts) in [
            ("Verb", &self.verbs),
            ("Resource", &self.resources),
            ("Strategy", &self.strategies),
            ("Field", &self.fields),
            ("Intensity", &self.intensities),
        ] {
            writeln!(f, "\n--- {title} Distribution ---")?;
            for (name, count) in counts {
                writeln!(f, "  {name:<15}: {count}")?;
            }
        }

        if !self.top_defects.is_empty() {
            writeln!(f, "\n--- Top Defect Combos ---")?;
            for (combo, hits) in &self.top_defects {
                writeln!(f, "  {combo}: {hits} times")?;
            }
        }

        writeln!(f, "\n--- Raw Action Distribution ---")?;
        let mut separator = "";
        for (index, count) in self.action_counts.iter().enumerate() {
            if *count > 0 {
                write!(f, "{separator}[{index}]:{count}")?;
                separator = " ";
            }
        }
        writeln!(f)
    }
}

// ── Internal accumulator ──────────────────────────────────────────────────────

#[derive(Default)]
struct Accumulator {
    episodes: u64,
    reward: f64,
    defects: u64,
    executes: u64,
    dial_turns: u64,
    verbs: BTreeMap<String, u64>,
    resources: BTreeMap<String, u64>,
    fields: BTreeMap<String, u64>,
    strategies: BTreeMap<String, u64>,
    intensities: BTreeMap<String, u64>,
    defect_combos: BTreeMap<String, u64>,
    action_counts: Vec<u64>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            action_counts: vec![0; ACTION_COUNT],
            ..Self::default()
        }
    }

    fn observe(&mut self, t: &Transition) {
        if let Some(count) = self.action_counts.get_mut(t.action) {
            *count += 1;
        }
        let Some(spec) = t.executed else {
            self.dial_turns += 1;
            return;
        };
        self.executes += 1;
        bump(&mut self.verbs, spec.verb.to_string());
        bump(&mut self.resources, spec.resource.to_string());
        bump(&mut self.fields, spec.field.to_string());
        bump(&mut self.strategies, spec.strategy.to_string());
        bump(&mut self.intensities, spec.intensity.to_string());
        if t.status == Some(500) {
            self.defects += 1;
            bump(&mut self.defect_combos, spec.to_string());
        }
    }

    fn seal(&self, through_episode: u64) -> WindowReport {
        let mut top: Vec<(String, u64)> = self
            .defect_combos
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(TOP_COMBOS);

        WindowReport {
            through_episode,
            episodes: self.episodes,
            avg_reward: if self.episodes == 0 {
                0.0
            } else {
                self.reward / self.episodes as f64
            },
            unique_defects: self.defect_combos.len(),
            defects: self.defects,
            executes: self.executes,
            dial_turns: self.dial_turns,
            verbs: self.verbs.clone(),
            resources: self.resources.clone(),
            fields: self.fields.clone(),
            strategies: self.strategies.clone(),
            intensities: self.intensities.clone(),
            top_defects: top,
            action_counts: self.action_counts.clone(),
        }
    }
}

fn bump(map: &mut BTreeMap<String, u64>, key: String) {
    *map.entry(key).or_insert(0) += 1;
}

struct StatsState {
    window: u64,
    episodes_seen: u64,
    current: Accumulator,
    reports: Vec<WindowReport>,
}

impl StatsState {
    fn close_window(&mut self) {
        let report = self.current.seal(self.episodes_seen);
        info!(
            through_episode = report.through_episode,
            avg_reward = report.avg_reward,
            unique_defects = report.unique_defects,
            execute_ratio = report.execute_ratio(),
            "statistics window closed"
        );
        self.reports.push(report);
        self.current = Accumulator::new();
    }
}

// ── Public sink ───────────────────────────────────────────────────────────────

/// `TransitionSink` that seals a report every `window` episodes.
#[derive(Clone)]
pub struct WindowStats {
    state: Arc<Mutex<StatsState>>,
}

impl WindowStats {
    /// `window` is clamped to at least one episode.
    pub fn new(window: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(StatsState {
                window: window.max(1),
                episodes_seen: 0,
                current: Accumulator::new(),
                reports: Vec::new(),
            })),
        }
    }

    /// Every sealed report so far, oldest first.
    pub fn reports(&self) -> Vec<WindowReport> {
        self.lock().reports.clone()
    }

    pub fn latest(&self) -> Option<WindowReport> {
        self.lock().reports.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for_write(&self) -> FuzzResult<std::sync::MutexGuard<'_, StatsState>> {
        self.state.lock().map_err(|e| FuzzError::JournalWriteFailed {
            reason: format!("statistics lock poisoned: {}", e),
        })
    }
}

impl TransitionSink for WindowStats {
    fn record(&mut self, transition: &Transition) -> FuzzResult<()> {
        self.lock_for_write()?.current.observe(transition);
        Ok(())
    }

    fn episode_finished(&mut self, summary: &EpisodeSummary) -> FuzzResult<()> {
        let mut state = self.lock_for_write()?;
        state.episodes_seen += 1;
        state.current.episodes += 1;
        state.current.reward += summary.total_reward;
        if state.current.episodes >= state.window {
            state.close_window();
        }
        Ok(())
    }

    /// Seal a trailing partial window, if any.
    fn finalize(&mut self, _run_id: &str) -> FuzzResult<()> {
        let mut state = self.lock_for_write()?;
        if state.current.episodes > 0 {
            state.close_window();
        }
        Ok(())
    }
}
