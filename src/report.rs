// 📊 Pass and tick reports
//
// Every pass reports what it looked at and what it changed, so a tick can be
// summarized in one log line and exposed through the status board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// PASS REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// "categories" or "months"
    pub pass: String,
    /// Attempt number that produced this report (1-based)
    pub attempt: u32,
    /// Unlinked transactions returned by the first query
    pub examined: usize,
    /// Relations written
    pub linked: usize,
    /// No counterpart record (or no join key) found
    pub no_match: usize,
    /// Name not in the category registry
    pub unregistered: usize,
    /// Relation filled by someone else between query and write
    pub already_linked: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    pub fn start(pass: &str, attempt: u32) -> Self {
        let now = Utc::now();
        PassReport {
            pass: pass.to_string(),
            attempt,
            examined: 0,
            linked: 0,
            no_match: 0,
            unregistered: 0,
            already_linked: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Records looked at but left untouched
    pub fn skipped(&self) -> usize {
        self.no_match + self.unregistered + self.already_linked
    }

    pub fn summary(&self) -> String {
        format!(
            "{} pass (attempt {}): {} examined, {} linked, {} without match, {} unregistered, {} already linked",
            self.pass,
            self.attempt,
            self.examined,
            self.linked,
            self.no_match,
            self.unregistered,
            self.already_linked
        )
    }
}

// ============================================================================
// TICK REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Succeeded(PassReport),
    Exhausted {
        pass: String,
        attempts: u32,
        error: String,
    },
}

impl PassOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PassOutcome::Succeeded(_))
    }

    pub fn pass(&self) -> &str {
        match self {
            PassOutcome::Succeeded(report) => &report.pass,
            PassOutcome::Exhausted { pass, .. } => pass,
        }
    }

    pub fn linked(&self) -> usize {
        match self {
            PassOutcome::Succeeded(report) => report.linked,
            PassOutcome::Exhausted { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick counter since the scheduler started
    pub tick: u64,
    /// Pass outcomes in execution order
    pub passes: Vec<PassOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TickReport {
    pub fn all_succeeded(&self) -> bool {
        self.passes.iter().all(PassOutcome::is_success)
    }

    pub fn total_linked(&self) -> usize {
        self.passes.iter().map(PassOutcome::linked).sum()
    }

    pub fn summary(&self) -> String {
        let failed: Vec<&str> = self
            .passes
            .iter()
            .filter(|p| !p.is_success())
            .map(PassOutcome::pass)
            .collect();

        if failed.is_empty() {
            format!("tick {}: {} relation(s) written", self.tick, self.total_linked())
        } else {
            format!(
                "tick {}: {} relation(s) written, gave up on {}",
                self.tick,
                self.total_linked(),
                failed.join(", ")
            )
        }
    }
}
