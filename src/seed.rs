//! Sample data for local development.

use crate::Client;
use crate::core::Result;
use crate::model::{Project, ProjectInput, ProjectStatus, TEAM_MEMBERS};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

const VERBS: [&str; 8] = [
    "Redesign", "Migrate", "Automate", "Launch", "Audit", "Optimize", "Integrate", "Refactor",
];
const NOUNS: [&str; 7] = [
    "Billing Portal", "Customer Dashboard", "Data Pipeline", "Mobile App",
    "Search Service", "Onboarding Flow", "Reporting Suite",
];

const MIN_BUDGET: u64 = 10_000;
const BUDGET_SPAN: u64 = 90_000;

#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    pub count: usize,
    /// Remove every existing project first.
    pub reset: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            count: 20,
            reset: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub removed: usize,
    pub inserted: usize,
}

/// The `index`-th sample project. Deterministic for a given `now`.
pub fn sample_input(index: usize, now: DateTime<Utc>) -> ProjectInput {
    let verb = VERBS[index % VERBS.len()];
    let noun = NOUNS[(index / VERBS.len() + index) % NOUNS.len()];
    let status = ProjectStatus::ALL[index % ProjectStatus::ALL.len()];
    let assignee = TEAM_MEMBERS[index % TEAM_MEMBERS.len()];
    let budget = MIN_BUDGET + (index as u64 * 7_919) % (BUDGET_SPAN + 1);
    let deadline = now + Duration::days(1 + (index as i64 * 11) % 365);

    ProjectInput::new()
        .name(format!("{} {}", verb, noun))
        .description(format!("{} the {} for the {} team.", verb, noun.to_lowercase(), assignee))
        .status(status)
        .deadline(deadline)
        .assigned_to(assignee)
        .budget(budget as f64)
}

pub async fn seed(client: &Client, options: SeedOptions) -> Result<SeedReport> {
    let removed = if options.reset {
        client
            .pool()
            .run(|conn| async move { conn.clear().await })
            .await?
    } else {
        0
    };

    let now = Utc::now();
    let mut inserted: Vec<Project> = Vec::with_capacity(options.count);
    for index in 0..options.count {
        inserted.push(client.records().create_at(sample_input(index, now), now).await?);
    }

    client
        .pool()
        .run(|conn| async move { conn.checkpoint().await })
        .await?;

    info!(removed, inserted = inserted.len(), "Seeded projects");
    Ok(SeedReport {
        removed,
        inserted: inserted.len(),
    })
}
