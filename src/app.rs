use std::time::{Duration, Instant};

use bio::io::fasta;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{WorkItem, WorkPlan};
use crate::error::KiraError;
use crate::fasta::{annotate_record, parse_records, scan_records};
use crate::resume::{OutputState, ResumePoint, resolve};
use crate::store::{OutputStore, ProgressMarker};
use crate::uniparc::UniparcClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAction {
    Fresh,
    Resumed,
    AlreadyComplete,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumedFrom {
    pub position: usize,
    pub gene: String,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output: String,
    pub action: RunAction,
    pub plan_items: usize,
    pub fetchable: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub records: usize,
    pub resumed_from: Option<ResumedFrom>,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<fasta::Record>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub output: String,
    pub state: OutputState,
    pub completed: usize,
    pub fetchable: usize,
    pub remaining: usize,
    pub next: Option<WorkItem>,
    /// Trailing output the next fetch cuts off and fetches again.
    pub drops_tail: bool,
    pub marker_rebuilt: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub done: usize,
    pub total: usize,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Sequential, resumable UniParc fetch into one FASTA file.
#[derive(Clone)]
pub struct App<U: UniparcClient> {
    client: U,
    splice_offset: usize,
}

impl<U: UniparcClient> App<U> {
    pub fn new(client: U, splice_offset: usize) -> Self {
        Self {
            client,
            splice_offset,
        }
    }

    pub fn run(
        &self,
        plan: &WorkPlan,
        store: &OutputStore,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, KiraError> {
        let _lock = store.lock()?;
        let point = resume_point(plan, store, self.splice_offset)?;

        if let Some(len) = point.truncate_to {
            warn!(output = %store.output_path(), offset = len, "dropping unconfirmed trailing record");
            store.truncate_output(len)?;
        }

        let action = match point.state {
            OutputState::Missing => {
                info!(output = %store.output_path(), "no output yet, starting fresh");
                store.start_fresh()?;
                RunAction::Fresh
            }
            OutputState::Complete => {
                info!(records = point.completed, "output already complete, nothing to fetch");
                let records = parse_records(store.output_path())?;
                let summary =
                    self.summary(plan, store, RunAction::AlreadyComplete, &point, 0, &records);
                return Ok(RunOutcome { records, summary });
            }
            OutputState::Partial => {
                if let Some(marker) = &point.repair_marker {
                    warn!(marker = %marker, "progress marker missing, rebuilding");
                    store.write_marker(marker)?;
                }
                if let Some(item) = plan.get(point.next) {
                    info!(
                        gene = %item.gene,
                        position = point.next,
                        completed = point.completed,
                        "resuming"
                    );
                }
                RunAction::Resumed
            }
        };

        let total = plan.fetchable_count();
        let mut done = point.completed;
        let mut fetched = 0usize;
        sink.event(ProgressEvent {
            message: "starting".to_string(),
            done,
            total,
            elapsed: None,
        });

        for item in &plan.items()[point.next..] {
            let Some(id) = &item.identifier else {
                debug!(gene = %item.gene, "no identifier, skipping");
                continue;
            };
            sink.event(ProgressEvent {
                message: format!("fetching {} of {}: {item}", done + 1, total),
                done,
                total,
                elapsed: None,
            });

            let start = Instant::now();
            let body = self.client.fetch_fasta(&item.gene, id)?;
            let record = annotate_record(&body, &item.gene, id, self.splice_offset)?;
            store.append_record(&record)?;
            store.write_marker(&ProgressMarker::new(item.gene.clone(), id.as_str()))?;
            done += 1;
            fetched += 1;

            let elapsed = start.elapsed();
            debug!(item = %item, latency_ms = elapsed.as_millis() as u64, "record appended");
            sink.event(ProgressEvent {
                message: format!("fetched {item}"),
                done,
                total,
                elapsed: Some(elapsed),
            });
        }

        let records = parse_records(store.output_path())?;
        info!(fetched, records = records.len(), "preprocessing completed");
        let summary = self.summary(plan, store, action, &point, fetched, &records);
        Ok(RunOutcome { records, summary })
    }

    fn summary(
        &self,
        plan: &WorkPlan,
        store: &OutputStore,
        action: RunAction,
        point: &ResumePoint,
        fetched: usize,
        records: &[fasta::Record],
    ) -> RunSummary {
        let resumed_from = match action {
            RunAction::Resumed => plan.get(point.next).map(|item| ResumedFrom {
                position: point.next,
                gene: item.gene.clone(),
                identifier: item.identifier.as_ref().map(|id| id.to_string()),
            }),
            _ => None,
        };
        RunSummary {
            output: store.output_path().to_string(),
            action,
            plan_items: plan.len(),
            fetchable: plan.fetchable_count(),
            skipped: plan.skipped_count(),
            fetched,
            records: records.len(),
            resumed_from,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Reports where a run would pick up, without locking or changing anything on disk.
pub fn status(
    plan: &WorkPlan,
    store: &OutputStore,
    splice_offset: usize,
) -> Result<StatusReport, KiraError> {
    let point = resume_point(plan, store, splice_offset)?;
    let fetchable = plan.fetchable_count();
    let next = plan.items()[point.next.min(plan.len())..]
        .iter()
        .find(|item| item.is_fetchable())
        .cloned();
    Ok(StatusReport {
        output: store.output_path().to_string(),
        state: point.state,
        completed: point.completed,
        fetchable,
        remaining: fetchable - point.completed,
        next,
        drops_tail: point.truncate_to.is_some(),
        marker_rebuilt: point.repair_marker.is_some(),
    })
}

fn resume_point(
    plan: &WorkPlan,
    store: &OutputStore,
    splice_offset: usize,
) -> Result<ResumePoint, KiraError> {
    if !store.output_exists() {
        return resolve(plan, None, None, store.output_path(), splice_offset);
    }
    let scan = scan_records(&store.read_output()?);
    let marker = store.read_marker()?;
    resolve(
        plan,
        Some(&scan),
        marker.as_ref(),
        store.output_path(),
        splice_offset,
    )
}
