//! Resume-point detection.
//!
//! The output file is the ground truth for how many records exist; the progress marker says
//! which plan item the last of them belongs to. [`resolve`] reconciles the two without
//! touching the disk, so the same answer backs both `fetch` and `status`.

use camino::Utf8Path;
use serde::Serialize;

use crate::domain::WorkPlan;
use crate::error::KiraError;
use crate::fasta::OutputScan;
use crate::store::ProgressMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    /// No output yet.
    Missing,
    Partial,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub state: OutputState,
    /// Plan position of the first item still to do.
    pub next: usize,
    /// Records kept in the output once `truncate_to` is applied.
    pub completed: usize,
    /// Cut the output at this byte offset: a torn trailing record, or one the marker never
    /// confirmed.
    pub truncate_to: Option<u64>,
    /// Marker to write before fetching, when the stored one is gone.
    pub repair_marker: Option<ProgressMarker>,
}

impl ResumePoint {
    fn missing() -> Self {
        Self {
            state: OutputState::Missing,
            next: 0,
            completed: 0,
            truncate_to: None,
            repair_marker: None,
        }
    }
}

/// `scan` is `None` when the output file does not exist.
///
/// Only records up to the marker count as done. A record past the marker may have been cut
/// off right after a line break, so it is dropped and fetched again.
pub fn resolve(
    plan: &WorkPlan,
    scan: Option<&OutputScan>,
    marker: Option<&ProgressMarker>,
    output: &Utf8Path,
    splice_offset: usize,
) -> Result<ResumePoint, KiraError> {
    let Some(scan) = scan else {
        return Ok(ResumePoint::missing());
    };
    let inconsistent = |reason: String| KiraError::InconsistentState {
        path: output.to_path_buf(),
        reason,
    };

    if scan.has_preamble {
        return Err(inconsistent(
            "output has data before its first FASTA header".to_string(),
        ));
    }

    let intact = scan.records.len();
    let fetchable = plan.fetchable_count();
    if intact > fetchable {
        return Err(inconsistent(format!(
            "output holds {intact} records but the gene table has only {fetchable} identifiers"
        )));
    }

    let torn_start = scan.torn.as_ref().map(|span| span.start);
    // everything from the last intact record on
    let unconfirmed_start = scan.records.last().map(|span| span.start);

    let (next, completed, truncate_to, repair_marker) = match marker {
        Some(marker) => {
            let positions = plan.positions_of(&marker.gene, &marker.identifier);
            if positions.is_empty() {
                return Err(inconsistent(format!(
                    "progress marker {marker} is not in the gene table"
                )));
            }

            if let Some(&pos) = positions
                .iter()
                .find(|&&pos| plan.completed_through(pos) == intact)
            {
                (pos + 1, intact, torn_start, None)
            } else if let Some(&pos) = positions
                .iter()
                .find(|&&pos| plan.completed_through(pos) + 1 == intact)
                && owns_record(plan, scan, intact, splice_offset)
            {
                // killed during or right after the append, before the marker moved
                (pos + 1, intact - 1, unconfirmed_start, None)
            } else {
                return Err(inconsistent(format!(
                    "progress marker {marker} does not line up with the {intact} records in the output"
                )));
            }
        }
        None if intact == 0 => (0, 0, torn_start, None),
        None => {
            for (idx, record) in scan.records.iter().enumerate() {
                if !owns_record(plan, scan, idx + 1, splice_offset) {
                    return Err(inconsistent(format!(
                        "no progress marker and record {} ('{}') does not match the gene table",
                        idx + 1,
                        record.header
                    )));
                }
            }
            let kept = intact - 1;
            match kept_through(plan, kept) {
                Some((pos, rebuilt)) => (pos + 1, kept, unconfirmed_start, Some(rebuilt)),
                None => (0, 0, unconfirmed_start, None),
            }
        }
    };

    let state = if completed == fetchable {
        OutputState::Complete
    } else {
        OutputState::Partial
    };
    Ok(ResumePoint {
        state,
        next,
        completed,
        truncate_to,
        repair_marker,
    })
}

/// Whether record `nth` (1-based) of the output is the one written for the `nth` fetchable
/// item.
fn owns_record(plan: &WorkPlan, scan: &OutputScan, nth: usize, splice_offset: usize) -> bool {
    let Some(item) = plan.nth_fetchable(nth).and_then(|pos| plan.get(pos)) else {
        return false;
    };
    let (Some(id), Some(record)) = (&item.identifier, scan.records.get(nth - 1)) else {
        return false;
    };
    record.belongs_to(&item.gene, id.as_str(), splice_offset)
}

/// Plan position and marker of the `nth` fetchable item; `None` for `nth == 0`.
fn kept_through(plan: &WorkPlan, nth: usize) -> Option<(usize, ProgressMarker)> {
    let pos = plan.nth_fetchable(nth)?;
    let marker = ProgressMarker::for_item(plan.get(pos)?)?;
    Some((pos, marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UniparcId, WorkItem};
    use crate::fasta::scan_records;

    fn plan(items: &[(&str, Option<&str>)]) -> WorkPlan {
        WorkPlan::new(
            items
                .iter()
                .map(|(gene, id)| {
                    WorkItem::new(*gene, id.map(|id| id.parse::<UniparcId>().unwrap()))
                })
                .collect(),
        )
    }

    #[test]
    fn duplicate_pairs_are_disambiguated_by_record_count() {
        let plan = plan(&[
            ("TP53", Some("UPI0000000001")),
            ("BRCA1", Some("UPI0000000002")),
            ("TP53", Some("UPI0000000001")),
            ("EGFR", Some("UPI0000000003")),
        ]);
        let scan = scan_records(
            b">UPI0000000001|TP53\nMK\n>UPI0000000002|BRCA1\nMK\n>UPI0000000001|TP53\nMK\n",
        );
        let marker = ProgressMarker::new("TP53", "UPI0000000001");
        let point =
            resolve(&plan, Some(&scan), Some(&marker), Utf8Path::new("o.fasta"), 14).unwrap();
        assert_eq!(point.next, 3);
        assert_eq!(point.completed, 3);
    }
}
