use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::KiraError;

/// Cell values the gene table uses for "no identifier".
const MISSING_TOKENS: &[&str] = &[
    "", "nan", "NaN", "NAN", "-nan", "NA", "N/A", "n/a", "null", "NULL", "None", "#N/A", "-",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UniparcId(String);

impl UniparcId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a table cell, mapping the missing-value tokens to `None`.
    pub fn parse_cell(cell: &str) -> Result<Option<Self>, KiraError> {
        let trimmed = cell.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for UniparcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UniparcId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
        if !is_valid {
            return Err(KiraError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub gene: String,
    pub identifier: Option<UniparcId>,
}

impl WorkItem {
    pub fn new(gene: impl Into<String>, identifier: Option<UniparcId>) -> Self {
        Self {
            gene: gene.into(),
            identifier,
        }
    }

    pub fn is_fetchable(&self) -> bool {
        self.identifier.is_some()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{}:{}", self.gene, id),
            None => write!(f, "{}:<missing>", self.gene),
        }
    }
}

/// Gene symbol to identifiers, both in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct GeneMap {
    genes: Vec<(String, Vec<Option<UniparcId>>)>,
    positions: HashMap<String, usize>,
}

impl GeneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, gene: &str, identifier: Option<UniparcId>) {
        match self.positions.get(gene) {
            Some(&idx) => self.genes[idx].1.push(identifier),
            None => {
                self.positions.insert(gene.to_string(), self.genes.len());
                self.genes.push((gene.to_string(), vec![identifier]));
            }
        }
    }

    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<UniparcId>)>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (gene, identifier) in rows {
            map.push(gene.as_ref(), identifier);
        }
        map
    }

    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.genes.iter().map(|(gene, _)| gene.as_str())
    }

    pub fn identifiers(&self, gene: &str) -> Option<&[Option<UniparcId>]> {
        self.positions
            .get(gene)
            .map(|&idx| self.genes[idx].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

type PairKey = (String, String);

/// The flattened, ordered list of items a run works through.
///
/// Position in this list is the resume coordinate. `fetchable_rank[i]` is the number of
/// fetchable items in `items[..=i]`, which is how many records the output must hold once
/// item `i` is done.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    items: Vec<WorkItem>,
    fetchable_rank: Vec<usize>,
    index: HashMap<PairKey, Vec<usize>>,
}

impl WorkPlan {
    pub fn new(items: Vec<WorkItem>) -> Self {
        let mut fetchable_rank = Vec::with_capacity(items.len());
        let mut index: HashMap<PairKey, Vec<usize>> = HashMap::new();
        let mut rank = 0usize;
        for (pos, item) in items.iter().enumerate() {
            if let Some(id) = &item.identifier {
                rank += 1;
                index
                    .entry((item.gene.clone(), id.as_str().to_string()))
                    .or_default()
                    .push(pos);
            }
            fetchable_rank.push(rank);
        }
        Self {
            items,
            fetchable_rank,
            index,
        }
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn get(&self, pos: usize) -> Option<&WorkItem> {
        self.items.get(pos)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn fetchable_count(&self) -> usize {
        self.fetchable_rank.last().copied().unwrap_or(0)
    }

    pub fn skipped_count(&self) -> usize {
        self.len() - self.fetchable_count()
    }

    /// Number of fetchable items up to and including `pos`.
    pub fn completed_through(&self, pos: usize) -> usize {
        self.fetchable_rank.get(pos).copied().unwrap_or(0)
    }

    /// Every plan position holding `(gene, identifier)`, ascending.
    pub fn positions_of(&self, gene: &str, identifier: &str) -> &[usize] {
        self.index
            .get(&(gene.to_string(), identifier.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Plan position of the `n`-th fetchable item (1-based), if any.
    pub fn nth_fetchable(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        let pos = self.fetchable_rank.partition_point(|&rank| rank < n);
        (pos < self.items.len()).then_some(pos)
    }

    /// Fetchable items in plan order, paired with their plan positions.
    pub fn fetchable(&self) -> impl Iterator<Item = (usize, &WorkItem, &UniparcId)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(pos, item)| item.identifier.as_ref().map(|id| (pos, item, id)))
    }
}

impl From<GeneMap> for WorkPlan {
    fn from(map: GeneMap) -> Self {
        let items = map
            .genes
            .into_iter()
            .flat_map(|(gene, ids)| {
                ids.into_iter()
                    .map(move |identifier| WorkItem::new(gene.clone(), identifier))
            })
            .collect();
        WorkPlan::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> Option<UniparcId> {
        Some(value.parse().unwrap())
    }

    #[test]
    fn nth_fetchable_skips_missing() {
        let plan = WorkPlan::new(vec![
            WorkItem::new("A", None),
            WorkItem::new("A", id("UPI0000000001")),
            WorkItem::new("B", None),
            WorkItem::new("B", id("UPI0000000002")),
        ]);
        assert_eq!(plan.nth_fetchable(0), None);
        assert_eq!(plan.nth_fetchable(1), Some(1));
        assert_eq!(plan.nth_fetchable(2), Some(3));
        assert_eq!(plan.nth_fetchable(3), None);
        assert_eq!(plan.completed_through(2), 1);
    }
}
