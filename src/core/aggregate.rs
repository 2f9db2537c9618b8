use crate::core::{CountryMetrics, GroupAggregate, ScoredRow};
use std::collections::HashMap;

/// Rolls scored rows up by phrase group, groups in first-seen order.
///
/// Volumes, scores and totals are summed; difficulty keeps the group maximum.
pub fn aggregate(rows: &[ScoredRow]) -> Vec<GroupAggregate> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupAggregate> = Vec::new();

    for row in rows {
        let position = *positions.entry(row.group.as_str()).or_insert_with(|| {
            groups.push(GroupAggregate {
                group: row.group.clone(),
                metrics: Vec::new(),
                total_score: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[position];

        if group.metrics.len() < row.metrics.len() {
            group.metrics.resize(row.metrics.len(), CountryMetrics::default());
        }
        for (acc, metrics) in group.metrics.iter_mut().zip(&row.metrics) {
            acc.volume += metrics.volume;
            acc.difficulty = acc.difficulty.max(metrics.difficulty);
            acc.score += metrics.score;
        }
        group.total_score += row.total_score;
    }

    groups
}
