//! Join scored probes with their ground truth and compute per-language,
//! per-phenomenon accuracy.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use agreement_utils::Language;
use agreement_utils::rules::Phenomenon;
use itertools::Itertools;

use crate::scorer::ScoredClozeItem;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupStats {
    pub correct: usize,
    pub total: usize,
}

impl GroupStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Accuracy per (language, phenomenon) group. Every scored item contributes
/// to exactly one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentResult {
    pub groups: BTreeMap<(Language, Phenomenon), GroupStats>,
}

pub fn aggregate(items: &[ScoredClozeItem]) -> ExperimentResult {
    let grouped = items
        .iter()
        .into_group_map_by(|scored| (scored.item.language, scored.item.phenomenon));
    let groups = grouped
        .into_iter()
        .map(|(key, members)| {
            let stats = GroupStats {
                correct: members.iter().filter(|m| m.is_correct()).count(),
                total: members.len(),
            };
            (key, stats)
        })
        .collect();
    ExperimentResult { groups }
}

/// Write the result table as tab-separated values, one row per group.
pub fn write_results(result: &ExperimentResult, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "language\tphenomenon\tcorrect_count\ttotal_count\taccuracy"
    )?;
    for ((language, phenomenon), stats) in &result.groups {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.4}",
            language.iso_639_3(),
            phenomenon,
            stats.correct,
            stats.total,
            stats.accuracy()
        )?;
    }
    writer.flush()
}
