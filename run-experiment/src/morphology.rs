//! Read UniMorph inflection tables into a lemma-keyed map.
//!
//! Each line is lemma, inflected form and a `;`-separated feature tag set.
//! The tags are converted into the Universal Dependencies schema (see
//! `agreement_utils::schema`); forms are case-folded because we don't expect
//! feature values to differ by casing.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use agreement_utils::{FeatureBundle, PartOfSpeech, normalize_form, schema};
use log::warn;

use crate::error::ParseError;

const UNIMORPH_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Inflection {
    pub form: String,
    pub pos: Option<PartOfSpeech>,
    pub features: FeatureBundle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphologyEntry {
    pub inflections: Vec<Inflection>,
}

/// All inflection tables for one language, keyed by lemma. Read-only after
/// load.
#[derive(Debug, Default)]
pub struct MorphologyTable {
    pub entries: BTreeMap<String, MorphologyEntry>,
    pub skipped_lines: usize,
}

impl MorphologyTable {
    pub fn get(&self, lemma: &str) -> Option<&MorphologyEntry> {
        self.entries.get(lemma)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a table from (lemma, form, tag-set) triples, applying the same
    /// normalization as the file reader.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str, &'a [&'a str])>) -> Self {
        let mut table = MorphologyTable::default();
        for (lemma, form, tags) in rows {
            table.add(lemma, form, tags);
        }
        table
    }

    fn add(&mut self, lemma: &str, form: &str, tags: &[&str]) {
        let features = schema::bundle_from_unimorph(tags);
        self.insert(lemma, form, schema::map_pos(tags), features);
    }

    /// Record a form attested outside UniMorph, e.g. in a treebank's own
    /// annotation. Lets languages without UniMorph coverage still offer
    /// candidate fillers.
    pub fn add_attested(
        &mut self,
        lemma: &str,
        form: &str,
        pos: PartOfSpeech,
        features: FeatureBundle,
    ) {
        self.insert(lemma, form, Some(pos), features);
    }

    fn insert(
        &mut self,
        lemma: &str,
        form: &str,
        pos: Option<PartOfSpeech>,
        features: FeatureBundle,
    ) {
        // an entry with no value in any feature we track can never contrast
        if features.is_unmarked() {
            return;
        }
        let inflection = Inflection {
            form: normalize_form(form),
            pos,
            features,
        };
        let entry = self.entries.entry(normalize_form(lemma)).or_default();
        // syncretism gives identical rows for different tag sets; keep one
        if !entry.inflections.contains(&inflection) {
            entry.inflections.push(inflection);
        }
    }
}

pub fn read_morphology(path: &Path) -> std::io::Result<MorphologyTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut table = MorphologyTable::default();
    let path_display = path.display().to_string();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < UNIMORPH_FIELDS {
            let error = ParseError::TooFewFields {
                path: path_display.clone(),
                line: line_no + 1,
                found: fields.len(),
                expected: UNIMORPH_FIELDS,
            };
            warn!("skipping morphology line: {error}");
            table.skipped_lines += 1;
            continue;
        }
        let tags: Vec<&str> = fields[2].split(';').map(str::trim).collect();
        table.add(fields[0], fields[1], &tags);
    }
    Ok(table)
}
