use std::collections::HashSet;
use std::path::{Path, PathBuf};

use agreement_utils::rules::{Phenomenon, RULES};
use agreement_utils::{LANGUAGES, Language};
use anyhow::Context;
use log::{info, warn};

use run_experiment::aggregate::{aggregate, write_results};
use run_experiment::cloze::{self, ClozeItem, MaskSide, SkipReason};
use run_experiment::corpus::load_sentences;
use run_experiment::extract::extract_instances;
use run_experiment::morphology::{MorphologyTable, read_morphology};
use run_experiment::scorer::{HttpMaskedLm, score_items};
use run_experiment::summary::RunSummary;

struct Config {
    data_dir: PathBuf,
    out_dir: PathBuf,
    server_url: String,
    concurrency: usize,
}

impl Config {
    fn from_env() -> anyhow::Result<Config> {
        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
        let out_dir =
            PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| "./out".to_string()));
        let server_url = std::env::var("INFERENCE_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:8000/score".to_string());
        let concurrency = match std::env::var("SCORER_CONCURRENCY") {
            Ok(value) => value
                .parse()
                .context("SCORER_CONCURRENCY must be a positive integer")?,
            Err(_) => 8,
        };
        Ok(Config {
            data_dir,
            out_dir,
            server_url,
            concurrency,
        })
    }
}

/// Treebank files for `language`: every `.conllu` file under the
/// `ud/UD_<Language>*` directories of the data directory.
fn conllu_files(data_dir: &Path, language: Language) -> std::io::Result<Vec<PathBuf>> {
    let ud_dir = data_dir.join("ud");
    let prefix = format!("UD_{}", language.ud_name());
    let mut files = Vec::new();
    if !ud_dir.is_dir() {
        return Ok(files);
    }
    for entry in std::fs::read_dir(&ud_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // a plain prefix match, so "UD_Norwegian-Nynorsk" picks up both the
        // Nynorsk and NynorskLIA treebanks
        if !name.starts_with(&prefix) {
            continue;
        }
        if !entry.path().is_dir() {
            continue;
        }
        for file in std::fs::read_dir(entry.path())? {
            let path = file?.path();
            if path.extension().is_some_and(|ext| ext == "conllu") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn morphology_for(data_dir: &Path, language: Language) -> anyhow::Result<MorphologyTable> {
    let code = language.iso_639_3();
    let path = data_dir.join("unimorph").join(code).join(code);
    if path.is_file() {
        let table = read_morphology(&path)
            .with_context(|| format!("failed to read morphology table {}", path.display()))?;
        Ok(table)
    } else {
        // not every language has UniMorph coverage; the fallback candidates
        // come from the treebank's own feature annotations
        warn!("no morphology table for {code}, building one from the treebanks");
        Ok(MorphologyTable::default())
    }
}

/// Supplement the UniMorph table with the (lemma, form, features) triples
/// attested in the treebank itself, so languages without UniMorph coverage
/// still get candidate fillers.
fn absorb_treebank_forms(
    morphology: &mut MorphologyTable,
    sentences: &[run_experiment::corpus::Sentence],
) {
    for sentence in sentences {
        for token in &sentence.tokens {
            let Some(pos) = token.upos else {
                continue;
            };
            if token.lemma.is_empty() || token.lemma == "_" {
                continue;
            }
            morphology.add_attested(&token.lemma, &token.form, pos, token.feats.clone());
        }
    }
}

async fn run_language(
    config: &Config,
    language: Language,
    summary: &mut RunSummary,
) -> anyhow::Result<Vec<run_experiment::scorer::ScoredClozeItem>> {
    let files = conllu_files(&config.data_dir, language)?;
    if files.is_empty() {
        warn!("no treebanks found for {}", language.ud_name());
        return Ok(Vec::new());
    }

    let mut morphology = morphology_for(&config.data_dir, language)?;
    summary.morphology_lines_skipped += morphology.skipped_lines;

    let mut items: Vec<ClozeItem> = Vec::new();
    // one probe per distinct (masked sentence, phenomenon); treebanks repeat
    // sentences across splits
    let mut seen: HashSet<(Vec<String>, Phenomenon)> = HashSet::new();

    for file in &files {
        let (sentences, skipped) = load_sentences(file)?;
        summary.sentences_loaded += sentences.len();
        summary.sentences_skipped += skipped;

        absorb_treebank_forms(&mut morphology, &sentences);

        for sentence in &sentences {
            let (instances, stats) = extract_instances(sentence, language, RULES);
            summary.absorb_extract(stats);
            for instance in &instances {
                for side in [MaskSide::Target, MaskSide::Controller] {
                    match cloze::build(sentence, instance, &morphology, side) {
                        Ok(item) => {
                            let key = (item.masked_tokens.clone(), item.phenomenon);
                            if seen.insert(key) {
                                summary.items_built += 1;
                                items.push(item);
                            } else {
                                summary.items_deduplicated += 1;
                            }
                        }
                        Err(SkipReason::MissingForm) => summary.dropped_missing_form += 1,
                        Err(SkipReason::LemmaNotInMorphology) => {
                            summary.dropped_missing_lemma += 1
                        }
                        Err(SkipReason::InsufficientContrast) => {
                            summary.dropped_insufficient_contrast += 1
                        }
                    }
                }
            }
        }
    }

    info!(
        "{}: {} cloze items from {} treebank files",
        language.ud_name(),
        items.len(),
        files.len()
    );

    let journal_dir = config.out_dir.join("probabilities");
    std::fs::create_dir_all(&journal_dir)?;
    let journal = journal_dir.join(format!("{}.jsonl", language.iso_639_3()));
    let model = HttpMaskedLm::from_server(&config.server_url)?;
    score_items(&model, items, &journal, config.concurrency, summary).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;

    anyhow::ensure!(
        config.data_dir.is_dir(),
        "data directory {} does not exist; expected ud/ and unimorph/ under it",
        config.data_dir.display()
    );
    std::fs::create_dir_all(&config.out_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.out_dir.display()
        )
    })?;

    let mut summary = RunSummary::default();
    let mut scored = Vec::new();
    for &language in LANGUAGES {
        println!();
        println!("Scoring agreement in {}", language.ud_name());
        println!("================================================");
        let language_scored = run_language(&config, language, &mut summary)
            .await
            .with_context(|| format!("failed while processing {}", language.ud_name()))?;
        scored.extend(language_scored);
    }

    let results_path = config.out_dir.join("results.tsv");
    write_results(&aggregate(&scored), &results_path)
        .with_context(|| format!("failed to write {}", results_path.display()))?;
    info!("wrote {}", results_path.display());

    println!();
    println!("{summary}");
    Ok(())
}
