//! Scan dependency trees for token pairs standing in an agreement relation.
//!
//! The scan is driven entirely by the declarative rule table in
//! `agreement_utils::rules`; each rule that matches a token pair emits its
//! own instance, so a token participating in several qualifying relations
//! yields several instances.

use agreement_utils::rules::{ControllerSource, Phenomenon, PhenomenonRule, TargetSide, phenomena};
use agreement_utils::{Feature, Language, PartOfSpeech, agrees};

use crate::corpus::Sentence;

#[derive(Debug, Clone, PartialEq)]
pub struct AgreementInstance {
    pub uid: String,
    pub language: Language,
    pub phenomenon: Phenomenon,
    /// 0-based index of the agreement target (the word whose form co-varies).
    pub target: usize,
    /// 0-based index of the agreement controller.
    pub controller: usize,
    /// Features the cloze probe will vary, from the matching rule.
    pub varied: &'static [Feature],
}

/// Instances rejected during extraction, by reason. Nothing is dropped
/// without showing up here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtractStats {
    pub emitted: usize,
    /// Matched a rule for a phenomenon this language doesn't have.
    pub filtered_phenomenon: usize,
    /// Both tokens marked a feature with different values.
    pub rejected_disagreement: usize,
    /// Neither token marks any of the four features.
    pub rejected_unmarked: usize,
}

impl ExtractStats {
    pub fn merge(&mut self, other: ExtractStats) {
        self.emitted += other.emitted;
        self.filtered_phenomenon += other.filtered_phenomenon;
        self.rejected_disagreement += other.rejected_disagreement;
        self.rejected_unmarked += other.rejected_unmarked;
    }
}

fn pos_matches(pos: Option<PartOfSpeech>, allowed: &[PartOfSpeech]) -> bool {
    allowed.is_empty() || pos.is_some_and(|p| allowed.contains(&p))
}

/// Find the subject of the token at `head`: a nominal dependent attached to
/// it with the `nsubj` relation.
fn find_subject(sentence: &Sentence, head: usize) -> Option<usize> {
    sentence.tokens.iter().position(|token| {
        token.head == Some(head)
            && token.deprel == "nsubj"
            && matches!(token.upos, Some(PartOfSpeech::Noun) | Some(PartOfSpeech::Pron))
    })
}

/// Emit one `AgreementInstance` per (token pair, rule) match in `sentence`.
pub fn extract_instances(
    sentence: &Sentence,
    language: Language,
    rules: &[PhenomenonRule],
) -> (Vec<AgreementInstance>, ExtractStats) {
    let valid_phenomena = phenomena(language);
    let mut instances = Vec::new();
    let mut stats = ExtractStats::default();

    for (index, token) in sentence.tokens.iter().enumerate() {
        let Some(head) = token.head else {
            continue;
        };
        for rule in rules {
            if !rule.relations.contains(&token.deprel.as_str()) {
                continue;
            }
            if !pos_matches(token.upos, rule.dependent_pos) {
                continue;
            }
            let head_token = &sentence.tokens[head];
            if !pos_matches(head_token.upos, rule.head_pos) {
                continue;
            }
            if head_token
                .upos
                .is_some_and(|p| rule.excluded_head_pos.contains(&p))
            {
                continue;
            }

            let target = match rule.target {
                TargetSide::Dependent => index,
                TargetSide::Head => head,
            };
            let controller = match rule.controller {
                ControllerSource::Head => head,
                ControllerSource::Dependent => index,
                ControllerSource::SubjectOfHead => match find_subject(sentence, head) {
                    Some(subject) => subject,
                    None => continue, // maybe there is no subject
                },
            };
            if target == controller {
                continue;
            }

            let target_feats = &sentence.tokens[target].feats;
            let controller_feats = &sentence.tokens[controller].feats;
            if !agrees(target_feats, controller_feats) {
                stats.rejected_disagreement += 1;
                continue;
            }
            if target_feats.is_unmarked() && controller_feats.is_unmarked() {
                stats.rejected_unmarked += 1;
                continue;
            }
            if !valid_phenomena.contains(&rule.phenomenon) {
                stats.filtered_phenomenon += 1;
                continue;
            }

            stats.emitted += 1;
            instances.push(AgreementInstance {
                uid: format!("{}:{}:{}:{}", sentence.id, target, controller, rule.phenomenon),
                language,
                phenomenon: rule.phenomenon,
                target,
                controller,
                varied: rule.varied,
            });
        }
    }
    (instances, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SentenceReader;
    use agreement_utils::rules::RULES;
    use std::io::Cursor;

    fn sentence(text: &str) -> Sentence {
        SentenceReader::new(Cursor::new(text.to_string()), "test.conllu")
            .next()
            .unwrap()
            .unwrap()
    }

    const DOGS_RUN: &str = "\
# sent_id = en-1
1\tThe\tthe\tDET\t_\tDefinite=Def\t2\tdet\t_\t_
2\tdogs\tdog\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
3\trun\trun\tVERB\t_\tNumber=Plur\t0\troot\t_\t_
4\t.\t.\tPUNCT\t_\t_\t3\tpunct\t_\t_
";

    #[test]
    fn test_subject_verb_instance() {
        let sentence = sentence(DOGS_RUN);
        let (instances, stats) = extract_instances(&sentence, Language::English, RULES);
        let verb: Vec<_> = instances
            .iter()
            .filter(|i| i.phenomenon == Phenomenon::Verb)
            .collect();
        assert_eq!(verb.len(), 1);
        assert_eq!(verb[0].target, 2); // "run"
        assert_eq!(verb[0].controller, 1); // "dogs"
        assert_eq!(stats.rejected_disagreement, 0);
    }

    #[test]
    fn test_positions_in_range_and_distinct() {
        let sentence = sentence(DOGS_RUN);
        let (instances, _) = extract_instances(&sentence, Language::English, RULES);
        assert!(!instances.is_empty());
        for instance in &instances {
            assert!(instance.target < sentence.len());
            assert!(instance.controller < sentence.len());
            assert_ne!(instance.target, instance.controller);
        }
    }

    #[test]
    fn test_ambiguous_matches_each_emitted() {
        // "dogs" controls both the determiner and the verb agreement; the
        // noun participating in two relations must yield two instances
        let sentence = sentence(DOGS_RUN);
        let (instances, _) = extract_instances(&sentence, Language::English, RULES);
        assert_eq!(instances.len(), 2);
        let phenomena: Vec<_> = instances.iter().map(|i| i.phenomenon).collect();
        assert!(phenomena.contains(&Phenomenon::Determiner));
        assert!(phenomena.contains(&Phenomenon::Verb));
    }

    #[test]
    fn test_same_target_distinct_controllers_get_distinct_uids() {
        // a verb with two subject dependents (as the parser accepts) must not
        // collapse into one uid, or the scoring journal would conflate them
        let text = "\
# sent_id = x-1
1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
2\tcats\tcat\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
3\trun\trun\tVERB\t_\tNumber=Plur\t0\troot\t_\t_
";
        let sentence = sentence(text);
        let (instances, _) = extract_instances(&sentence, Language::English, RULES);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].target, instances[1].target);
        assert_ne!(instances[0].controller, instances[1].controller);
        assert_ne!(instances[0].uid, instances[1].uid);
    }

    #[test]
    fn test_disagreeing_pair_rejected() {
        let text = "\
1\tdog\tdog\tNOUN\t_\tNumber=Sing\t2\tnsubj\t_\t_
2\trun\trun\tVERB\t_\tNumber=Plur\t0\troot\t_\t_
";
        let sentence = sentence(text);
        let (instances, stats) = extract_instances(&sentence, Language::English, RULES);
        assert!(instances.is_empty());
        assert_eq!(stats.rejected_disagreement, 1);
    }

    #[test]
    fn test_phenomenon_not_in_language_is_filtered() {
        // amod agreement is not a phenomenon of English
        let text = "\
1\tbig\tbig\tADJ\t_\tNumber=Plur\t2\tamod\t_\t_
2\tdogs\tdog\tNOUN\t_\tNumber=Plur\t0\troot\t_\t_
";
        let sentence = sentence(text);
        let (instances, stats) = extract_instances(&sentence, Language::English, RULES);
        assert!(instances.is_empty());
        assert_eq!(stats.filtered_phenomenon, 1);

        let (instances, _) = extract_instances(&sentence, Language::German, RULES);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].phenomenon, Phenomenon::Modifying);
    }

    #[test]
    fn test_copula_controller_is_subject_of_predicate() {
        // "dogs are friends": cop attaches to the nominal predicate, the
        // subject attaches there too
        let text = "\
1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
2\tare\tbe\tAUX\t_\tNumber=Plur|Person=3\t3\tcop\t_\t_
3\tfriends\tfriend\tNOUN\t_\tNumber=Plur\t0\troot\t_\t_
";
        let sentence = sentence(text);
        let (instances, _) = extract_instances(&sentence, Language::English, RULES);
        let cop: Vec<_> = instances
            .iter()
            .filter(|i| i.phenomenon == Phenomenon::Verb)
            .collect();
        assert_eq!(cop.len(), 1);
        assert_eq!(cop[0].target, 1); // "are"
        assert_eq!(cop[0].controller, 0); // "dogs"
    }

    #[test]
    fn test_copula_of_adjective_left_to_predicated_rule() {
        let text = "\
1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
2\tare\tbe\tAUX\t_\tNumber=Plur\t3\tcop\t_\t_
3\tbig\tbig\tADJ\t_\tNumber=Plur\t0\troot\t_\t_
";
        let sentence = sentence(text);
        // Spanish has both predicated and verb agreement
        let (instances, _) = extract_instances(&sentence, Language::Spanish, RULES);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].phenomenon, Phenomenon::Predicated);
        assert_eq!(instances[0].target, 2); // "big"
    }
}
