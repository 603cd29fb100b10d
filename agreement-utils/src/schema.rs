//! Conversion from the UniMorph annotation schema to the Universal
//! Dependencies one.
//!
//! The two datasets use different schemas and we need them in one. We use the
//! UD data in more places than the UniMorph data, so we convert UniMorph tags
//! to UD values rather than the other way around.

use crate::{CaseValue, Feature, FeatureBundle, GenderValue, NumberValue, PartOfSpeech, PersonValue};

/// The only parts of speech we are interested in for this project.
pub fn map_pos(tags: &[&str]) -> Option<PartOfSpeech> {
    for tag in tags {
        let mapped = match *tag {
            "V" | "V.PTCP" => Some(PartOfSpeech::Verb),
            "N" => Some(PartOfSpeech::Noun),
            "PRO" => Some(PartOfSpeech::Pron),
            "ADJ" => Some(PartOfSpeech::Adj),
            "ART" | "DET" => Some(PartOfSpeech::Det),
            "AUX" => Some(PartOfSpeech::Aux),
            _ => None,
        };
        if mapped.is_some() {
            return mapped;
        }
    }
    None
}

fn map_number(tag: &str) -> Option<NumberValue> {
    match tag {
        "SG" => Some(NumberValue::Sing),
        "PL" => Some(NumberValue::Plur),
        _ => None,
    }
}

fn map_gender(tag: &str) -> Option<GenderValue> {
    match tag {
        "MASC" => Some(GenderValue::Masc),
        "FEM" => Some(GenderValue::Fem),
        "NEUT" => Some(GenderValue::Neut),
        _ => None,
    }
}

fn map_case(tag: &str) -> Option<CaseValue> {
    match tag {
        "NOM" => Some(CaseValue::Nom),
        "ACC" => Some(CaseValue::Acc),
        "ERG" => Some(CaseValue::Erg),
        "ABS" => Some(CaseValue::Abs),
        _ => None,
    }
}

fn map_person(tag: &str) -> Option<PersonValue> {
    match tag {
        "1" => Some(PersonValue::First),
        "2" => Some(PersonValue::Second),
        "3" => Some(PersonValue::Third),
        _ => None,
    }
}

/// Build a UD-schema feature bundle from a UniMorph tag set. Tags we can't
/// map leave the feature unset.
pub fn bundle_from_unimorph(tags: &[&str]) -> FeatureBundle {
    let mut bundle = FeatureBundle::default();
    for tag in tags {
        if bundle.number.is_none() {
            bundle.number = map_number(tag);
        }
        if bundle.gender.is_none() {
            bundle.gender = map_gender(tag);
        }
        if bundle.case.is_none() {
            bundle.case = map_case(tag);
        }
        if bundle.person.is_none() {
            bundle.person = map_person(tag);
        }
    }
    bundle
}

/// Parse a UD FEATS column (`Number=Plur|Person=3`) into a bundle. Features
/// and values outside our inventory are ignored, as is the empty marker `_`.
pub fn bundle_from_ud_feats(feats: &str) -> FeatureBundle {
    let mut bundle = FeatureBundle::default();
    if feats == "_" {
        return bundle;
    }
    for pair in feats.split('|') {
        let Some((key, values)) = pair.split_once('=') else {
            continue;
        };
        let feature = match key {
            "Number" => Feature::Number,
            "Gender" => Feature::Gender,
            "Case" => Feature::Case,
            "Person" => Feature::Person,
            _ => continue,
        };
        // a feature can carry multiple values (`Gender=Fem,Masc`); take the
        // first one we recognize, like the annotation tooling does
        for value in values.split(',') {
            bundle.set_from_ud(feature, value);
            if bundle.value(feature).is_some() {
                break;
            }
        }
    }
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_pos_prefers_first_match() {
        assert_eq!(map_pos(&["V", "IND", "PRS"]), Some(PartOfSpeech::Verb));
        assert_eq!(map_pos(&["N", "PL"]), Some(PartOfSpeech::Noun));
        assert_eq!(map_pos(&["ADV"]), None);
    }

    #[test]
    fn test_bundle_from_unimorph() {
        let bundle = bundle_from_unimorph(&["V", "IND", "PRS", "3", "SG"]);
        assert_eq!(bundle.number, Some(NumberValue::Sing));
        assert_eq!(bundle.person, Some(PersonValue::Third));
        assert_eq!(bundle.gender, None);
        assert_eq!(bundle.case, None);
    }

    #[test]
    fn test_bundle_from_ud_feats() {
        let bundle = bundle_from_ud_feats("Case=Nom|Gender=Fem|Number=Plur");
        assert_eq!(bundle.case, Some(CaseValue::Nom));
        assert_eq!(bundle.gender, Some(GenderValue::Fem));
        assert_eq!(bundle.number, Some(NumberValue::Plur));

        assert!(bundle_from_ud_feats("_").is_unmarked());
        // unknown features and values are ignored, multivalues take the first
        let bundle = bundle_from_ud_feats("Mood=Ind|Gender=Fem,Masc|Case=Loc");
        assert_eq!(bundle.gender, Some(GenderValue::Fem));
        assert_eq!(bundle.case, None);
    }
}
