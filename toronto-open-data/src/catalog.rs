//! Relevance ranking over catalog snapshots.
//!
//! Everything here is pure: the client fetches candidates from
//! `package_search` and these functions decide what the caller sees.

use crate::model::{DatasetRecord, SchemaField};

/// How a dataset matched a search query; stronger matches sort first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    /// The whole query appears in the title or description
    Phrase,
    /// At least one query keyword appears
    Keyword,
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

const SUFFIXES: [&str; 4] = ["ing", "es", "ed", "s"];

/// `word` with one common English suffix removed, so "restaurants" also
/// finds "restaurant". Stems shorter than three characters are not used.
fn stem(word: &str) -> &str {
    SUFFIXES
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .filter(|rest| rest.chars().count() >= 3)
        .unwrap_or(word)
}

/// Case-insensitive match of `query` against title and description.
///
/// Keywords match on their stem, so a plural query word still finds the
/// singular in the text.
pub fn match_strength(record: &DatasetRecord, query: &str) -> Option<MatchStrength> {
    let phrase = normalize(query);
    if phrase.is_empty() {
        return None;
    }

    let haystacks = [
        Some(normalize(&record.title)),
        record.description.as_deref().map(normalize),
    ];
    let haystacks: Vec<&str> = haystacks.iter().flatten().map(String::as_str).collect();

    if haystacks.iter().any(|h| h.contains(&phrase)) {
        return Some(MatchStrength::Phrase);
    }

    let words = keywords(query);
    if words
        .iter()
        .any(|word| haystacks.iter().any(|h| h.contains(stem(word))))
    {
        return Some(MatchStrength::Keyword);
    }

    None
}

/// Keep the records that match `query`, phrase matches first, and truncate
/// to `limit`. Records of equal strength keep their incoming order.
pub fn rank_datasets(records: Vec<DatasetRecord>, query: &str, limit: usize) -> Vec<DatasetRecord> {
    let mut matched: Vec<(MatchStrength, DatasetRecord)> = records
        .into_iter()
        .filter_map(|record| match_strength(&record, query).map(|strength| (strength, record)))
        .collect();

    // sort_by_key is stable, which preserves catalog order within a tier
    matched.sort_by_key(|(strength, _)| *strength);

    matched
        .into_iter()
        .take(limit)
        .map(|(_, record)| record)
        .collect()
}

/// Schema fields whose names share a word with `question`.
///
/// Field names are split on `_`, `-` and spaces; words shorter than three
/// characters are ignored on both sides. A prefix match in either direction
/// counts, so "inspections" finds `inspection_date`.
pub fn relevant_fields<'a>(schema: &'a [SchemaField], question: &str) -> Vec<&'a SchemaField> {
    let question_words: Vec<String> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect();

    if question_words.is_empty() {
        return Vec::new();
    }

    schema
        .iter()
        .filter(|field| {
            field
                .name
                .split(['_', '-', ' '])
                .filter(|w| w.chars().count() >= 3)
                .map(str::to_lowercase)
                .any(|fw| {
                    question_words
                        .iter()
                        .any(|qw| qw.starts_with(&fw) || fw.starts_with(qw.as_str()))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn record(id: &str, title: &str, description: Option<&str>) -> DatasetRecord {
        DatasetRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            tags: vec![],
            organization: None,
            resources: vec![],
        }
    }

    fn ids(records: &[DatasetRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn phrase_matches_rank_before_keyword_matches() {
        let records = vec![
            record("permits", "Building Permits", Some("Cleared permits")),
            record("bike-parking", "Bicycle Parking", Some("Racks for parking bicycles")),
            record("green-p", "Green P Parking", Some("Municipal parking lot locations")),
        ];

        let ranked = rank_datasets(records, "parking lot", 10);
        assert_eq!(ids(&ranked), vec!["green-p", "bike-parking"]);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let records = vec![
            record("b", "Traffic Volumes", None),
            record("a", "Traffic Signals", None),
            record("c", "Traffic Cameras", None),
        ];

        let ranked = rank_datasets(records, "TRAFFIC", 10);
        assert_eq!(ids(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn respects_limit() {
        let records = (0..20)
            .map(|i| record(&format!("d{i}"), "Parks", None))
            .collect();
        assert_eq!(rank_datasets(records, "parks", 5).len(), 5);
    }

    #[test]
    fn empty_query_and_no_match_are_empty() {
        let records = vec![record("a", "Parks", None)];
        assert!(rank_datasets(records.clone(), "", 10).is_empty());
        assert!(rank_datasets(records.clone(), "   ", 10).is_empty());
        assert!(rank_datasets(records, "budget", 10).is_empty());
    }

    #[test]
    fn description_is_searched_and_whitespace_normalized() {
        let r = record("d", "DineSafe", Some("Restaurant   inspection\nresults"));
        assert_eq!(
            match_strength(&r, "restaurant inspection"),
            Some(MatchStrength::Phrase)
        );
        assert_eq!(match_strength(&r, "health inspection"), Some(MatchStrength::Keyword));
        assert_eq!(match_strength(&r, "zoning"), None);
    }

    #[test]
    fn keywords_match_on_stem() {
        let r = record("dinesafe", "DineSafe", Some("Restaurant inspection results"));
        assert_eq!(match_strength(&r, "restaurants"), Some(MatchStrength::Keyword));
        assert_eq!(match_strength(&r, "inspections"), Some(MatchStrength::Keyword));
        assert_eq!(match_strength(&r, "bus"), None);

        assert_eq!(stem("parking"), "park");
        assert_eq!(stem("permits"), "permit");
        assert_eq!(stem("bus"), "bus");
        assert_eq!(stem("sees"), "sees");
    }

    #[test]
    fn question_words_select_fields() {
        let schema: Vec<SchemaField> = ["establishment_name", "inspection_date", "min_inspections_per_year", "id"]
            .iter()
            .map(|n| SchemaField {
                name: n.to_string(),
                field_type: FieldType::Text,
            })
            .collect();

        let found: Vec<&str> = relevant_fields(&schema, "Which restaurants had recent inspections?")
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(found, vec!["inspection_date", "min_inspections_per_year"]);

        assert!(relevant_fields(&schema, "a b").is_empty());
    }
}
