//! Property tests for analysis, bucketing, paging, and sorting.

use halberd::aggregation::{Aggregation, Aggregator};
use halberd::analysis::DslAnalyzer;
use halberd::analysis::token_filter::stem::{RuleStemmer, Stemmer};
use halberd::document::Document;
use halberd::query::{SortField, SortOrder};
use halberd::search::{apply_paging, apply_sort};
use halberd::template::TemplateCache;
use proptest::prelude::*;
use serde_json::{Value, json};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

proptest! {
    #[test]
    fn stemming_never_grows_or_empties(word in "\\PC{0,24}") {
        let stemmed = RuleStemmer::new().stem(&word);
        let before = word.chars().count();
        let after = stemmed.chars().count();
        prop_assert!(after <= before);
        prop_assert!(after >= before.min(2));
    }

    #[test]
    fn stemming_reaches_a_fixpoint(word in "[a-z]{0,20}") {
        let stemmer = RuleStemmer::new();
        let stemmed = stemmer.stem(&word);
        prop_assert_eq!(stemmer.stem(&stemmed), stemmed);
    }

    #[test]
    fn reanalyzing_tokens_is_stable(text in "[A-Za-z0-9' -]{0,80}") {
        let analyzer = DslAnalyzer::new().unwrap();
        let tokens = analyzer.analyze_for_phrase(&text).unwrap();
        let joined = tokens.join(" ");
        prop_assert_eq!(analyzer.analyze_for_phrase(&joined).unwrap(), tokens);
        prop_assert_eq!(analyzer.analyze(&joined).unwrap(), analyzer.analyze(&text).unwrap());
    }

    #[test]
    fn analysis_never_fails(text in "\\PC{0,64}") {
        let analyzer = DslAnalyzer::new().unwrap();
        prop_assert!(analyzer.analyze(&text).is_ok());
        let phrase = analyzer.analyze_for_phrase(&text).unwrap();
        prop_assert!(phrase.iter().all(|token| !token.is_empty()));
    }

    #[test]
    fn terms_buckets_conserve_documents(cats in prop::collection::vec("[a-d]", 0..40)) {
        let docs: Vec<Document> = cats
            .iter()
            .enumerate()
            .map(|(i, cat)| doc(json!({"cat": cat, "v": i})))
            .collect();
        let refs: Vec<&Document> = docs.iter().collect();
        let agg: Aggregation = serde_json::from_value(json!({"groupBy": ["cat"]})).unwrap();

        let templates = TemplateCache::default();
        let result = Aggregator::new(&templates, true).execute(&refs, &agg);
        prop_assert_eq!(result.total_count(), docs.len());

        let mut keys: Vec<&str> = result.buckets.iter().map(|b| b.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        prop_assert_eq!(keys.len(), result.buckets.len());
    }

    #[test]
    fn range_routing_ignores_input_order(mut prices in prop::collection::vec(0u32..500, 1..30)) {
        let agg: Aggregation = serde_json::from_value(json!({"rangeBuckets": {"price": [
            {"key": "low", "to": 100},
            {"key": "mid", "from": 100, "to": 300},
            {"key": "high", "from": 300}
        ]}}))
        .unwrap();
        let templates = TemplateCache::default();
        let aggregator = Aggregator::new(&templates, true);

        let counts = |prices: &[u32]| {
            let docs: Vec<Document> = prices.iter().map(|p| doc(json!({"price": p}))).collect();
            let refs: Vec<&Document> = docs.iter().collect();
            aggregator
                .execute(&refs, &agg)
                .buckets
                .iter()
                .map(|b| (b.key.clone(), b.count))
                .collect::<Vec<_>>()
        };

        let forward = counts(&prices);
        prices.reverse();
        prop_assert_eq!(&forward, &counts(&prices));
        prop_assert_eq!(forward.iter().map(|(_, n)| n).sum::<usize>(), prices.len());
    }

    #[test]
    fn paging_is_a_clamped_slice(
        items in prop::collection::vec(any::<u8>(), 0..50),
        limit in -5i64..60,
        offset in -5i64..60,
    ) {
        let paged = apply_paging(items.clone(), limit, offset);
        let start = (offset.max(0) as usize).min(items.len());
        let end = if limit <= 0 {
            items.len()
        } else {
            (start + limit as usize).min(items.len())
        };
        prop_assert_eq!(paged, items[start..end].to_vec());
    }

    #[test]
    fn mixed_sort_ranks_numbers_before_text(
        values in prop::collection::vec(
            prop_oneof![
                (0i64..20).prop_map(|n| Some(json!(n))),
                "[a-c]{1,3}".prop_map(|s| Some(json!(s))),
                Just(None),
            ],
            0..60,
        )
    ) {
        let mut docs: Vec<Document> = values
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(v) => doc(json!({"v": v, "pos": i})),
                None => doc(json!({"pos": i})),
            })
            .collect();
        apply_sort(&mut docs, &[SortField::new("v", SortOrder::Asc)]);

        // numbers, then text, then missing
        let rank = |d: &Document| match d.get("v") {
            Some(Value::Number(n)) => (0, n.as_i64().unwrap(), String::new()),
            Some(Value::String(s)) => (1, 0, s.clone()),
            _ => (2, 0, String::new()),
        };
        for pair in docs.windows(2) {
            let (a, b) = (rank(&pair[0]), rank(&pair[1]));
            prop_assert!(a <= b, "{:?} before {:?}", a, b);
            if a == b {
                prop_assert!(pair[0]["pos"].as_u64().unwrap() < pair[1]["pos"].as_u64().unwrap());
            }
        }
    }

    #[test]
    fn sort_is_ordered_and_stable(values in prop::collection::vec(0i64..10, 0..40)) {
        let mut docs: Vec<Document> = values
            .iter()
            .enumerate()
            .map(|(i, v)| doc(json!({"v": v, "pos": i})))
            .collect();
        apply_sort(&mut docs, &[SortField::new("v", SortOrder::Asc)]);

        for pair in docs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (va, vb) = (a["v"].as_i64().unwrap(), b["v"].as_i64().unwrap());
            prop_assert!(va <= vb);
            if va == vb {
                prop_assert!(a["pos"].as_u64().unwrap() < b["pos"].as_u64().unwrap());
            }
        }
    }
}
