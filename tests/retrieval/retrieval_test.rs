//! Integration tests for table retrieval over a small asset-monitoring schema.

use heron::config::RetrievalSettings;
use heron::retrieval::{
    self, BoostRule, OverlapRetriever, RetrievalStrategy, TablePredicate, TableRetriever,
    WeightedRetriever,
};
use heron::schema::SchemaIndex;

const SCHEMA: &str = r#"{
    "Site": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "Name", "type": "NVARCHAR(200)"},
            {"name": "ZoneId", "type": "INTEGER"}
        ],
        "sample_values": {"Name": ["Surat", "Vapi", "Udhna"]}
    },
    "Zone": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "Name", "type": "NVARCHAR(100)", "sample_values": ["Western", "Central"]}
        ]
    },
    "Asset": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "SiteId", "type": "INTEGER"},
            {"name": "AssetTypeId", "type": "INTEGER"}
        ]
    },
    "PointMachineData": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "SiteId", "type": "INTEGER"},
            {"name": "Current", "type": "FLOAT"},
            {"name": "Voltage", "type": "FLOAT"},
            {"name": "TimeStamp", "type": "DATETIME"}
        ]
    },
    "AlertAudit": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "SiteId", "type": "INTEGER"},
            {"name": "AlertId", "type": "INTEGER"}
        ]
    },
    "Alert": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "AlertName", "type": "NVARCHAR(200)"}
        ]
    },
    "SI24": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "SiteId", "type": "INTEGER"},
            {"name": "FailureType", "type": "NVARCHAR(50)"}
        ]
    }
}"#;

fn schema() -> SchemaIndex {
    SchemaIndex::from_json_str(SCHEMA, 5).unwrap()
}

fn boosts() -> Vec<BoostRule> {
    vec![
        BoostRule::new(
            &["current", "voltage"],
            TablePredicate::Named(vec![
                "PointMachineData".into(),
                "SiteAttributeData".into(),
                "Asset".into(),
            ]),
            4,
        ),
        BoostRule::new(&["failure", "default"], TablePredicate::Named(vec!["SI24".into()]), 6),
        BoostRule::new(&["alert"], TablePredicate::Prefix("alert".into()), 5),
    ]
}

fn weighted() -> WeightedRetriever {
    WeightedRetriever::new(boosts())
}

fn scores(retriever: &dyn TableRetriever, question: &str) -> Vec<(String, u32)> {
    retriever
        .rank(&schema(), question)
        .into_iter()
        .map(|t| (t.name, t.score))
        .collect()
}

// ============================================================================
// Shared contract
// ============================================================================

#[test]
fn test_empty_question_matches_nothing() {
    let schema = schema();
    for retriever in [
        Box::new(weighted()) as Box<dyn TableRetriever>,
        Box::new(OverlapRetriever::default()),
    ] {
        assert!(retriever.find_relevant_tables(&schema, "", 4).is_empty());
        assert!(retriever.find_relevant_tables(&schema, "   ", 4).is_empty());
        assert!(retriever.find_relevant_tables(&schema, "?! ...", 4).is_empty());
    }
}

#[test]
fn test_result_never_exceeds_k() {
    let schema = schema();
    for k in 1..=3 {
        let tables = weighted().find_relevant_tables(&schema, "show id", k);
        assert_eq!(tables.len(), k);
    }
    // Fewer matches than k returns what there is.
    assert_eq!(weighted().find_relevant_tables(&schema, "list sites table site", 10), vec!["Site"]);
}

#[test]
fn test_ties_keep_schema_order() {
    let tables = weighted().find_relevant_tables(&schema(), "show id", 7);
    assert_eq!(
        tables,
        vec!["Site", "Zone", "Asset", "PointMachineData", "AlertAudit", "Alert", "SI24"]
    );
}

#[test]
fn test_ranking_is_deterministic() {
    let schema = schema();
    let question = "max current and voltage at Surat per zone";
    for retriever in [
        Box::new(weighted()) as Box<dyn TableRetriever>,
        Box::new(OverlapRetriever::default()),
    ] {
        let first = retriever.rank(&schema, question);
        for _ in 0..10 {
            assert_eq!(retriever.rank(&schema, question), first);
        }
    }
}

// ============================================================================
// Weighted strategy
// ============================================================================

#[test]
fn test_exact_table_name_scores_three() {
    assert_eq!(scores(&weighted(), "show all site names"), vec![("Site".to_string(), 3)]);
}

#[test]
fn test_sample_value_and_boosts() {
    assert_eq!(
        scores(&weighted(), "give the max current at Surat"),
        vec![
            ("PointMachineData".to_string(), 6),
            ("Site".to_string(), 5),
            ("Asset".to_string(), 4),
        ]
    );
}

#[test]
fn test_sample_match_is_case_insensitive() {
    assert_eq!(scores(&weighted(), "sites in WESTERN"), vec![("Zone".to_string(), 5)]);
}

#[test]
fn test_alert_prefix_boost() {
    assert_eq!(
        scores(&weighted(), "list alert history"),
        vec![("Alert".to_string(), 8), ("AlertAudit".to_string(), 5)]
    );
}

#[test]
fn test_failure_boost() {
    assert_eq!(
        scores(&weighted(), "count failure events"),
        vec![("SI24".to_string(), 6)]
    );
}

#[test]
fn test_without_boosts() {
    assert_eq!(
        scores(&WeightedRetriever::default(), "give the max current at Surat"),
        vec![("Site".to_string(), 5), ("PointMachineData".to_string(), 2)]
    );
}

// ============================================================================
// Overlap strategy
// ============================================================================

#[test]
fn test_overlap_singularises_tokens() {
    let tables = OverlapRetriever::default().find_relevant_tables(&schema(), "zones and their sites", 2);
    assert_eq!(tables, vec!["Site", "Zone"]);
}

#[test]
fn test_overlap_fuzzy_match() {
    // "voltge" is one edit away from "voltage"
    let ranked = scores(&OverlapRetriever::default(), "voltge");
    assert_eq!(ranked, vec![("PointMachineData".to_string(), 1)]);
}

#[test]
fn test_overlap_ignores_samples() {
    assert!(scores(&OverlapRetriever::default(), "Surat").is_empty());
}

// ============================================================================
// Strategy selection
// ============================================================================

#[test]
fn test_strategy_from_settings() {
    let mut settings = RetrievalSettings::default();
    assert_eq!(retrieval::from_settings(&settings).name(), "weighted");

    settings.strategy = "overlap".parse().unwrap();
    assert_eq!(retrieval::from_settings(&settings).name(), "overlap");

    assert!("cosine".parse::<RetrievalStrategy>().is_err());
}
