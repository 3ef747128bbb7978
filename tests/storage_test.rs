// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Storage Tests
 * Observation and finding persistence, bundle export
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use bhd_assist::errors::AssistError;
use bhd_assist::export::BhdCliExport;
use bhd_assist::playbooks::PlaybookLoader;
use bhd_assist::schema::{SchemaKind, SchemaValidator};
use bhd_assist::storage::JsonlStore;
use bhd_assist::types::{Observation, ObservationCategory};
use common::observation;
use serde_json::json;
use std::path::Path;

#[test]
fn test_observation_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path()).unwrap();

    let first = observation(
        "obs-1",
        ObservationCategory::Port,
        json!({"host": "10.0.0.5", "port": 22, "state": "open"}),
    );
    let second = observation(
        "obs-2",
        ObservationCategory::Technology,
        json!({"host": "app", "stack": {"server": "nginx", "versions": [1, 25]}}),
    );

    assert_eq!(store.save_observation(&first).unwrap(), "obs-1");
    store.save_observation(&second).unwrap();

    let loaded = store.load_observations().unwrap();
    assert_eq!(loaded.len(), 2);

    for (original, back) in [&first, &second].into_iter().zip(&loaded) {
        assert_eq!(back.id, original.id);
        assert_eq!(back.category, original.category);
        assert_eq!(back.tags, original.tags);
        assert_eq!(back.confidence, original.confidence);
        assert_eq!(back.data, original.data);
        assert_eq!(back.created_at, original.created_at);
    }
}

/// Uniform floats in [0, 1) using all 53 mantissa bits
fn full_precision_floats(count: usize) -> Vec<f64> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..count)
        .map(|_| {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            (z >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

#[test]
fn test_full_precision_floats_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path()).unwrap();

    let saved: Vec<Observation> = full_precision_floats(2000)
        .into_iter()
        .enumerate()
        .map(|(i, confidence)| {
            let data = json!({"host": format!("10.0.{}.{}", i / 250, i % 250), "ratio": confidence});
            Observation::new("scan.xml", ObservationCategory::Port, vec![], confidence, data.as_object().cloned().unwrap())
                .unwrap()
        })
        .collect();
    for obs in &saved {
        store.save_observation(obs).unwrap();
    }

    let loaded = store.load_observations().unwrap();
    assert_eq!(loaded.len(), saved.len());
    for (original, back) in saved.iter().zip(&loaded) {
        assert_eq!(back.confidence.to_bits(), original.confidence.to_bits(), "{}", original.confidence);
        assert_eq!(
            back.data["ratio"].as_f64().unwrap().to_bits(),
            original.confidence.to_bits()
        );
    }
}

#[test]
fn test_import_skips_known_and_repeated_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path()).unwrap();

    let ssh = observation("obs-ssh", ObservationCategory::Service, json!({"service": "ssh"}));
    let rdp = observation("obs-rdp", ObservationCategory::Service, json!({"service": "rdp"}));
    store.save_observation(&ssh).unwrap();

    let written = store
        .import_observations(&[ssh.clone(), rdp.clone(), rdp.clone()])
        .unwrap();
    assert_eq!(written, 1);

    let ids: Vec<String> = store.load_observations().unwrap().into_iter().map(|o| o.id).collect();
    assert_eq!(ids, vec!["obs-ssh", "obs-rdp"]);

    assert_eq!(store.import_observations(&[rdp]).unwrap(), 0);
}

#[test]
fn test_stored_observations_match_schema() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path()).unwrap();
    store
        .save_observation(&observation("obs-1", ObservationCategory::Service, json!({"service": "ssh"})))
        .unwrap();

    let schemas = SchemaValidator::embedded().unwrap();
    let raw = std::fs::read_to_string(dir.path().join("observations.jsonl")).unwrap();
    for line in raw.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        schemas.validate(SchemaKind::Observation, &value).unwrap();
    }
}

#[test]
fn test_unknown_category_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("observations.jsonl"),
        r#"{"id":"x","source_artifact":"s","category":"quantum","tags":[],"confidence":0.5,"data":{}}"#,
    )
    .unwrap();

    let store = JsonlStore::new(dir.path()).unwrap();
    assert!(matches!(store.load_observations(), Err(AssistError::InvalidInput(_))));
}

#[test]
fn test_export_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path().join("store")).unwrap();

    let loader = PlaybookLoader::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("playbooks/library"));
    let playbook = loader.load_playbook("exposed_admin_interfaces").unwrap();
    let draft = loader.create_finding_draft(&playbook, "10.0.0.5:22", vec!["ev-ssh-banner".to_string()]);
    store.save_finding_draft(&draft).unwrap();

    let drafts = store.load_finding_drafts().unwrap();
    assert_eq!(drafts, vec![draft.clone()]);

    let bundle = store.export_bundle("ENG-2026-014").unwrap();
    assert_eq!(bundle.bundle_version, "1.0");
    assert_eq!(bundle.findings, vec![draft]);
    SchemaValidator::embedded()
        .unwrap()
        .validate_entity(SchemaKind::Bundle, &bundle)
        .unwrap();

    assert!(matches!(store.export_bundle("  "), Err(AssistError::InvalidInput(_))));
}

#[test]
fn test_bhd_cli_export_from_stored_drafts() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path()).unwrap();

    let loader = PlaybookLoader::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("playbooks/library"));
    let playbook = loader.load_playbook("modbus_exposure").unwrap();
    let draft = loader.create_finding_draft(
        &playbook,
        "plc-1:502",
        vec!["ev-banner".to_string(), "ev-pcap".to_string()],
    );
    store.save_finding_draft(&draft).unwrap();

    let bundle = store.export_bundle("ENG-2026-014").unwrap();
    let rendered = BhdCliExport::new(&bundle.findings).render().unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["export_metadata"]["format_version"], "1.0");
    assert_eq!(value["export_metadata"]["bhd_cli_compatible"], true);
    assert_eq!(value["export_metadata"]["generated_by"], "bhd-assist");

    let finding = &value["findings"][0];
    assert_eq!(finding["affected_target"], "plc-1:502");
    assert_eq!(finding["evidence"], "ev-banner\nev-pcap");
    assert_eq!(finding["impact_level"], "Critical");
    assert_eq!(finding["_assistant_metadata"]["playbook_id"], "modbus_exposure");
    assert_eq!(finding["_assistant_metadata"]["version"], playbook.version.as_str());
    assert!(finding.get("affected_asset").is_none());

    // Keys are written in sorted order
    assert!(rendered.find("\"export_metadata\"").unwrap() < rendered.find("\"findings\"").unwrap());
    assert!(rendered.find("\"_assistant_metadata\"").unwrap() < rendered.find("\"affected_target\"").unwrap());
}
