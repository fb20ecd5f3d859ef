use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use forgesteel_converter::app::{self, ConvertRequest};
use forgesteel_converter::constants::PLACEHOLDER_IMG;
use forgesteel_converter::error::ConverterError;
use forgesteel_converter::sources::{LocalDirectoryProvider, ProviderChain};

fn write_doc(root: &Path, collection: &str, file: &str, doc: Value) -> Result<()> {
    let dir = root.join(collection);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(file), doc.to_string())?;
    Ok(())
}

/// A small pack-source tree with one duplicated ability name.
fn packs(temp: &TempDir) -> Result<PathBuf> {
    let root = temp.path().join("packs");
    write_doc(&root, "ancestries", "memonek.json", json!({
        "_id": "anc001", "_key": "!items!anc001", "name": "Memonek", "type": "ancestry",
        "img": "systems/draw-steel/memonek.webp",
        "system": { "_dsid": "memonek", "description": { "value": "<p>Lawful.</p>" } }
    }))?;
    write_doc(&root, "classes", "elementalist.json", json!({
        "_id": "cls001", "name": "Elementalist", "type": "class",
        "system": { "_dsid": "elementalist", "description": { "value": "<p>Magic.</p>" } }
    }))?;
    write_doc(&root, "abilities", "charge.json", json!([
        { "_id": "abl002", "name": "Charge", "type": "ability",
          "system": { "_dsid": "charge", "category": "heroic" } },
        { "_id": "abl001", "name": "Charge", "type": "ability",
          "system": { "_dsid": "charge", "category": "basic",
                      "description": { "value": "<p>Move and strike.</p>" } } },
        { "_id": "fld001", "_key": "!folders!fld001", "name": "Basic", "type": "Item" }
    ]))?;
    Ok(root)
}

fn hero() -> Value {
    json!({
        "id": "hero-1",
        "name": "Korva",
        "ancestry": { "id": "memonek", "name": "Memonek" },
        "class": {
            "name": "Elementalist",
            "level": 2,
            "characteristics": [
                { "characteristic": "Reason", "value": 2 },
                { "characteristic": "Might", "value": -1 }
            ],
            "featuresByLevel": [
                { "level": 1, "features": [
                    { "name": "Basic Move", "type": "Ability",
                      "data": { "ability": { "name": "Charge" } } }
                ] },
                { "level": 5, "features": [ { "name": "Later Feature", "type": "Text" } ] }
            ]
        },
        "state": {
            "victories": 3,
            "wealth": 2,
            "inventory": [ { "name": "Lightning Treads", "description": "Boots." } ]
        }
    })
}

fn request(temp: &TempDir, strict: bool) -> Result<ConvertRequest> {
    let input = temp.path().join("korva.ds-hero");
    fs::write(&input, hero().to_string())?;
    Ok(ConvertRequest {
        input,
        output: temp.path().join("out").join("korva.json"),
        strict,
    })
}

fn items_named<'a>(actor: &'a Value, name: &str) -> Vec<&'a Value> {
    actor["items"]
        .as_array()
        .map(|items| items.iter().filter(|i| i["name"] == name).collect())
        .unwrap_or_default()
}

#[test]
fn test_convert_hero_against_local_packs() -> Result<()> {
    let temp = tempdir()?;
    let chain = ProviderChain::new().with(Box::new(LocalDirectoryProvider::new(packs(&temp)?)));
    let request = request(&temp, false)?;

    let run = app::run_convert(&chain, &request)?;
    assert_eq!(run.provider, "local");
    assert_eq!(run.indexed_items, 4);
    assert_eq!(run.placeholders, 1);

    let actor: Value = serde_json::from_str(&fs::read_to_string(&request.output)?)?;
    assert_eq!(actor["name"], "Korva");
    assert_eq!(actor["type"], "hero");
    assert_eq!(actor["system"]["characteristics"]["reason"]["value"], 2);
    assert_eq!(actor["system"]["characteristics"]["might"]["value"], -1);
    assert_eq!(actor["system"]["characteristics"]["agility"]["value"], 0);
    assert_eq!(actor["system"]["hero"]["victories"], 3);
    assert_eq!(actor["flags"]["forgesteel-converter"]["level"], 2);

    let memonek = items_named(&actor, "Memonek");
    assert_eq!(memonek.len(), 1);
    assert_eq!(
        memonek[0]["_stats"]["compendiumSource"],
        "Compendium.draw-steel.ancestries.Item.anc001"
    );
    assert!(memonek[0].get("_key").is_none());

    // Basic variant wins over the heroic one listed first
    let charge = items_named(&actor, "Charge");
    assert_eq!(charge.len(), 1);
    assert_eq!(charge[0]["_id"], "abl001");
    assert_eq!(charge[0]["system"]["category"], "basic");

    assert!(items_named(&actor, "Later Feature").is_empty());

    let treads = items_named(&actor, "Lightning Treads");
    assert_eq!(treads.len(), 1);
    assert_eq!(treads[0]["type"], "treasure");
    assert_eq!(treads[0]["img"], PLACEHOLDER_IMG);
    assert_eq!(treads[0]["system"]["description"]["value"], "Boots.");
    assert_eq!(treads[0]["flags"]["forgesteel-converter"]["placeholder"], true);

    let summary = run.reporter.summary();
    assert_eq!(summary.type_exact_hits, 3);
    assert_eq!(summary.duplicates_resolved, 1);
    assert_eq!(summary.misses, 1);
    assert_eq!(run.report.total_items, 4);
    assert_eq!(run.report.mapped_items, 3);
    Ok(())
}

#[test]
fn test_repeated_conversion_is_identical() -> Result<()> {
    let temp = tempdir()?;
    let chain = ProviderChain::new().with(Box::new(LocalDirectoryProvider::new(packs(&temp)?)));
    let request = request(&temp, false)?;

    app::run_convert(&chain, &request)?;
    let first = fs::read_to_string(&request.output)?;
    app::run_convert(&chain, &request)?;
    let second = fs::read_to_string(&request.output)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_strict_mode_aborts_on_first_miss() -> Result<()> {
    let temp = tempdir()?;
    let chain = ProviderChain::new().with(Box::new(LocalDirectoryProvider::new(packs(&temp)?)));
    let request = request(&temp, true)?;

    match app::run_convert(&chain, &request) {
        Err(ConverterError::StrictResolution(e)) => {
            assert_eq!(e.name, "Lightning Treads");
            assert_eq!(e.context, "state.inventory");
        }
        Err(other) => panic!("expected a strict resolution error, got {}", other),
        Ok(_) => panic!("strict conversion should fail on the unknown treasure"),
    }
    assert!(!request.output.exists());
    Ok(())
}

#[test]
fn test_nameless_hero_rejected_before_acquisition() -> Result<()> {
    let temp = tempdir()?;
    let input = temp.path().join("blank.ds-hero");
    fs::write(&input, json!({ "name": "  " }).to_string())?;
    let request = ConvertRequest {
        input,
        output: temp.path().join("blank.json"),
        strict: false,
    };

    let chain = ProviderChain::new().with(Box::new(LocalDirectoryProvider::new(temp.path().join("none"))));
    assert!(matches!(
        app::run_convert(&chain, &request),
        Err(ConverterError::InvalidCharacter(_))
    ));
    Ok(())
}
