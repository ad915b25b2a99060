use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use skyward_core::keys::KEY_CACHE_ENV;
use skyward_core::{GameSlot, KeyMaterial, Region, SaveDocument, SlotDefaults};

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skyward-se"))
        .current_dir(dir)
        .env_remove(KEY_CACHE_ENV)
        .args(args)
        .output()
        .expect("failed to run skyward-se CLI")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn write_fixture(dir: &Path, region: Region) -> PathBuf {
    let mut doc = SaveDocument::create(region, None);
    doc.create_slot(
        GameSlot::Game1,
        &SlotDefaults {
            player_name: Some("Link".to_string()),
            rupees: Some(42),
            current_hp: Some(24),
            heart_containers: Some(6),
        },
    );
    doc.set_new(GameSlot::Game1, false);
    let path = dir.join("wiiking2.sav");
    doc.save_as(&path).expect("write fixture");
    path
}

fn write_keys(dir: &Path) -> PathBuf {
    let mut bytes = [0u8; 48];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = 0xA0 ^ i as u8;
    }
    assert!(KeyMaterial::from_bytes(&bytes).is_some());
    let path = dir.join("sd-keys.bin");
    fs::write(&path, bytes).expect("write keys");
    path
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn cli_prints_requested_fields_in_fixed_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let output = run_cli(dir.path(), &["--rupees", "--name", "--region", &save]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["region=NTSC-U", "name=Link", "rupees=42"]
    );
}

#[test]
fn cli_reports_checksum_validity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::Pal));
    let output = run_cli(dir.path(), &["--checksum", &save]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert!(lines[0].starts_with("checksum=0x"));
    assert_eq!(lines[1], "checksum_valid=true");
}

#[test]
fn cli_edits_selected_slot_and_writes_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscJ));
    let out = arg(&dir.path().join("edited.sav"));

    let output = run_cli(
        dir.path(),
        &[
            "--slot", "2", "--set-name", "Zelda", "--set-rupees", "123", "--output", &out, &save,
        ],
    );
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Wrote edited save"));

    let output = run_cli(
        dir.path(),
        &["--slot", "2", "--name", "--rupees", "--checksum", &out],
    );
    assert_eq!(
        stdout_lines(&output)[1..],
        ["checksum_valid=true", "name=Zelda", "rupees=123"]
    );

    let output = run_cli(dir.path(), &["--name", &out]);
    assert_eq!(stdout_lines(&output), vec!["name=Link"]);
}

#[test]
fn cli_rejects_edits_without_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let output = run_cli(dir.path(), &["--set-rupees", "5", &save]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_rejects_unknown_item() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let out = arg(&dir.path().join("edited.sav"));
    let output = run_cli(
        dir.path(),
        &["--set-flag", "hylian_shield=on", "--output", &out, &save],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown item"));
}

#[test]
fn cli_warns_on_out_of_range_quantity_but_writes_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let out = arg(&dir.path().join("edited.sav"));
    let output = run_cli(
        dir.path(),
        &[
            "--set-quantity",
            "bombs=50",
            "--set-flag",
            "master_sword=on",
            "--output",
            &out,
            &save,
        ],
    );
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("usual maximum of 10"));

    let output = run_cli(dir.path(), &["--items", &out]);
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"item=Master Sword".to_string()));
    assert!(lines.contains(&"item=Bombs=50".to_string()));
}

#[test]
fn cli_creates_new_file_for_region() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = arg(&dir.path().join("fresh.sav"));
    let output = run_cli(dir.path(), &["--new", "pal", "--output", &out]);
    assert!(output.status.success(), "{output:?}");

    let output = run_cli(dir.path(), &["--region", "--is-new", "--slot", "3", &out]);
    assert_eq!(stdout_lines(&output), vec!["region=PAL", "is_new=true"]);
}

#[test]
fn cli_json_includes_region_and_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let output = run_cli(dir.path(), &["--json", &save]);
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["region"], "NTSC-U");
    assert_eq!(json["checksum_valid"], true);
    assert_eq!(json["slot"]["player_name"], "Link");
    assert_eq!(json["slot"]["rupees"], 42);
}

#[test]
fn cli_container_output_needs_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let out = dir.path().join("data.bin");
    let output = run_cli(
        dir.path(),
        &["--set-rupees", "7", "--output", &arg(&out), &save],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("MissingKey"));
    assert!(!out.exists());
}

#[test]
fn cli_round_trips_container_with_key_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::Pal));
    let keys = arg(&write_keys(dir.path()));
    let out = arg(&dir.path().join("data.bin"));

    let output = run_cli(
        dir.path(),
        &["--keys", &keys, "--set-rupees", "999", "--output", &out, &save],
    );
    assert!(output.status.success(), "{output:?}");

    let output = run_cli(dir.path(), &["--rupees", &out]);
    assert_eq!(output.status.code(), Some(1));

    let output = run_cli(dir.path(), &["--keys", &keys, "--rupees", "--region", &out]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_lines(&output), vec!["region=PAL", "rupees=999"]);
}

#[test]
fn cli_saves_loaded_keys_to_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let keys = arg(&write_keys(dir.path()));
    let cache = dir.path().join("cache.json");

    let output = run_cli(
        dir.path(),
        &["--keys", &keys, "--key-cache", &arg(&cache), "--save-keys", "--region", &save],
    );
    assert!(output.status.success(), "{output:?}");
    let cached: Value =
        serde_json::from_str(&fs::read_to_string(&cache).expect("cache written")).expect("json");
    assert!(cached["sd_key"].as_str().is_some_and(|hex| hex.len() == 32));
}

#[test]
fn cli_exports_and_imports_a_single_quest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscU));
    let quest = dir.path().join("quest1.dat");

    let output = run_cli(dir.path(), &["--export-slot", &arg(&quest), &save]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        fs::read(&quest).expect("read quest").len(),
        Region::NtscU.layout().slot_stride
    );

    let out = arg(&dir.path().join("imported.sav"));
    let output = run_cli(
        dir.path(),
        &["--slot", "3", "--import-slot", &arg(&quest), "--output", &out, &save],
    );
    assert!(output.status.success(), "{output:?}");

    let output = run_cli(dir.path(), &["--slot", "3", "--name", "--rupees", "--checksum", &out]);
    assert_eq!(
        stdout_lines(&output)[1..],
        ["checksum_valid=true", "name=Link", "rupees=42"]
    );
    let output = run_cli(dir.path(), &["--slot", "2", "--is-new", &out]);
    assert_eq!(stdout_lines(&output), vec!["is_new=true"]);
}

#[test]
fn cli_rejects_quest_from_another_region() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pal = arg(&write_fixture(dir.path(), Region::Pal));
    let quest = arg(&dir.path().join("pal-quest.dat"));
    assert!(run_cli(dir.path(), &["--export-slot", &quest, &pal]).status.success());

    let ntsc_dir = tempfile::tempdir().expect("tempdir");
    let ntsc = arg(&write_fixture(ntsc_dir.path(), Region::NtscU));
    let out = arg(&ntsc_dir.path().join("out.sav"));
    let output = run_cli(
        ntsc_dir.path(),
        &["--import-slot", &quest, "--output", &out, &ntsc],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!Path::new(&out).exists());
}

#[test]
fn cli_prints_raw_fields_by_layout_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::NtscJ));
    let output = run_cli(
        dir.path(),
        &["--field", "total_hp", "--field", "new_game", &save],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_lines(&output), vec!["total_hp=24", "new_game=0"]);

    let output = run_cli(dir.path(), &["--json", "--field", "player_name", &save]);
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["player_name"], "Link");

    let output = run_cli(dir.path(), &["--field", "bogus", &save]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_sets_save_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = arg(&write_fixture(dir.path(), Region::Pal));
    let out = arg(&dir.path().join("dated.sav"));
    let output = run_cli(
        dir.path(),
        &["--set-save-time", "2012-03-04 05:06:07", "--output", &out, &save],
    );
    assert!(output.status.success(), "{output:?}");

    let output = run_cli(dir.path(), &["--save-time", &out]);
    assert_eq!(stdout_lines(&output), vec!["save_time=2012-03-04 05:06:07"]);

    let output = run_cli(
        dir.path(),
        &["--set-save-time", "yesterday", "--output", &out, &save],
    );
    assert_eq!(output.status.code(), Some(2));
}
