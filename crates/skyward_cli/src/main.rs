use std::fs;
use std::path::PathBuf;
use std::process;

use chrono::NaiveDateTime;
use clap::Parser;
use log::{LevelFilter, Metadata, Record};
use serde_json::{Map as JsonMap, Value as JsonValue};
use skyward_core::items::{self, ItemEntry};
use skyward_core::{
    EditorConfig, FieldDescriptor, GameSlot, ItemState, KeyStore, QuantityBounds, Region,
    SaveDocument, SlotDefaults,
};

const SAVE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE", required_unless_present = "new")]
    path: Option<PathBuf>,
    /// Start from an empty save for REGION instead of opening a file.
    #[arg(
        long,
        value_name = "ntsc-u|ntsc-j|pal",
        value_parser = parse_region,
        conflicts_with = "path"
    )]
    new: Option<Region>,
    #[arg(long, value_name = "1|2|3", value_parser = parse_slot, default_value = "1")]
    slot: GameSlot,
    #[arg(long)]
    name: bool,
    #[arg(long)]
    rupees: bool,
    #[arg(long)]
    hp: bool,
    #[arg(long = "max-hp")]
    max_hp: bool,
    #[arg(long = "play-time")]
    play_time: bool,
    #[arg(long = "save-time")]
    save_time: bool,
    #[arg(long)]
    map: bool,
    #[arg(long)]
    area: bool,
    #[arg(long)]
    room: bool,
    #[arg(long)]
    position: bool,
    #[arg(long = "hero-mode")]
    hero_mode: bool,
    #[arg(long)]
    night: bool,
    #[arg(long = "is-new")]
    is_new: bool,
    #[arg(long)]
    region: bool,
    #[arg(long)]
    checksum: bool,
    #[arg(long)]
    items: bool,
    /// Any slot field by its layout name, e.g. `room_id`.
    #[arg(long = "field", value_name = "NAME")]
    field: Vec<String>,
    #[arg(long)]
    json: bool,
    #[arg(long = "set-name")]
    set_name: Option<String>,
    #[arg(long = "set-rupees")]
    set_rupees: Option<u16>,
    #[arg(long = "set-hp")]
    set_hp: Option<u16>,
    #[arg(long = "set-hearts")]
    set_hearts: Option<u8>,
    #[arg(long = "set-save-time", value_name = "YYYY-MM-DD HH:MM:SS", value_parser = parse_save_time)]
    set_save_time: Option<NaiveDateTime>,
    #[arg(long = "set-flag", value_name = "ITEM=on|off")]
    set_flag: Vec<String>,
    #[arg(long = "set-quantity", value_name = "ITEM=N")]
    set_quantity: Vec<String>,
    #[arg(long = "create-slot", conflicts_with = "delete_slot")]
    create_slot: bool,
    #[arg(long = "delete-slot")]
    delete_slot: bool,
    /// Replace the slot with a quest written by --export-slot.
    #[arg(
        long = "import-slot",
        value_name = "QUEST",
        conflicts_with_all = ["create_slot", "delete_slot"]
    )]
    import_slot: Option<PathBuf>,
    /// Write the slot's raw bytes to QUEST.
    #[arg(long = "export-slot", value_name = "QUEST")]
    export_slot: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Raw 48-byte key file for SD container saves.
    #[arg(long, value_name = "KEYS.BIN")]
    keys: Option<PathBuf>,
    #[arg(long = "key-cache", value_name = "PATH")]
    key_cache: Option<PathBuf>,
    #[arg(long = "save-keys")]
    save_keys: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default, Clone)]
struct FieldSelection {
    raw: Vec<String>,
    name: bool,
    rupees: bool,
    hp: bool,
    max_hp: bool,
    play_time: bool,
    save_time: bool,
    map: bool,
    area: bool,
    room: bool,
    position: bool,
    hero_mode: bool,
    night: bool,
    is_new: bool,
    region: bool,
    checksum: bool,
    items: bool,
}

impl FieldSelection {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            raw: cli.field.clone(),
            name: cli.name,
            rupees: cli.rupees,
            hp: cli.hp,
            max_hp: cli.max_hp,
            play_time: cli.play_time,
            save_time: cli.save_time,
            map: cli.map,
            area: cli.area,
            room: cli.room,
            position: cli.position,
            hero_mode: cli.hero_mode,
            night: cli.night,
            is_new: cli.is_new,
            region: cli.region,
            checksum: cli.checksum,
            items: cli.items,
        }
    }

    fn is_field_mode(&self) -> bool {
        !self.raw.is_empty()
            || self.name
            || self.rupees
            || self.hp
            || self.max_hp
            || self.play_time
            || self.save_time
            || self.map
            || self.area
            || self.room
            || self.position
            || self.hero_mode
            || self.night
            || self.is_new
            || self.region
            || self.checksum
            || self.items
    }

    fn selected_pairs(&self, doc: &SaveDocument, slot: GameSlot) -> Vec<(&'static str, String)> {
        let snapshot = doc.snapshot(slot);
        let mut out = Vec::new();

        if self.region {
            out.push(("region", doc.region().to_string()));
        }
        if self.checksum {
            out.push(("checksum", format!("{:#010X}", doc.checksum())));
            out.push(("checksum_valid", doc.has_valid_checksum().to_string()));
        }
        if self.name {
            out.push(("name", snapshot.player_name.clone()));
        }
        if self.rupees {
            out.push(("rupees", snapshot.rupees.to_string()));
        }
        if self.hp {
            out.push(("hp", snapshot.current_hp.to_string()));
        }
        if self.max_hp {
            out.push(("max_hp", snapshot.total_hp.to_string()));
        }
        if self.play_time {
            out.push(("play_time", snapshot.play_time.to_string()));
        }
        if self.save_time {
            out.push(("save_time", format_save_time(snapshot.save_time)));
        }
        if self.map {
            out.push(("map", snapshot.current_map.clone()));
        }
        if self.area {
            out.push(("area", snapshot.current_area.clone()));
        }
        if self.room {
            out.push(("room", snapshot.current_room.clone()));
        }
        if self.position {
            out.push(("position", snapshot.player_position.to_string()));
        }
        if self.hero_mode {
            out.push(("hero_mode", snapshot.hero_mode.to_string()));
        }
        if self.night {
            out.push(("night", snapshot.night.to_string()));
        }
        if self.is_new {
            out.push(("is_new", snapshot.is_new.to_string()));
        }
        if self.items {
            for item in &snapshot.items {
                if let Some(line) = format_item(item) {
                    out.push(("item", line));
                }
            }
        }
        for field in raw_fields(doc, &self.raw) {
            out.push((field.name, doc.field_value(slot, &field).to_string()));
        }

        out
    }

    fn selected_json(&self, doc: &SaveDocument, slot: GameSlot) -> JsonMap<String, JsonValue> {
        let snapshot = doc.snapshot(slot);
        let mut out = JsonMap::new();

        if self.region {
            out.insert(
                "region".to_string(),
                JsonValue::String(doc.region().to_string()),
            );
        }
        if self.checksum {
            out.insert("checksum".to_string(), JsonValue::from(doc.checksum()));
            out.insert(
                "checksum_valid".to_string(),
                JsonValue::Bool(doc.has_valid_checksum()),
            );
        }
        if self.name {
            out.insert(
                "name".to_string(),
                JsonValue::String(snapshot.player_name.clone()),
            );
        }
        if self.rupees {
            out.insert("rupees".to_string(), JsonValue::from(snapshot.rupees));
        }
        if self.hp {
            out.insert("hp".to_string(), JsonValue::from(snapshot.current_hp));
        }
        if self.max_hp {
            out.insert("max_hp".to_string(), JsonValue::from(snapshot.total_hp));
        }
        if self.play_time {
            out.insert(
                "play_time".to_string(),
                JsonValue::String(snapshot.play_time.to_string()),
            );
        }
        if self.save_time {
            out.insert(
                "save_time".to_string(),
                JsonValue::String(format_save_time(snapshot.save_time)),
            );
        }
        if self.map {
            out.insert(
                "map".to_string(),
                JsonValue::String(snapshot.current_map.clone()),
            );
        }
        if self.area {
            out.insert(
                "area".to_string(),
                JsonValue::String(snapshot.current_area.clone()),
            );
        }
        if self.room {
            out.insert(
                "room".to_string(),
                JsonValue::String(snapshot.current_room.clone()),
            );
        }
        if self.position {
            out.insert(
                "position".to_string(),
                serde_json::to_value(snapshot.player_position).unwrap_or(JsonValue::Null),
            );
        }
        if self.hero_mode {
            out.insert("hero_mode".to_string(), JsonValue::Bool(snapshot.hero_mode));
        }
        if self.night {
            out.insert("night".to_string(), JsonValue::Bool(snapshot.night));
        }
        if self.is_new {
            out.insert("is_new".to_string(), JsonValue::Bool(snapshot.is_new));
        }
        if self.items {
            out.insert(
                "items".to_string(),
                serde_json::to_value(&snapshot.items).unwrap_or(JsonValue::Null),
            );
        }
        for field in raw_fields(doc, &self.raw) {
            out.insert(
                field.name.to_string(),
                serde_json::to_value(doc.field_value(slot, &field)).unwrap_or(JsonValue::Null),
            );
        }

        out
    }
}

fn raw_fields(doc: &SaveDocument, names: &[String]) -> Vec<FieldDescriptor> {
    names
        .iter()
        .filter_map(|name| doc.fields().by_name(name))
        .collect()
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        });
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let fields = FieldSelection::from_cli(&cli);

    let flag_edits = cli
        .set_flag
        .iter()
        .map(|spec| parse_flag_edit(spec))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(2);
        });
    let quantity_edits = cli
        .set_quantity
        .iter()
        .map(|spec| parse_quantity_edit(spec))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(2);
        });

    let has_edits = cli.new.is_some()
        || cli.set_name.is_some()
        || cli.set_rupees.is_some()
        || cli.set_hp.is_some()
        || cli.set_hearts.is_some()
        || cli.set_save_time.is_some()
        || cli.import_slot.is_some()
        || !flag_edits.is_empty()
        || !quantity_edits.is_empty()
        || cli.create_slot
        || cli.delete_slot;

    if has_edits && cli.output.is_none() {
        eprintln!("edit flags require --output <PATH>");
        process::exit(2);
    }
    if !has_edits && cli.output.is_some() {
        eprintln!("--output requires at least one edit flag");
        process::exit(2);
    }

    let mut config = EditorConfig::default();
    if let Some(region) = cli.new {
        config.default_region = region;
    }
    if let Some(key_file) = &cli.keys {
        config.keys.key_file = key_file.clone();
    }
    if let Some(cache) = &cli.key_cache {
        config.keys.cache_path = Some(cache.clone());
    }
    let mut key_store = config.key_store();
    key_store.load();
    if cli.save_keys {
        save_keys(&key_store);
    }

    let mut doc = match &cli.path {
        Some(path) => {
            let mut doc = SaveDocument::new(key_store.material().cloned());
            doc.open(path).unwrap_or_else(|e| {
                eprintln!("Error opening save file: {}", path.display());
                eprintln!("  {e}");
                process::exit(1);
            });
            doc
        }
        None => config.new_document(key_store.material().cloned()),
    };
    let slot = cli.slot;
    doc.set_active_slot(Some(slot));

    if let Some(unknown) = cli.field.iter().find(|name| doc.fields().by_name(name).is_none()) {
        eprintln!("unknown field {unknown:?}");
        process::exit(2);
    }

    if let Some(quest_path) = &cli.import_slot {
        let quest = fs::read(quest_path).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {e}", quest_path.display());
            process::exit(1);
        });
        doc.import_slot(slot, &quest).unwrap_or_else(|e| {
            eprintln!("Error importing {}: {e}", quest_path.display());
            process::exit(1);
        });
    }

    if cli.delete_slot {
        doc.delete_slot(slot);
    }
    if cli.create_slot {
        doc.create_slot(
            slot,
            &SlotDefaults {
                player_name: cli.set_name.clone(),
                rupees: cli.set_rupees,
                current_hp: cli.set_hp,
                heart_containers: cli.set_hearts,
            },
        );
    } else {
        if let Some(name) = &cli.set_name {
            doc.set_player_name(name);
        }
        if let Some(rupees) = cli.set_rupees {
            doc.set_rupees(rupees);
        }
        if let Some(hearts) = cli.set_hearts {
            doc.set_total_hp(u16::from(hearts) * 4);
        }
        if let Some(hp) = cli.set_hp {
            doc.set_current_hp(hp);
        }
    }
    if let Some(at) = cli.set_save_time {
        doc.set_save_time(at).unwrap_or_else(|e| {
            eprintln!("Error setting save time: {e}");
            process::exit(1);
        });
    }
    for (item, owned) in &flag_edits {
        doc.set_item_flag(item, *owned).unwrap_or_else(|e| {
            eprintln!("Error applying flag edit: {e}");
            process::exit(1);
        });
    }
    for (item, count) in &quantity_edits {
        match doc.set_item_quantity(item, *count) {
            Ok(QuantityBounds::InRange) => {}
            Ok(QuantityBounds::OutOfRange { max }) => {
                eprintln!(
                    "Warning: {} set to {count}, above the usual maximum of {max}",
                    item.name
                );
            }
            Err(e) => {
                eprintln!("Error applying quantity edit: {e}");
                process::exit(1);
            }
        }
    }

    if let Some(out_path) = &cli.output {
        doc.save_as(out_path).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
    }
    if let Some(quest_path) = &cli.export_slot {
        fs::write(quest_path, doc.export_slot(slot)).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", quest_path.display());
            process::exit(1);
        });
        if !fields.is_field_mode() && !cli.json && cli.output.is_none() {
            println!("Exported {slot} to {}", quest_path.display());
            return;
        }
    }

    if cli.json {
        let json = if fields.is_field_mode() {
            JsonValue::Object(fields.selected_json(&doc, slot))
        } else {
            JsonValue::Object(default_json(&doc, slot))
        };
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    if fields.is_field_mode() {
        for (key, value) in fields.selected_pairs(&doc, slot) {
            println!("{key}={value}");
        }
        return;
    }

    if let Some(out_path) = &cli.output {
        println!("Wrote edited save to {}", out_path.display());
        return;
    }

    print_dump(&doc, slot);
}

fn save_keys(store: &KeyStore) {
    match store.save() {
        Ok(true) => {}
        Ok(false) if !store.is_available() => {
            eprintln!("Warning: --save-keys given but no keys were loaded");
        }
        Ok(false) => {
            eprintln!("Warning: --save-keys needs --key-cache or SKYWARD_SE_KEY_CACHE");
        }
        Err(e) => {
            eprintln!("Error saving key cache: {e}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn parse_region(value: &str) -> Result<Region, String> {
    value.parse()
}

fn parse_slot(value: &str) -> Result<GameSlot, String> {
    value
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(GameSlot::from_index)
        .ok_or_else(|| format!("invalid slot {value:?}, expected 1, 2 or 3"))
}

fn parse_save_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, SAVE_TIME_FORMAT)
        .map_err(|e| format!("invalid save time {value:?}: {e}"))
}

fn lookup_item(name: &str) -> Result<&'static ItemEntry, String> {
    items::find(name).ok_or_else(|| format!("unknown item {name:?}"))
}

fn parse_flag_edit(spec: &str) -> Result<(&'static ItemEntry, bool), String> {
    let Some((name, state)) = spec.split_once('=') else {
        return Err(format!("--set-flag expects ITEM=on|off, got {spec:?}"));
    };
    let owned = match state.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => true,
        "off" | "false" | "0" | "no" => false,
        other => return Err(format!("invalid flag state {other:?}, expected on or off")),
    };
    Ok((lookup_item(name)?, owned))
}

fn parse_quantity_edit(spec: &str) -> Result<(&'static ItemEntry, u16), String> {
    let Some((name, count)) = spec.split_once('=') else {
        return Err(format!("--set-quantity expects ITEM=N, got {spec:?}"));
    };
    let count = count
        .parse::<u16>()
        .map_err(|e| format!("invalid quantity {count:?}: {e}"))?;
    Ok((lookup_item(name)?, count))
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

fn default_json(doc: &SaveDocument, slot: GameSlot) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "region".to_string(),
        JsonValue::String(doc.region().to_string()),
    );
    out.insert(
        "format".to_string(),
        JsonValue::String(format!("{:?}", doc.format())),
    );
    out.insert("checksum".to_string(), JsonValue::from(doc.checksum()));
    out.insert(
        "checksum_valid".to_string(),
        JsonValue::Bool(doc.has_valid_checksum()),
    );
    out.insert(
        "slot".to_string(),
        serde_json::to_value(doc.snapshot(slot)).unwrap_or(JsonValue::Null),
    );
    out
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn format_save_time(value: Option<impl std::fmt::Display>) -> String {
    match value {
        Some(at) => at.to_string(),
        None => "unknown".to_string(),
    }
}

fn format_item(item: &ItemState) -> Option<String> {
    match (item.owned, item.quantity) {
        (Some(false), Some(0)) | (Some(false), None) => None,
        (None, Some(0)) => None,
        (_, Some(count)) => Some(format!("{}={count}", item.name)),
        (_, None) => Some(item.name.to_string()),
    }
}

fn print_dump(doc: &SaveDocument, slot: GameSlot) {
    let snapshot = doc.snapshot(slot);
    let checksum_note = if doc.has_valid_checksum() {
        "valid"
    } else {
        "MISMATCH"
    };

    println!("Region:     {}", doc.region());
    println!("Checksum:   {:#010X} ({checksum_note})", doc.checksum());
    println!("Slot:       {slot}{}", if snapshot.is_new { " (new)" } else { "" });
    println!();
    println!("Name:       {}", snapshot.player_name);
    println!("Play time:  {}", snapshot.play_time);
    println!("Saved:      {}", format_save_time(snapshot.save_time));
    println!("Rupees:     {}", snapshot.rupees);
    println!(
        "Health:     {}/{} ({} hearts)",
        snapshot.current_hp,
        snapshot.total_hp,
        snapshot.total_hp / 4
    );
    println!("Hero mode:  {}", snapshot.hero_mode);
    println!(
        "Location:   {} / {} / {}{}",
        snapshot.current_map,
        snapshot.current_area,
        snapshot.current_room,
        if snapshot.night { " (night)" } else { "" }
    );
    println!("Position:   {}", snapshot.player_position);

    let owned: Vec<String> = snapshot.items.iter().filter_map(format_item).collect();
    if !owned.is_empty() {
        println!();
        println!("Items:");
        for line in owned {
            println!("  {line}");
        }
    }
}
