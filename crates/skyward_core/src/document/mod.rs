mod slot;
mod snapshot;

pub use slot::SlotDefaults;
pub use snapshot::{ItemState, SlotSnapshot};

use std::any::type_name;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::checksum;
use crate::clock::{self, PlayTime};
use crate::container::{self, FileFormat};
use crate::error::CoreError;
use crate::field::{Encoding, FieldDescriptor, FieldType, FieldValue, Vec3};
use crate::items::{ItemEntry, QuantityBounds, QuantitySpec};
use crate::keys::KeyMaterial;
use crate::layout::{ByteRange, GameSlot, SlotFields};
use crate::persist::write_atomic;
use crate::reader::{BigEndianReader, BigEndianWriter};
use crate::region::{self, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Closed,
    Opening,
    Open,
    Modified,
    Saved,
}

/// Notifications for a presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Checksum, title or save state changed.
    ChecksumChanged,
    /// Field bytes changed.
    DataChanged,
}

/// Outcome of a successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenReport {
    pub region: Region,
    pub format: FileFormat,
    pub checksum_valid: bool,
}

struct Loaded {
    region: Region,
    format: FileFormat,
    buffer: Vec<u8>,
}

type Observer = Box<dyn FnMut(DocumentEvent)>;

pub struct SaveDocument {
    state: DocumentState,
    path: Option<PathBuf>,
    loaded: Option<Loaded>,
    active_slot: Option<GameSlot>,
    keys: Option<KeyMaterial>,
    observers: Vec<Observer>,
}

impl fmt::Debug for SaveDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveDocument")
            .field("state", &self.state)
            .field("path", &self.path)
            .field("region", &self.loaded.as_ref().map(|l| l.region))
            .field("active_slot", &self.active_slot)
            .field("keys", &self.keys)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SaveDocument {
    /// A closed document. `keys` are only consulted for container files.
    pub fn new(keys: Option<KeyMaterial>) -> Self {
        Self {
            state: DocumentState::Closed,
            path: None,
            loaded: None,
            active_slot: None,
            keys,
            observers: Vec::new(),
        }
    }

    /// A new untitled file for `region` with every slot reset.
    pub fn create(region: Region, keys: Option<KeyMaterial>) -> Self {
        let mut buffer = vec![0u8; region.buffer_len()];
        BigEndianWriter::new(&mut buffer).write_bytes(0, &region.signature());

        let mut doc = Self::new(keys);
        doc.loaded = Some(Loaded {
            region,
            format: FileFormat::Plain,
            buffer,
        });
        for slot in GameSlot::ALL {
            doc.reset_slot_bytes(slot);
        }
        doc.loaded_mut().update_checksum();
        doc.active_slot = Some(GameSlot::Game1);
        doc.state = DocumentState::Open;
        debug!("created new {region} save");
        doc
    }

    /// Register a callback for [`DocumentEvent`]s.
    pub fn subscribe(&mut self, observer: impl FnMut(DocumentEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: DocumentEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }

    // --- open / save / reload / close ---

    /// Open `path`, replacing whatever was loaded. On failure the document is
    /// exactly as it was before the call.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<OpenReport, CoreError> {
        let path = path.as_ref();
        let previous = self.state;
        self.state = DocumentState::Opening;
        match self.read_file(path) {
            Ok(loaded) => {
                self.path = Some(path.to_path_buf());
                Ok(self.install(loaded))
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Open an in-memory file. The document stays untitled.
    pub fn open_bytes(
        &mut self,
        bytes: &[u8],
        format: FileFormat,
    ) -> Result<OpenReport, CoreError> {
        let previous = self.state;
        self.state = DocumentState::Opening;
        match self.parse(bytes, format) {
            Ok(loaded) => {
                self.path = None;
                Ok(self.install(loaded))
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Re-read the current path. All-or-nothing: a failed reload keeps the
    /// in-memory buffer and state untouched.
    pub fn reload(&mut self) -> Result<OpenReport, CoreError> {
        self.assert_open("reload");
        let Some(path) = self.path.clone() else {
            return Err(no_path_error("reloading"));
        };
        self.open(path)
    }

    pub fn close(&mut self) {
        if self.state == DocumentState::Closed {
            return;
        }
        self.loaded = None;
        self.path = None;
        self.active_slot = None;
        self.state = DocumentState::Closed;
        self.emit(DocumentEvent::ChecksumChanged);
    }

    fn read_file(&self, path: &Path) -> Result<Loaded, CoreError> {
        let raw = fs::read(path)
            .map_err(|e| CoreError::file(&e, format_args!("reading {}", path.display())))?;
        let format = FileFormat::detect(Some(path), &raw);
        debug!("{} looks like a {format:?} save", path.display());
        self.parse(&raw, format)
    }

    fn parse(&self, raw: &[u8], format: FileFormat) -> Result<Loaded, CoreError> {
        let buffer = match format {
            FileFormat::Plain => raw.to_vec(),
            FileFormat::Container => {
                container::decode(raw, self.keys.as_ref()).map_err(CoreError::decode)?
            }
        };
        let Some(region) = region::classify(&buffer) else {
            return Err(CoreError::format(format!(
                "not a recognised save: {} bytes with signature {:02x?}",
                buffer.len(),
                buffer.get(..4).unwrap_or(&buffer[..])
            )));
        };
        Ok(Loaded {
            region,
            format,
            buffer,
        })
    }

    fn install(&mut self, loaded: Loaded) -> OpenReport {
        let checksum_valid = loaded.checksum_valid();
        let report = OpenReport {
            region: loaded.region,
            format: loaded.format,
            checksum_valid,
        };
        if !checksum_valid {
            warn!(
                "{} save checksum mismatch: stored {:#010x}, computed {:#010x}",
                loaded.region,
                checksum::stored(&loaded.buffer, loaded.region),
                checksum::compute(&loaded.buffer, loaded.region)
            );
        }
        self.loaded = Some(loaded);
        self.active_slot.get_or_insert(GameSlot::Game1);
        self.state = DocumentState::Open;
        self.emit(DocumentEvent::DataChanged);
        self.emit(DocumentEvent::ChecksumChanged);
        report
    }

    /// Write to the current path.
    pub fn save(&mut self) -> Result<(), CoreError> {
        self.assert_open("save");
        let Some(path) = self.path.clone() else {
            return Err(no_path_error("saving"));
        };
        self.save_as(path)
    }

    /// Refresh the checksum and write to `path`, encrypting when the path
    /// names a container. The document adopts `path` only on success.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        self.assert_open("save");
        let path = path.as_ref();
        let format = FileFormat::for_path(path);
        self.update_checksum();

        let loaded = self.loaded_ref();
        let bytes = match format {
            FileFormat::Plain => loaded.buffer.clone(),
            FileFormat::Container => {
                container::encode(&loaded.buffer, loaded.region, self.keys.as_ref())
                    .map_err(CoreError::encode)?
            }
        };
        write_atomic(path, &bytes)
            .map_err(|e| CoreError::file(&e, format_args!("writing {}", path.display())))?;

        info!("saved {} as {format:?} to {}", loaded.region, path.display());
        self.loaded_mut().format = format;
        self.path = Some(path.to_path_buf());
        self.state = DocumentState::Saved;
        self.emit(DocumentEvent::ChecksumChanged);
        Ok(())
    }

    // --- queries ---

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.state == DocumentState::Modified
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> FileFormat {
        self.loaded_ref().format
    }

    pub fn region(&self) -> Region {
        self.loaded_ref().region
    }

    /// Region-specific descriptors for the loaded file.
    pub fn fields(&self) -> &'static SlotFields {
        &self.region().layout().fields
    }

    pub fn active_slot(&self) -> Option<GameSlot> {
        self.active_slot
    }

    /// Select the slot that convenience accessors resolve against. No bytes
    /// move.
    pub fn set_active_slot(&mut self, slot: Option<GameSlot>) {
        if self.active_slot != slot {
            self.active_slot = slot;
            self.emit(DocumentEvent::ChecksumChanged);
        }
    }

    // --- checksum ---

    pub fn checksum(&self) -> u32 {
        let loaded = self.loaded_ref();
        checksum::stored(&loaded.buffer, loaded.region)
    }

    pub fn has_valid_checksum(&self) -> bool {
        self.loaded_ref().checksum_valid()
    }

    /// Recompute and store the checksum. Returns the new value.
    pub fn update_checksum(&mut self) -> u32 {
        self.assert_open("update the checksum of");
        let before = self.checksum();
        let after = self.loaded_mut().update_checksum();
        if before != after {
            self.state = DocumentState::Modified;
            self.emit(DocumentEvent::ChecksumChanged);
        }
        after
    }

    // --- raw buffer ---

    pub fn raw_buffer(&self) -> &[u8] {
        &self.loaded_ref().buffer
    }

    /// Replace the whole buffer, e.g. after a hex-level edit. The bytes must
    /// still classify as the current region; the checksum is left as
    /// supplied.
    pub fn set_raw_buffer(&mut self, bytes: Vec<u8>) -> Result<(), CoreError> {
        let region = self.region();
        if bytes.len() != region.buffer_len() {
            return Err(CoreError::format(format!(
                "{region} saves are {:#x} bytes, got {:#x}",
                region.buffer_len(),
                bytes.len()
            )));
        }
        if region::classify(&bytes) != Some(region) {
            return Err(CoreError::format(format!(
                "replacement buffer is not a {region} save"
            )));
        }
        self.loaded_mut().buffer = bytes;
        self.state = DocumentState::Modified;
        self.emit(DocumentEvent::DataChanged);
        self.emit(DocumentEvent::ChecksumChanged);
        Ok(())
    }

    // --- typed field access ---

    /// Read `field` from `slot`.
    ///
    /// # Panics
    ///
    /// If the document is closed, `T` cannot represent the field's encoding,
    /// or the field does not fit inside a slot.
    pub fn get_field<T: FieldType>(&self, slot: GameSlot, field: &FieldDescriptor) -> T {
        let range = self.resolve::<T>(slot, field);
        T::decode(
            &BigEndianReader::new(&self.loaded_ref().buffer[range.as_range()]),
            field,
        )
    }

    /// Write `field` in `slot` and mark the document modified. Panics under
    /// the same conditions as [`get_field`](Self::get_field).
    pub fn set_field<T: FieldType>(&mut self, slot: GameSlot, field: &FieldDescriptor, value: &T) {
        let range = self.resolve::<T>(slot, field);
        value.encode(
            &mut BigEndianWriter::new(&mut self.loaded_mut().buffer[range.as_range()]),
            field,
        );
        self.mark_modified();
    }

    /// Any field, decoded by its own encoding.
    pub fn field_value(&self, slot: GameSlot, field: &FieldDescriptor) -> FieldValue {
        self.assert_fits(field);
        let range = self.region().layout().slot_range(slot);
        FieldValue::decode(
            &BigEndianReader::new(&self.loaded_ref().buffer[range.as_range()]),
            field,
        )
    }

    fn resolve<T: FieldType>(&self, slot: GameSlot, field: &FieldDescriptor) -> ByteRange {
        assert!(
            T::accepts(field.encoding),
            "field {} is {:?}, cannot be accessed as {}",
            field.name,
            field.encoding,
            type_name::<T>()
        );
        self.assert_fits(field);
        self.region().layout().slot_range(slot)
    }

    fn assert_fits(&self, field: &FieldDescriptor) {
        let stride = self.region().layout().slot_stride;
        assert!(
            field.range().end <= stride,
            "field {} at {:#x}..{:#x} is outside the {:#x}-byte slot",
            field.name,
            field.range().start,
            field.range().end,
            stride
        );
    }

    fn mark_modified(&mut self) {
        self.state = DocumentState::Modified;
        self.emit(DocumentEvent::DataChanged);
    }

    // --- active-slot conveniences ---

    fn require_slot(&self) -> GameSlot {
        match self.active_slot {
            Some(slot) => slot,
            None => panic!("no active slot selected"),
        }
    }

    fn get<T: FieldType>(&self, field: FieldDescriptor) -> T {
        self.get_field(self.require_slot(), &field)
    }

    fn set<T: FieldType>(&mut self, field: FieldDescriptor, value: T) {
        self.set_field(self.require_slot(), &field, &value);
    }

    pub fn player_name(&self) -> String {
        self.get(self.fields().player_name)
    }

    /// Names longer than eight UTF-16 units are truncated.
    pub fn set_player_name(&mut self, name: &str) {
        self.set(self.fields().player_name, name.to_owned());
    }

    pub fn rupees(&self) -> u16 {
        self.get(self.fields().rupees)
    }

    pub fn set_rupees(&mut self, value: u16) {
        self.set(self.fields().rupees, value);
    }

    pub fn current_hp(&self) -> u16 {
        self.get(self.fields().current_hp)
    }

    pub fn set_current_hp(&mut self, value: u16) {
        self.set(self.fields().current_hp, value);
    }

    pub fn total_hp(&self) -> u16 {
        self.get(self.fields().total_hp)
    }

    pub fn set_total_hp(&mut self, value: u16) {
        self.set(self.fields().total_hp, value);
    }

    pub fn hero_mode(&self) -> bool {
        self.get(self.fields().hero_mode)
    }

    pub fn set_hero_mode(&mut self, value: bool) {
        self.set(self.fields().hero_mode, value);
    }

    pub fn night(&self) -> bool {
        self.get(self.fields().night)
    }

    pub fn set_night(&mut self, value: bool) {
        self.set(self.fields().night, value);
    }

    pub fn player_position(&self) -> Vec3 {
        self.get(self.fields().player_position)
    }

    pub fn set_player_position(&mut self, value: Vec3) {
        self.set(self.fields().player_position, value);
    }

    pub fn current_map(&self) -> String {
        self.get(self.fields().current_map)
    }

    pub fn play_time(&self) -> PlayTime {
        PlayTime::from_ticks(self.get(self.fields().play_time))
    }

    pub fn set_play_time(&mut self, value: PlayTime) {
        self.set(self.fields().play_time, value.to_ticks());
    }

    /// `None` when the stored tick count is past the representable range.
    pub fn save_time(&self) -> Option<chrono::NaiveDateTime> {
        clock::save_time_from_ticks(self.get(self.fields().save_time))
    }

    pub fn set_save_time(&mut self, at: chrono::NaiveDateTime) -> Result<(), CoreError> {
        let Some(ticks) = clock::ticks_from_save_time(at) else {
            return Err(CoreError::invalid_value(format!(
                "save time {at} is before 2000-01-01"
            )));
        };
        self.set(self.fields().save_time, ticks);
        Ok(())
    }

    // --- items ---

    /// Whether the active slot owns `item`; `None` for items without an
    /// ownership bit.
    pub fn item_flag(&self, item: &ItemEntry) -> Option<bool> {
        let flag = item.flag?;
        Some(self.get(self.region().layout().adjust(flag)))
    }

    pub fn set_item_flag(&mut self, item: &ItemEntry, owned: bool) -> Result<(), CoreError> {
        let Some(flag) = item.flag else {
            return Err(CoreError::invalid_value(format!(
                "{} has no ownership flag",
                item.name
            )));
        };
        self.set(self.region().layout().adjust(flag), owned);
        Ok(())
    }

    pub fn item_quantity(&self, item: &ItemEntry) -> Option<u16> {
        let spec = item.quantity?;
        Some(self.read_quantity(self.require_slot(), &spec))
    }

    fn read_quantity(&self, slot: GameSlot, spec: &QuantitySpec) -> u16 {
        let field = self.region().layout().adjust(spec.field);
        match field.encoding {
            Encoding::U8 => u16::from(self.get_field::<u8>(slot, &field)),
            _ => self.get_field::<u16>(slot, &field),
        }
    }

    /// Store a count. Values above the canonical maximum are written as
    /// given and reported as [`QuantityBounds::OutOfRange`].
    pub fn set_item_quantity(
        &mut self,
        item: &ItemEntry,
        value: u16,
    ) -> Result<QuantityBounds, CoreError> {
        let Some(spec) = item.quantity else {
            return Err(CoreError::invalid_value(format!(
                "{} has no quantity",
                item.name
            )));
        };
        if value > spec.storable_max() {
            return Err(CoreError::invalid_value(format!(
                "{} holds at most {}, got {value}",
                item.name,
                spec.storable_max()
            )));
        }
        let field = self.region().layout().adjust(spec.field);
        match (field.encoding, u8::try_from(value)) {
            (Encoding::U8, Ok(byte)) => self.set(field, byte),
            _ => self.set(field, value),
        }
        let bounds = spec.bounds(value);
        if !bounds.is_in_range() {
            debug!("{} set to {value}, above canonical {}", item.name, spec.max);
        }
        Ok(bounds)
    }

    // --- presentation helpers ---

    /// `"name* - Game N 0xCHECKSUM"`, with `*` while modified.
    pub fn title(&self) -> String {
        let name = self
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        let dirty = if self.is_modified() { "*" } else { "" };
        match self.active_slot {
            Some(slot) => format!("{name}{dirty} - {slot} {:#010X}", self.checksum()),
            None => format!("{name}{dirty} {:#010X}", self.checksum()),
        }
    }

    // --- internals ---

    fn assert_open(&self, action: &str) {
        assert!(
            self.loaded.is_some(),
            "cannot {action} a closed save document"
        );
    }

    fn loaded_ref(&self) -> &Loaded {
        match &self.loaded {
            Some(loaded) => loaded,
            None => panic!("save document is closed"),
        }
    }

    fn loaded_mut(&mut self) -> &mut Loaded {
        match &mut self.loaded {
            Some(loaded) => loaded,
            None => panic!("save document is closed"),
        }
    }
}

impl Loaded {
    fn checksum_valid(&self) -> bool {
        checksum::verify(&self.buffer, self.region)
    }

    fn update_checksum(&mut self) -> u32 {
        checksum::update(&mut self.buffer, self.region)
    }
}

fn no_path_error(action: &str) -> CoreError {
    let err = io::Error::new(io::ErrorKind::NotFound, "document has no file path");
    CoreError::file(&err, action)
}
