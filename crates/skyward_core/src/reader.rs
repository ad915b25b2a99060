pub struct BigEndianReader<'a> {
    bytes: &'a [u8],
}

impl<'a> BigEndianReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes(self.array(offset))
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_be_bytes(self.array(offset))
    }

    pub fn read_u64(&self, offset: usize) -> u64 {
        u64::from_be_bytes(self.array(offset))
    }

    pub fn read_f32(&self, offset: usize) -> f32 {
        f32::from_be_bytes(self.array(offset))
    }

    pub fn read_f32_array<const N: usize>(&self, offset: usize) -> [f32; N] {
        let mut result = [0f32; N];
        for (i, item) in result.iter_mut().enumerate() {
            *item = self.read_f32(offset + i * 4);
        }
        result
    }

    /// Read a NUL-padded ASCII string of at most `n` bytes.
    pub fn read_fixed_string(&self, offset: usize, n: usize) -> String {
        let bytes = self.read_bytes(offset, n);
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    /// Read a NUL-terminated UTF-16BE string of at most `units` code units.
    pub fn read_utf16_string(&self, offset: usize, units: usize) -> String {
        let mut code_units = Vec::with_capacity(units);
        for i in 0..units {
            let unit = self.read_u16(offset + i * 2);
            if unit == 0 {
                break;
            }
            code_units.push(unit);
        }
        String::from_utf16_lossy(&code_units)
    }

    pub fn read_bytes(&self, offset: usize, n: usize) -> &'a [u8] {
        &self.bytes[offset..offset + n]
    }

    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[offset..offset + N]);
        buf
    }
}

pub struct BigEndianWriter<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BigEndianWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Current value of a byte, for read-modify-write of bit fields.
    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.write_bytes(offset, &value.to_be_bytes());
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.write_bytes(offset, &value.to_be_bytes());
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.write_bytes(offset, &value.to_be_bytes());
    }

    pub fn write_f32(&mut self, offset: usize, value: f32) {
        self.write_bytes(offset, &value.to_be_bytes());
    }

    pub fn write_f32_array<const N: usize>(&mut self, offset: usize, values: [f32; N]) {
        for (i, value) in values.iter().enumerate() {
            self.write_f32(offset + i * 4, *value);
        }
    }

    /// Write `value` into an `n`-byte field, NUL-padding. Characters that
    /// would not fit whole are dropped.
    pub fn write_fixed_string(&mut self, offset: usize, n: usize, value: &str) {
        let field = &mut self.bytes[offset..offset + n];
        field.fill(0);
        let len = value
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&end| end <= n)
            .last()
            .unwrap_or(0);
        field[..len].copy_from_slice(&value.as_bytes()[..len]);
    }

    /// Write `value` as UTF-16BE into a `units`-wide field, zero-padding.
    /// A surrogate pair is never split at the limit.
    pub fn write_utf16_string(&mut self, offset: usize, units: usize, value: &str) {
        self.bytes[offset..offset + units * 2].fill(0);
        let mut written = 0;
        let mut buf = [0u16; 2];
        for c in value.chars() {
            let encoded = c.encode_utf16(&mut buf);
            if written + encoded.len() > units {
                break;
            }
            for unit in encoded.iter() {
                self.write_u16(offset + written * 2, *unit);
                written += 1;
            }
        }
    }

    pub fn write_bytes(&mut self, offset: usize, src: &[u8]) {
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
    }

    pub fn fill(&mut self, offset: usize, n: usize, value: u8) {
        self.bytes[offset..offset + n].fill(value);
    }
}
