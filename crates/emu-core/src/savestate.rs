//! Symmetric savestate cursor.
//!
//! Components describe their state once, in one function, and the same
//! function is used to save, load and measure. The cursor decides which way
//! the bytes flow.

/// Direction of a savestate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateMode {
    /// Append values to the buffer.
    Write,
    /// Consume values from the buffer into the fields.
    Read,
    /// Count bytes without touching anything.
    Measure,
}

/// Cursor over a savestate buffer.
///
/// Reading past the end or hitting a mismatched marker puts the cursor into
/// a failed state. Every later call is a no-op, so components don't have to
/// check after each field; the caller checks once at the end.
#[derive(Debug)]
pub struct StateCursor {
    mode: StateMode,
    buffer: Vec<u8>,
    position: usize,
    error: Option<&'static str>,
}

impl StateCursor {
    /// A cursor that saves into a fresh buffer.
    #[must_use]
    pub fn writer() -> Self {
        Self {
            mode: StateMode::Write,
            buffer: Vec::new(),
            position: 0,
            error: None,
        }
    }

    /// A cursor that loads from `data`.
    #[must_use]
    pub fn reader(data: Vec<u8>) -> Self {
        Self {
            mode: StateMode::Read,
            buffer: data,
            position: 0,
            error: None,
        }
    }

    /// A cursor that only counts bytes.
    #[must_use]
    pub fn measurer() -> Self {
        Self {
            mode: StateMode::Measure,
            buffer: Vec::new(),
            position: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.mode == StateMode::Read
    }

    /// Bytes written, read or measured so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Mark the pass as failed. The first reason wins.
    pub fn fail(&mut self, reason: &'static str) {
        if self.error.is_none() {
            self.error = Some(reason);
        }
    }

    /// Finish the pass, returning the buffer: the saved bytes after a
    /// write, the consumed input after a read, nothing after a measure.
    pub fn into_result(self) -> Result<Vec<u8>, &'static str> {
        match self.error {
            Some(reason) => Err(reason),
            None => Ok(self.buffer),
        }
    }

    pub fn do_bytes(&mut self, bytes: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        match self.mode {
            StateMode::Write => self.buffer.extend_from_slice(bytes),
            StateMode::Read => {
                let end = self.position + bytes.len();
                if end > self.buffer.len() {
                    self.fail("savestate truncated");
                    return;
                }
                bytes.copy_from_slice(&self.buffer[self.position..end]);
            }
            StateMode::Measure => {}
        }
        self.position += bytes.len();
    }

    pub fn do_u8(&mut self, value: &mut u8) {
        let mut bytes = [*value];
        self.do_bytes(&mut bytes);
        *value = bytes[0];
    }

    pub fn do_bool(&mut self, value: &mut bool) {
        let mut byte = u8::from(*value);
        self.do_u8(&mut byte);
        *value = byte != 0;
    }

    pub fn do_u16(&mut self, value: &mut u16) {
        let mut bytes = value.to_le_bytes();
        self.do_bytes(&mut bytes);
        *value = u16::from_le_bytes(bytes);
    }

    pub fn do_u32(&mut self, value: &mut u32) {
        let mut bytes = value.to_le_bytes();
        self.do_bytes(&mut bytes);
        *value = u32::from_le_bytes(bytes);
    }

    pub fn do_u64(&mut self, value: &mut u64) {
        let mut bytes = value.to_le_bytes();
        self.do_bytes(&mut bytes);
        *value = u64::from_le_bytes(bytes);
    }

    /// Write or check a section marker. A mismatch on load fails the pass.
    pub fn do_marker(&mut self, name: &'static str) {
        let mut tag = [0u8; 8];
        for (dst, src) in tag.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        let expected = tag;
        self.do_bytes(&mut tag);
        if self.is_reading() && self.is_ok() && tag != expected {
            self.fail("savestate marker mismatch");
        }
    }
}
