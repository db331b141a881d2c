//! Shared fixtures for the benchmarks.

/// A named wire sample loaded from `resources/`.
#[derive(Debug, Copy, Clone)]
pub struct Fixture {
    name: &'static str,
    file_name: &'static str,
    bytes: &'static [u8],
}

impl Fixture {
    pub const fn new(name: &'static str, file_name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, file_name, bytes }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    /// Size in bytes, for throughput reporting.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
