//! Buffer sizes for map and reduce tasks.
//!
//! A job runs one task process per input split, often many per machine, so
//! the defaults stay modest. Line buffers start small, grow to the longest
//! line seen and are then reused.

/// Input read buffer (128 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 128 * 1024;

/// Output write buffer (256 KB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 256 * 1024;

/// Read and write buffers in low-memory mode (16 KB each).
pub const LOW_MEMORY_IO_BUFFER: usize = 16 * 1024;

/// Initial capacity of each line buffer.
pub const DEFAULT_LINE_BUFFER: usize = 1024;

/// Initial capacity of key snapshots.
pub const DEFAULT_KEY_BUFFER: usize = 64;

/// I/O buffer sizes for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoBuffers {
    pub input: usize,
    pub output: usize,
}

impl IoBuffers {
    pub const fn new(low_memory: bool) -> Self {
        if low_memory {
            Self {
                input: LOW_MEMORY_IO_BUFFER,
                output: LOW_MEMORY_IO_BUFFER,
            }
        } else {
            Self {
                input: DEFAULT_INPUT_BUFFER,
                output: DEFAULT_OUTPUT_BUFFER,
            }
        }
    }
}
