//! Splits a raw serial byte stream into individual commands.

use tracing::debug;

/// Longest command accepted; anything longer is discarded up to the next terminator.
pub const MAX_COMMAND_LEN: usize = 64;

/// Accumulates bytes across reads and yields each complete command.
///
/// Commands end at `!`, `\r` or `\n`. The terminator is not part of the yielded
/// command, and blank fragments (for example the `\n` of a `\r\n` pair) are skipped.
#[derive(Debug, Default)]
pub struct CommandFramer {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl CommandFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of received bytes and returns the commands it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut commands = Vec::new();

        for &byte in bytes {
            match byte {
                b'!' | b'\r' | b'\n' => {
                    if self.overflowed {
                        debug!(len = self.buffer.len(), "dropping over-long command");
                        self.overflowed = false;
                    } else {
                        let command = String::from_utf8_lossy(&self.buffer);
                        let command = command.trim();
                        if !command.is_empty() {
                            commands.push(command.to_string());
                        }
                    }
                    self.buffer.clear();
                }
                _ if self.buffer.len() >= MAX_COMMAND_LEN => self.overflowed = true,
                _ => self.buffer.push(byte),
            }
        }

        commands
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}
