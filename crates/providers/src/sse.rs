/// Incremental Server-Sent Events parser for `streamGenerateContent?alt=sse`.
///
/// Events are separated by a blank line; only `data:` lines carry payload.
/// Google frontends emit `\r\n` line endings, so carriage returns are dropped.
/// Bytes are buffered raw and decoded one complete event at a time, so a
/// multi-byte character split across network chunks survives intact.

/// A single parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub data: String,
}

/// Buffers partial events across network chunk boundaries.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the response body, returning every completed event.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(boundary) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event the server did not terminate with a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.buffer);
        parse_block(&String::from_utf8_lossy(&block))
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let data_lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|val| val.strip_prefix(' ').unwrap_or(val))
        .collect();
    // event:, id:, retry: and ":" comments are ignored

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        data: data_lines.join("\n"),
    })
}
