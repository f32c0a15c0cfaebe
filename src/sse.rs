//! Incremental Server-Sent-Events decoder.
//!
//! Feeds arbitrary byte chunks from the wire and yields the `data` payload of
//! each complete event. Frames are separated by a blank line; `data` lines
//! spanning several `data:` fields are joined with newlines per the SSE
//! format. Comment lines (starting with `:`) are keep-alives and are
//! discarded; `event`, `id`, and `retry` fields are not used by the stream
//! endpoint and are ignored.

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of the response body, returning the payloads of every
    /// event completed by it. Chunks may split lines, or even UTF-8
    /// sequences, at any byte boundary.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.buf.drain(..=pos).collect();
            raw.pop(); // trailing \n
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw).into_owned();
            self.handle_line(&line, &mut out);
        }
        out
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<String>) {
        if line.is_empty() {
            // Blank line dispatches the accumulated event.
            if !self.data.is_empty() {
                out.push(self.data.join("\n"));
                self.data.clear();
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data.push(value.to_string());
        }
    }
}
