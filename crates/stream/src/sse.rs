// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental Server-Sent-Events frame decoder.
//!
//! Raw body chunks go in, complete events come out; a chunk boundary can
//! fall anywhere, including inside a UTF-8 sequence. Comment lines (the
//! upstream heartbeat) are discarded. `id:` and `retry:` fields are not used
//! by the auto-config protocol and are ignored.

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    event_name: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Consume a body chunk, appending any completed events to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<SseEvent>) {
        self.buf.extend_from_slice(chunk);
        while let Some(newline) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            let line = match line.strip_suffix(b"\r\n") {
                Some(rest) => rest,
                None => &line[..line.len() - 1],
            };
            let line = String::from_utf8_lossy(line).into_owned();
            self.process_line(&line, out);
        }
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<SseEvent>) {
        if line.is_empty() {
            // blank line dispatches the accumulated event; `reconnect` and
            // friends arrive with a name but no data lines at all
            if self.event_name.is_some() || !self.data.is_empty() {
                out.push(SseEvent {
                    name: self.event_name.take().unwrap_or_else(|| "message".to_string()),
                    data: self.data.join("\n"),
                });
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
        match field {
            "event" => self.event_name = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
