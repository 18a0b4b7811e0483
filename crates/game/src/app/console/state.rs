use std::collections::VecDeque;

pub(crate) const MAX_OUTPUT_LINES: usize = 256;
pub(crate) const MAX_PENDING_LINES: usize = 64;
pub(crate) const MAX_SUBMITTED_LINE_CHARS: usize = 256;

/// Line buffers between stdin, the command processor and stdout.
///
/// The terminal is the scrollback, so output lines are queued until the
/// front end drains and prints them.
#[derive(Debug, Default)]
pub(crate) struct ConsoleState {
    output_lines: VecDeque<String>,
    pending_lines: VecDeque<String>,
}

impl ConsoleState {
    pub(crate) fn submit_line(&mut self, raw_line: &str) {
        let line: String = raw_line
            .chars()
            .filter(|ch| !ch.is_control())
            .take(MAX_SUBMITTED_LINE_CHARS)
            .collect();
        push_bounded(&mut self.pending_lines, line, MAX_PENDING_LINES);
    }

    pub(crate) fn append_output_line(&mut self, line: impl Into<String>) {
        push_bounded(&mut self.output_lines, line.into(), MAX_OUTPUT_LINES);
    }

    pub(crate) fn clear_output_lines(&mut self) {
        self.output_lines.clear();
    }

    pub(crate) fn drain_pending_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.pending_lines.drain(..));
    }

    pub(crate) fn drain_output_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.output_lines.drain(..));
    }

    #[cfg(test)]
    pub(crate) fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn push_pending_line_for_test(&mut self, line: &str) {
        push_bounded(&mut self.pending_lines, line.to_string(), MAX_PENDING_LINES);
    }
}

fn push_bounded(queue: &mut VecDeque<String>, value: String, max_len: usize) {
    if queue.len() == max_len {
        queue.pop_front();
    }
    queue.push_back(value);
}
