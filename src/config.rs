//! Trace limits shared by both backends.

use crate::snapshot::Trace;

/// Default cap on the number of step records in one trace.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Default cap on captured program output, in bytes.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Default cap on output bytes stored across all records of one trace.
pub const DEFAULT_MAX_TRACE_BYTES: usize = 64 * 1024 * 1024;

/// Default scripting call depth before `RecursionError` is raised.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Resource bounds applied to a single trace run.
///
/// Exceeding `max_steps`, `max_output_bytes` or `max_trace_bytes` ends the
/// trace with a truncation record instead of growing without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    pub max_steps: usize,
    pub max_output_bytes: usize,
    /// Every record keeps the cumulative output, so this bounds the sum
    pub max_trace_bytes: usize,
    pub max_call_depth: usize,
}

impl TraceConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        // A trace always needs room for the initial record and a terminal one
        self.max_steps = max_steps.max(2);
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn with_max_trace_bytes(mut self, max_trace_bytes: usize) -> Self {
        self.max_trace_bytes = max_trace_bytes;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth.max(1);
        self
    }

    /// The limit that stops `trace` from taking another record whose
    /// cumulative output is `output_len` bytes. Room is always left for the
    /// terminal record.
    pub fn limit_reached(&self, trace: &Trace, output_len: usize) -> Option<Limit> {
        if trace.len() + 1 >= self.max_steps {
            return Some(Limit::Steps(self.max_steps));
        }
        if output_len > self.max_output_bytes {
            return Some(Limit::Output(self.max_output_bytes));
        }
        if trace.output_bytes() + output_len > self.max_trace_bytes {
            return Some(Limit::TraceBytes(self.max_trace_bytes));
        }
        None
    }

    /// `output` cut back to `max_output_bytes` on a character boundary
    pub fn clip_output(&self, output: &str) -> String {
        let mut cut = self.max_output_bytes.min(output.len());
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output[..cut].to_string()
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_steps: DEFAULT_MAX_STEPS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_trace_bytes: DEFAULT_MAX_TRACE_BYTES,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// A resource bound that ended a trace early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Steps(usize),
    Output(usize),
    TraceBytes(usize),
}

impl Limit {
    /// Message carried by the truncation record
    pub fn message(self) -> String {
        match self {
            Limit::Steps(max) => format!("trace truncated: step limit of {} reached", max),
            Limit::Output(max) => format!("trace truncated: output exceeded {} bytes", max),
            Limit::TraceBytes(max) => {
                format!("trace truncated: records hold more than {} bytes of output", max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Environment;
    use crate::snapshot::StepRecord;

    #[test]
    fn test_limits_in_order() {
        let config = TraceConfig::default()
            .with_max_steps(3)
            .with_max_output_bytes(4)
            .with_max_trace_bytes(6);
        let mut trace = Trace::new();
        assert_eq!(config.limit_reached(&trace, 0), None);
        assert_eq!(config.limit_reached(&trace, 5), Some(Limit::Output(4)));

        trace.push(StepRecord::normal(1, Environment::new(), "abcd"));
        assert_eq!(trace.output_bytes(), 4);
        assert_eq!(config.limit_reached(&trace, 3), Some(Limit::TraceBytes(6)));
        assert_eq!(config.limit_reached(&trace, 2), None);

        trace.push(StepRecord::normal(2, Environment::new(), ""));
        assert_eq!(config.limit_reached(&trace, 0), Some(Limit::Steps(3)));
    }

    #[test]
    fn test_clip_output_respects_char_boundaries() {
        let config = TraceConfig::default().with_max_output_bytes(4);
        assert_eq!(config.clip_output("abc"), "abc");
        assert_eq!(config.clip_output("abcdef"), "abcd");
        // 'é' is two bytes starting at index 3
        assert_eq!(config.clip_output("abcé"), "abc");
    }
}
