use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::model::output::{Output, OutputId};

/// Tracks resize acknowledgements shared by every output and the workspaces
/// and outputs that need a recompute before the next repaint.
#[derive(Debug)]
pub struct TransactionManager {
    /// Outstanding resizes. Forced to -1 when a wait times out, so late
    /// acknowledgements cannot block the next transaction.
    resize_count: i32,
    timeout: Duration,
    pending_tags: Vec<(OutputId, usize)>,
    pending_outputs: Vec<OutputId>,
}

impl TransactionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            resize_count: 0,
            timeout,
            pending_tags: Vec::new(),
            pending_outputs: Vec::new(),
        }
    }

    pub fn resize_count(&self) -> i32 { self.resize_count }

    pub fn begin_resize(&mut self) { self.resize_count = (self.resize_count + 1).max(1); }

    /// Returns true when this acknowledgement settled every outstanding resize.
    pub fn finish_resize(&mut self) -> bool {
        self.resize_count -= 1;
        self.resize_count <= 0
    }

    /// The repaint gate. A denied frame starts the output's wait, and a wait
    /// older than the timeout lets the frame through regardless.
    pub fn allow_render(&mut self, output: &mut Output, now: Instant) -> bool {
        if let Some(since) = output.waiting_since {
            if now.saturating_duration_since(since) > self.timeout {
                warn!(
                    output = %output.name,
                    outstanding = self.resize_count,
                    "resize transaction timed out"
                );
                self.resize_count = -1;
                output.waiting_since = None;
                return true;
            }
        }

        if self.resize_count > 0 {
            if output.waiting_since.is_none() {
                trace!(output = %output.name, "holding repaint for resize acknowledgements");
                output.waiting_since = Some(now);
            }
            return false;
        }

        output.waiting_since = None;
        true
    }

    /// Queues a workspace recompute. Returns false when it was already queued.
    pub fn schedule_tag(&mut self, output: OutputId, workspace: usize) -> bool {
        if self.pending_tags.contains(&(output, workspace)) {
            return false;
        }
        self.pending_tags.push((output, workspace));
        true
    }

    pub fn schedule_output(&mut self, output: OutputId) -> bool {
        if self.pending_outputs.contains(&output) {
            return false;
        }
        self.pending_outputs.push(output);
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_tags.is_empty() || !self.pending_outputs.is_empty()
    }

    pub fn take_pending_tags(&mut self) -> Vec<(OutputId, usize)> {
        std::mem::take(&mut self.pending_tags)
    }

    pub fn take_pending_outputs(&mut self) -> Vec<OutputId> {
        std::mem::take(&mut self.pending_outputs)
    }

    /// Drops every schedule that targets `output`.
    pub fn forget_output(&mut self, output: OutputId) {
        self.pending_tags.retain(|(o, _)| *o != output);
        self.pending_outputs.retain(|o| *o != output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Settings;
    use crate::model::output::{OutputInfo, OutputState};
    use crate::sys::geometry::Rect;

    fn output() -> Output {
        let info = OutputInfo {
            name: "DP-1".into(),
            layout_box: Rect::new(0, 0, 1920, 1080),
            usable_area: None,
            enabled: true,
        };
        Output::new(info, OutputState::new(&Settings::default()), false)
    }

    #[test]
    fn count_never_starts_below_one() {
        let mut tm = TransactionManager::new(Duration::from_millis(500));
        tm.begin_resize();
        tm.begin_resize();
        assert_eq!(tm.resize_count(), 2);
        assert!(!tm.finish_resize());
        assert!(tm.finish_resize());

        // A late acknowledgement after settling drives the count negative,
        // and the next resize still counts as one.
        assert!(tm.finish_resize());
        assert_eq!(tm.resize_count(), -1);
        tm.begin_resize();
        assert_eq!(tm.resize_count(), 1);
    }

    #[test]
    fn gate_waits_then_times_out() {
        let mut tm = TransactionManager::new(Duration::from_millis(500));
        let mut out = output();
        let start = Instant::now();

        assert!(tm.allow_render(&mut out, start));
        tm.begin_resize();
        assert!(!tm.allow_render(&mut out, start));
        assert_eq!(out.waiting_since, Some(start));
        assert!(!tm.allow_render(&mut out, start + Duration::from_millis(300)));
        assert_eq!(out.waiting_since, Some(start));

        assert!(tm.allow_render(&mut out, start + Duration::from_millis(501)));
        assert_eq!(tm.resize_count(), -1);
        assert_eq!(out.waiting_since, None);
    }

    #[test]
    fn schedules_are_idempotent() {
        let mut tm = TransactionManager::new(Duration::from_millis(500));
        let o = OutputId::default();
        assert!(tm.schedule_tag(o, 1));
        assert!(!tm.schedule_tag(o, 1));
        assert!(tm.schedule_tag(o, 2));
        assert!(tm.schedule_output(o));
        assert!(!tm.schedule_output(o));
        assert_eq!(tm.take_pending_tags(), vec![(o, 1), (o, 2)]);
        tm.forget_output(o);
        assert!(!tm.has_pending());
    }
}
