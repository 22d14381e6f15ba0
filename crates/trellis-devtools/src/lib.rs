use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use web_time::Instant;

use trellis_core::{Action, ChangeSet, Frame, Middleware, Runtime, Store};

pub struct Hud {
    frame_count: u64,
    last_frame: Option<Instant>,
    fps_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            last_frame: None,
            fps_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn record(&mut self, frame: &Frame, nodes: usize) {
        self.metrics = Some(Metrics {
            flush_ms: frame.elapsed.as_secs_f32() * 1000.0,
            passes: frame.passes,
            renders: frame.renders,
            effects: frame.effects,
            nodes,
        });
    }

    /// One status line for the frame just committed.
    pub fn overlay(&mut self) -> String {
        self.frame_count += 1;
        // FPS
        let now = Instant::now();
        if let Some(prev) = self.last_frame.replace(now) {
            let dt = (now - prev).as_secs_f32();
            if dt > 0.0 {
                let fps = 1.0 / dt;
                // simple EMA
                let a = 0.2;
                self.fps_smooth = if self.fps_smooth == 0.0 {
                    fps
                } else {
                    (1.0 - a) * self.fps_smooth + a * fps
                };
            }
        }
        let mut lines = vec![
            format!("frame: {}", self.frame_count),
            format!("fps: {:.1}", self.fps_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("flush: {:.2} ms", m.flush_ms));
            lines.push(format!("passes: {}", m.passes));
            lines.push(format!("renders: {}", m.renders));
            lines.push(format!("effects: {}", m.effects));
            lines.push(format!("nodes: {}", m.nodes));
        }
        lines.join("  |  ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub flush_ms: f32,
    pub passes: usize,
    pub renders: usize,
    pub effects: usize,
    pub nodes: usize,
}

pub struct Inspector {
    pub hud: Hud,
    pub enabled: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            enabled: true,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Summarises the runtime's last flush, if enabled.
    pub fn frame(&mut self, rt: &Runtime) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.hud.record(rt.last_frame(), rt.node_count());
        let line = self.hud.overlay();
        log::debug!("{line}");
        Some(line)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggedAction {
    pub kind: &'static str,
    pub detail: String,
    pub changed: Vec<String>,
}

/// Middleware that keeps the most recent actions and what they changed.
pub struct ActionLog<A> {
    entries: Rc<RefCell<VecDeque<LoggedAction>>>,
    capacity: usize,
    _action: std::marker::PhantomData<fn(A)>,
}

impl<A> ActionLog<A> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Rc::new(RefCell::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
            _action: std::marker::PhantomData,
        }
    }

    pub fn entries(&self) -> Vec<LoggedAction> {
        self.entries.borrow().iter().cloned().collect()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(|e| e.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<A> Clone for ActionLog<A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            capacity: self.capacity,
            _action: std::marker::PhantomData,
        }
    }
}

impl<A: Action> Middleware<A> for ActionLog<A> {
    fn after(&self, action: &A, _store: &Store<A>, changes: &ChangeSet) {
        let mut entries = self.entries.borrow_mut();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LoggedAction {
            kind: action.kind(),
            detail: format!("{action:?}"),
            changed: changes.iter().map(str::to_string).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::whole;

    #[derive(Clone, Debug)]
    enum Tick {
        Inc,
        Nothing,
    }

    impl Action for Tick {
        fn kind(&self) -> &'static str {
            match self {
                Tick::Inc => "INC",
                Tick::Nothing => "NOTHING",
            }
        }
    }

    fn count(n: &u32, t: &Tick) -> u32 {
        match t {
            Tick::Inc => n + 1,
            Tick::Nothing => *n,
        }
    }

    #[test]
    fn action_log_is_bounded_and_records_changes() {
        let log = ActionLog::new(2);
        let store = Store::builder()
            .slice("count", 0u32, whole, count)
            .middleware(log.clone())
            .build()
            .unwrap();
        store.dispatch(Tick::Inc);
        store.dispatch(Tick::Nothing);
        store.dispatch(Tick::Inc);

        assert_eq!(log.kinds(), vec!["NOTHING", "INC"]);
        let last = log.entries().pop().unwrap();
        assert_eq!(last.changed, vec!["count".to_string()]);
        assert!(log.entries()[0].changed.is_empty());
    }

    #[test]
    fn hud_reports_frame_metrics() {
        let mut hud = Hud::new();
        hud.record(
            &Frame {
                passes: 2,
                renders: 5,
                effects: 3,
                elapsed: std::time::Duration::from_millis(4),
            },
            7,
        );
        let line = hud.overlay();
        assert!(line.starts_with("frame: 1  |  fps: 0.0"));
        assert!(line.contains("flush: 4.00 ms"));
        assert!(line.contains("renders: 5"));
        assert!(line.contains("nodes: 7"));
    }
}
