//! Expand/collapse presentation state for the anomaly list.
//!
//! Expanding reveals every item first and flips the animation flag one frame later.
//! Collapsing flips the flag off first and truncates to one item only after the
//! collapse delay, so the list is never cut short while the animation runs.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::{emit_event, event_names, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureState {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleCount {
    One,
    All,
}

impl DisclosureState {
    /// The user's intent: true from the expand action until the collapse action.
    pub fn expanded(self) -> bool {
        matches!(self, DisclosureState::Expanding | DisclosureState::Expanded)
    }

    pub fn visible_count(self) -> VisibleCount {
        match self {
            DisclosureState::Collapsed => VisibleCount::One,
            _ => VisibleCount::All,
        }
    }

    pub fn transitioning(self) -> bool {
        matches!(self, DisclosureState::Expanding | DisclosureState::Collapsing)
    }

    /// The style flag that drives the open animation.
    pub fn animating(self) -> bool {
        self == DisclosureState::Expanded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Expand,
    Collapse,
    FrameElapsed,
    DelayElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Frame,
    CollapseDelay,
}

/// Next state and the timer to arm, or `None` if `input` does nothing in `state`.
pub fn transition(state: DisclosureState, input: Input) -> Option<(DisclosureState, Option<Timer>)> {
    use DisclosureState::*;
    match (state, input) {
        (Collapsed | Collapsing, Input::Expand) => Some((Expanding, Some(Timer::Frame))),
        (Expanding | Expanded, Input::Collapse) => Some((Collapsing, Some(Timer::CollapseDelay))),
        (Expanding, Input::FrameElapsed) => Some((Expanded, None)),
        (Collapsing, Input::DelayElapsed) => Some((Collapsed, None)),
        _ => None,
    }
}

struct DisclosureCell {
    state: DisclosureState,
    generation: u64,
}

fn lock(cell: &Mutex<DisclosureCell>) -> MutexGuard<'_, DisclosureCell> {
    cell.lock().unwrap_or_else(|e| e.into_inner())
}

/// Apply `input` to a locked cell. Returns the timer to arm and the generation it belongs to.
fn step(cell: &mut DisclosureCell, input: Input, bus: &EventBus) -> Option<(Option<Timer>, u64)> {
    let (next, timer) = transition(cell.state, input)?;
    debug!(from = ?cell.state, to = ?next, ?input, "Disclosure transition");
    cell.state = next;
    cell.generation += 1;
    let _ = emit_event(bus, event_names::DISCLOSURE_CHANGED, next);
    Some((timer, cell.generation))
}

/// Owns the disclosure state and its single pending timer.
pub struct DisclosureController {
    cell: Arc<Mutex<DisclosureCell>>,
    pending: Option<JoinHandle<()>>,
    frame_interval: Duration,
    collapse_delay: Duration,
    bus: EventBus,
}

impl DisclosureController {
    pub fn new(frame_interval: Duration, collapse_delay: Duration, bus: EventBus) -> Self {
        Self {
            cell: Arc::new(Mutex::new(DisclosureCell {
                state: DisclosureState::Collapsed,
                generation: 0,
            })),
            pending: None,
            frame_interval,
            collapse_delay,
            bus,
        }
    }

    /// The control is only offered when there is something to hide.
    pub fn is_available(item_count: usize) -> bool {
        item_count > 1
    }

    pub fn state(&self) -> DisclosureState {
        lock(&self.cell).state
    }

    pub fn timer_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn expand(&mut self) -> bool {
        self.apply(Input::Expand)
    }

    pub fn collapse(&mut self) -> bool {
        self.apply(Input::Collapse)
    }

    /// Collapse only once the open animation is showing; otherwise (re-)expand,
    /// which is a no-op while already expanding.
    pub fn toggle(&mut self) -> bool {
        if self.state().animating() {
            self.collapse()
        } else {
            self.expand()
        }
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.state().visible_count() {
            VisibleCount::One => &items[..items.len().min(1)],
            VisibleCount::All => items,
        }
    }

    fn apply(&mut self, input: Input) -> bool {
        let Some((timer, generation)) = step(&mut lock(&self.cell), input, &self.bus) else {
            debug!(?input, "Disclosure input ignored");
            return false;
        };
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        if let Some(timer) = timer {
            self.pending = Some(self.arm(timer, generation));
        }
        true
    }

    fn arm(&self, timer: Timer, generation: u64) -> JoinHandle<()> {
        let (delay, input) = match timer {
            Timer::Frame => (self.frame_interval, Input::FrameElapsed),
            Timer::CollapseDelay => (self.collapse_delay, Input::DelayElapsed),
        };
        let cell = Arc::clone(&self.cell);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut cell = lock(&cell);
            if cell.generation == generation {
                step(&mut cell, input, &bus);
            }
        })
    }

    /// Cancel any pending timer. Called automatically on drop.
    pub fn dispose(&mut self) {
        lock(&self.cell).generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for DisclosureController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const FRAME: Duration = Duration::from_millis(16);
    const DELAY: Duration = Duration::from_millis(500);

    fn controller() -> DisclosureController {
        DisclosureController::new(FRAME, DELAY, EventBus::new())
    }

    #[test]
    fn transition_table() {
        use super::DisclosureState::*;
        assert_eq!(transition(Collapsed, Input::Expand), Some((Expanding, Some(Timer::Frame))));
        assert_eq!(transition(Expanding, Input::FrameElapsed), Some((Expanded, None)));
        assert_eq!(
            transition(Expanded, Input::Collapse),
            Some((Collapsing, Some(Timer::CollapseDelay)))
        );
        assert_eq!(transition(Collapsing, Input::DelayElapsed), Some((Collapsed, None)));
        assert_eq!(transition(Collapsing, Input::Expand), Some((Expanding, Some(Timer::Frame))));
        assert_eq!(transition(Expanded, Input::Expand), None);
        assert_eq!(transition(Expanding, Input::Expand), None);
        assert_eq!(transition(Collapsed, Input::Collapse), None);
        assert_eq!(transition(Expanded, Input::DelayElapsed), None);
    }

    #[test]
    fn collapsing_keeps_all_items_with_flag_off() {
        let state = DisclosureState::Collapsing;
        assert!(!state.expanded());
        assert!(!state.animating());
        assert!(state.transitioning());
        assert_eq!(state.visible_count(), VisibleCount::All);
    }

    #[test]
    fn available_only_for_more_than_one_item() {
        assert!(!DisclosureController::is_available(0));
        assert!(!DisclosureController::is_available(1));
        assert!(DisclosureController::is_available(2));
    }

    #[tokio::test(start_paused = true)]
    async fn expand_reveals_then_animates_after_frame() {
        let items = ["t1", "t2", "t3"];
        let mut disclosure = controller();
        assert_eq!(disclosure.visible(&items), &["t1"]);

        assert!(disclosure.expand());
        assert_eq!(disclosure.state(), DisclosureState::Expanding);
        assert_eq!(disclosure.visible(&items).len(), 3);
        assert!(!disclosure.state().animating());

        sleep(FRAME + Duration::from_millis(1)).await;
        assert_eq!(disclosure.state(), DisclosureState::Expanded);
        assert!(disclosure.state().animating());
        assert_eq!(disclosure.visible(&items).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn collapse_truncates_only_after_delay() {
        let items = ["t1", "t2", "t3"];
        let mut disclosure = controller();
        disclosure.expand();
        sleep(Duration::from_millis(20)).await;

        assert!(disclosure.collapse());
        assert!(!disclosure.state().animating());
        assert_eq!(disclosure.visible(&items).len(), 3);

        sleep(DELAY - Duration::from_millis(1)).await;
        assert_eq!(disclosure.state(), DisclosureState::Collapsing);
        assert_eq!(disclosure.visible(&items).len(), 3);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(disclosure.state(), DisclosureState::Collapsed);
        assert_eq!(disclosure.visible(&items), &["t1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn expand_twice_is_a_no_op() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut disclosure = DisclosureController::new(FRAME, DELAY, bus);

        assert!(disclosure.expand());
        assert!(!disclosure.expand());
        sleep(Duration::from_millis(100)).await;
        assert!(!disclosure.expand());
        assert!(!disclosure.timer_pending());

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.payload);
        }
        assert_eq!(seen, vec![serde_json::json!("expanding"), serde_json::json!("expanded")]);
    }

    #[tokio::test(start_paused = true)]
    async fn expand_during_collapse_cancels_truncation() {
        let items = ["t1", "t2"];
        let mut disclosure = controller();
        disclosure.expand();
        sleep(Duration::from_millis(20)).await;
        disclosure.collapse();
        sleep(Duration::from_millis(200)).await;

        assert!(disclosure.expand());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(disclosure.state(), DisclosureState::Expanded);
        assert_eq!(disclosure.visible(&items).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_follows_animation_flag() {
        let mut disclosure = controller();
        assert!(disclosure.toggle());
        assert_eq!(disclosure.state(), DisclosureState::Expanding);
        assert!(!disclosure.toggle());
        assert_eq!(disclosure.state(), DisclosureState::Expanding);

        sleep(Duration::from_millis(20)).await;
        assert!(disclosure.toggle());
        assert_eq!(disclosure.state(), DisclosureState::Collapsing);
        assert!(disclosure.toggle());
        assert_eq!(disclosure.state(), DisclosureState::Expanding);
    }

    #[tokio::test(start_paused = true)]
    async fn double_toggle_during_expand_ends_expanded() {
        let items = ["t1", "t2", "t3"];
        let mut disclosure = controller();
        disclosure.toggle();
        disclosure.toggle();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(disclosure.state(), DisclosureState::Expanded);
        assert_eq!(disclosure.visible(&items).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_collapse() {
        let mut disclosure = controller();
        disclosure.expand();
        sleep(Duration::from_millis(20)).await;
        disclosure.collapse();
        assert!(disclosure.timer_pending());

        disclosure.dispose();
        assert!(!disclosure.timer_pending());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(disclosure.state(), DisclosureState::Collapsing);
    }

    #[test]
    fn visible_handles_empty_list() {
        let disclosure = controller();
        let items: [u8; 0] = [];
        assert!(disclosure.visible(&items).is_empty());
    }
}
