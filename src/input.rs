//! Input routing: applies queued [`InputEvent`]s to the [`EditState`].
//!
//! Handlers only mutate raw values; range enforcement is left to
//! [`EditState::normalize`] at the top of the next frame.

use std::collections::VecDeque;

use tracing::debug;

use crate::events::{Flow, InputEvent, Key, PointerButton, ScrollDirection};
use crate::state::{Channel, EditState};

const QUIT_KEY: char = 'q';

/// Apply one event to `state`.
pub fn apply(state: &mut EditState, event: InputEvent) -> Flow {
    match event {
        InputEvent::PointerMoved { x, y } => state.mask_center = (x, y),
        InputEvent::PointerPressed(PointerButton::Primary) => state.grow_mask(),
        InputEvent::PointerPressed(PointerButton::Secondary) => state.shrink_mask(),
        InputEvent::Scrolled(ScrollDirection::Up) => state.raise_value(),
        InputEvent::Scrolled(ScrollDirection::Down) => state.lower_value(),
        InputEvent::KeyPressed(key) => return apply_key(state, key),
    }
    Flow::Continue
}

fn apply_key(state: &mut EditState, key: Key) -> Flow {
    match key {
        Key::Escape | Key::Char(QUIT_KEY) => return Flow::Quit,
        Key::Tab => {
            state.cycle_channel();
            debug!(channel = %state.active_channel(), "cycled channel");
        }
        Key::Char('+' | '=') => state.grow_mask(),
        Key::Char('-' | '_') => state.shrink_mask(),
        Key::Char(c) => {
            if let Some(channel) = Channel::from_key(c) {
                if state.select(channel) {
                    debug!(%channel, "selected channel");
                } else {
                    debug!(%channel, "channel not supported; ignoring");
                }
            }
        }
    }
    Flow::Continue
}

/// FIFO of pending events. Consecutive pointer moves collapse into the
/// latest position so the one-event-per-frame loop never trails the cursor.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        if let InputEvent::PointerMoved { .. } = event
            && let Some(last @ InputEvent::PointerMoved { .. }) = self.events.back_mut()
        {
            *last = event;
            return;
        }
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }
}
