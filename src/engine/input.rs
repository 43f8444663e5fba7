use crate::browser;
use anyhow::{anyhow, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::collections::{HashSet, VecDeque};
use wasm_bindgen::JsCast;
use web_sys::{KeyboardEvent, PageTransitionEvent};

/// Keys whose browser default (page scroll) is swallowed while playing
const SWALLOWED_KEYS: [&str; 5] = ["ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight", "Space"];

/// What the browser told us since the last frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { code: String },
    KeyUp { code: String },
    Quit,
}

/// ┌──────────────────── Input Flow ─────────────────────┐
/// │ keydown/keyup/pagehide listeners                    │
/// │     └─► unbounded channel (InputEvent)              │
/// │             └─► process_input() once per frame      │
/// │                     └─► KeyState                    │
/// │                         ├─ held keys   (polling)    │
/// │                         ├─ fresh presses (events)   │
/// │                         └─ quit flag                │
/// └─────────────────────────────────────────────────────┘
#[derive(Debug, Default)]
pub struct KeyState {
    held: HashSet<String>,
    presses: VecDeque<String>,
    quit: bool,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the key with this `KeyboardEvent.code` currently held down
    pub fn is_pressed(&self, code: &str) -> bool {
        self.held.contains(code)
    }

    pub fn any_pressed(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.is_pressed(code))
    }

    /// Next key that went down since the last call, oldest first.
    /// Every auto-repeated keydown is a press of its own.
    pub fn next_press(&mut self) -> Option<String> {
        self.presses.pop_front()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown { code } => {
                self.presses.push_back(code.clone());
                self.held.insert(code);
            }
            InputEvent::KeyUp { code } => {
                self.held.remove(&code);
            }
            InputEvent::Quit => self.quit = true,
        }
    }
}

/// Hook keyboard and page lifecycle listeners onto the window.
/// Listeners live for the rest of the page.
pub fn prepare_input() -> Result<UnboundedReceiver<InputEvent>> {
    let (sender, receiver) = unbounded::<InputEvent>();
    let window = browser::window()?;

    let down_sender = sender.clone();
    let on_keydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        let code = event.code();
        if SWALLOWED_KEYS.contains(&code.as_str()) {
            event.prevent_default();
        }
        send(&down_sender, InputEvent::KeyDown { code });
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let up_sender = sender.clone();
    let on_keyup = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        send(&up_sender, InputEvent::KeyUp { code: event.code() });
    }) as Box<dyn FnMut(KeyboardEvent)>);

    let on_pagehide = browser::closure_wrap(Box::new(move |event: PageTransitionEvent| {
        if let Some(event) = pagehide_event(event.persisted()) {
            send(&sender, event);
        }
    }) as Box<dyn FnMut(PageTransitionEvent)>);

    for (name, callback) in [
        ("keydown", on_keydown.as_ref()),
        ("keyup", on_keyup.as_ref()),
        ("pagehide", on_pagehide.as_ref()),
    ] {
        window
            .add_event_listener_with_callback(name, callback.unchecked_ref())
            .map_err(|err| anyhow!("Could not add {} listener : {:#?}", name, err))?;
    }

    on_keydown.forget();
    on_keyup.forget();
    on_pagehide.forget();

    Ok(receiver)
}

/// Drain everything queued since the last frame into `state`
pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<InputEvent>) {
    // try_next: Ok(Some) = event, Ok(None) = closed, Err = empty right now
    while let Ok(Some(event)) = receiver.try_next() {
        state.apply(event);
    }
}

/// A page kept in the back/forward cache may come back, so only a real
/// unload ends the game
fn pagehide_event(persisted: bool) -> Option<InputEvent> {
    (!persisted).then_some(InputEvent::Quit)
}

fn send(sender: &UnboundedSender<InputEvent>, event: InputEvent) {
    if let Err(err) = sender.unbounded_send(event) {
        log!("Dropped input event : {:#?}", err);
    }
}
