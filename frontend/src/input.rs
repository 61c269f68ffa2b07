use sdl2::keyboard::{Mod, Scancode};
use tandem_core::input::{KeyBindings, KeyEvent, Modifiers, SLOT_NAMES};

/// Default physical key for an input slot.
/// Uses name-based matching so the table reads like the button layout.
pub fn default_scancode(slot_name: &str) -> Option<Scancode> {
    match slot_name {
        "A" => Some(Scancode::X),
        "B" => Some(Scancode::Z),
        "Select" => Some(Scancode::Backspace),
        "Start" => Some(Scancode::Return),
        "Right" => Some(Scancode::Right),
        "Left" => Some(Scancode::Left),
        "Up" => Some(Scancode::Up),
        "Down" => Some(Scancode::Down),
        "R" => Some(Scancode::W),
        "L" => Some(Scancode::Q),
        "X" => Some(Scancode::S),
        "Y" => Some(Scancode::A),
        _ => None,
    }
}

/// Build the default binding table for every slot.
pub fn default_key_bindings() -> KeyBindings {
    let mut bindings = KeyBindings::default();
    for (slot, name) in SLOT_NAMES.iter().enumerate() {
        if let Some(sc) = default_scancode(name) {
            bindings.bind(slot, sc as u32);
        }
    }
    bindings
}

/// Quits the frontend; never forwarded to the machine.
pub const QUIT_KEY: Scancode = Scancode::Escape;

/// Keys the UI owns and a slot may not be bound to.
pub fn is_reserved(scancode: Scancode) -> bool {
    scancode == QUIT_KEY || alt_scancodes().contains(&(scancode as u32))
}

/// Both Alt keys act as the UI accelerator modifier.
pub fn alt_scancodes() -> [u32; 2] {
    [Scancode::LAlt as u32, Scancode::RAlt as u32]
}

pub fn modifiers(keymod: Mod) -> Modifiers {
    let mut mods = Modifiers::NONE;
    if keymod.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD) {
        mods = mods | Modifiers::CTRL;
    }
    if keymod.intersects(Mod::LALTMOD | Mod::RALTMOD) {
        mods = mods | Modifiers::ALT;
    }
    if keymod.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD) {
        mods = mods | Modifiers::SHIFT;
    }
    if keymod.intersects(Mod::LGUIMOD | Mod::RGUIMOD) {
        mods = mods | Modifiers::SUPER;
    }
    mods
}

pub fn key_event(scancode: Scancode, keymod: Mod, up: bool, repeat: bool) -> KeyEvent {
    KeyEvent {
        scancode: scancode as u32,
        modifiers: modifiers(keymod),
        up,
        repeat,
    }
}
