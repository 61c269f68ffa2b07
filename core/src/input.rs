//! Physical key events to logical input line commands.

/// Number of bindable slots: 10 primary lines plus 2 auxiliary ones.
pub const SLOT_COUNT: usize = 12;

/// Primary slots map one-to-one onto lines `0..PRIMARY_SLOTS`.
pub const PRIMARY_SLOTS: usize = 10;

/// Lines driven by the two auxiliary slots.
pub const AUX_LINES: [u8; 2] = [16, 17];

/// Slot names, in binding-table order.
pub const SLOT_NAMES: [&str; SLOT_COUNT] = [
    "A", "B", "Select", "Start", "Right", "Left", "Up", "Down", "R", "L", "X", "Y",
];

/// Alt key in PC set-1 scancodes.
pub const PC_ALT_SCANCODE: u32 = 0x38;

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0x1);
    pub const ALT: Modifiers = Modifiers(0x2);
    pub const SHIFT: Modifiers = Modifiers(0x4);
    pub const SUPER: Modifiers = Modifiers(0x8);

    pub const fn from_bits(bits: u8) -> Self {
        Modifiers(bits & 0xF)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// A key press or release as reported by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scancode: u32,
    pub modifiers: Modifiers,
    pub up: bool,
    /// Auto-repeat echo of a key that is already down.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn down(scancode: u32) -> Self {
        Self {
            scancode,
            modifiers: Modifiers::NONE,
            up: false,
            repeat: false,
        }
    }

    pub fn up(scancode: u32) -> Self {
        Self {
            up: true,
            ..Self::down(scancode)
        }
    }

    pub fn repeat(scancode: u32) -> Self {
        Self {
            repeat: true,
            ..Self::down(scancode)
        }
    }

    pub fn with_modifiers(self, modifiers: Modifiers) -> Self {
        Self { modifiers, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCommand {
    pub line: u8,
    pub pressed: bool,
}

/// Ordered slot → scancode table. Unbound slots never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBindings {
    slots: [Option<u32>; SLOT_COUNT],
}

impl KeyBindings {
    pub fn new(slots: [Option<u32>; SLOT_COUNT]) -> Self {
        Self { slots }
    }

    /// Bind `slot` to `scancode`. Out-of-range slots are ignored.
    pub fn bind(&mut self, slot: usize, scancode: u32) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(scancode);
        }
    }

    pub fn get(&self, slot: usize) -> Option<u32> {
        self.slots.get(slot).copied().flatten()
    }

    /// Look up a slot index by its name in [`SLOT_NAMES`] (case-insensitive).
    pub fn slot_index(name: &str) -> Option<usize> {
        SLOT_NAMES.iter().position(|s| s.eq_ignore_ascii_case(name))
    }

    /// Logical line driven by `slot`, or `None` past the last slot.
    pub fn slot_line(slot: usize) -> Option<u8> {
        if slot < PRIMARY_SLOTS {
            Some(slot as u8)
        } else {
            AUX_LINES.get(slot - PRIMARY_SLOTS).copied()
        }
    }

    fn lines_for(&self, scancode: u32) -> impl Iterator<Item = u8> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, bound)| **bound == Some(scancode))
            .filter_map(|(slot, _)| Self::slot_line(slot))
    }
}

/// Result of translating one key event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    /// `false` when the event belongs to the UI (Alt and Alt+key).
    pub consumed: bool,
    pub commands: Vec<KeyCommand>,
}

impl Translation {
    fn ignored() -> Self {
        Self::default()
    }
}

pub struct InputTranslator {
    bindings: KeyBindings,
    alt_scancodes: Vec<u32>,
}

impl InputTranslator {
    /// `alt_scancodes` are the physical keys that act as the Alt modifier on
    /// this platform; they are never game input.
    pub fn new(bindings: KeyBindings, alt_scancodes: &[u32]) -> Self {
        Self {
            bindings,
            alt_scancodes: alt_scancodes.to_vec(),
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn translate(&self, event: &KeyEvent) -> Translation {
        if self.alt_scancodes.contains(&event.scancode) {
            return Translation::ignored();
        }

        if event.up {
            // Releases skip the Alt and repeat filters so a key can never stick.
            return Translation {
                consumed: true,
                commands: self.commands(event.scancode, false),
            };
        }

        if event.modifiers.contains(Modifiers::ALT) {
            return Translation::ignored();
        }

        let commands = if event.repeat {
            Vec::new()
        } else {
            self.commands(event.scancode, true)
        };
        Translation {
            consumed: true,
            commands,
        }
    }

    fn commands(&self, scancode: u32, pressed: bool) -> Vec<KeyCommand> {
        self.bindings
            .lines_for(scancode)
            .map(|line| KeyCommand { line, pressed })
            .collect()
    }
}
