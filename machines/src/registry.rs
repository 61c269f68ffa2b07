//! Machines available to the `tandem` binary.
//!
//! A machine module announces itself with [`inventory::submit!`] and a
//! [`MachineEntry`]; nothing else needs to know it exists. The factory hands
//! back a `Box<dyn Machine + Send>` because the frontend moves the machine
//! into the driver thread right after creating it, and never touches it
//! again from the UI side.

use tandem_core::core::machine::Machine;

pub struct MachineEntry {
    /// Positional `MACHINE` argument that selects this entry.
    pub name: &'static str,
    /// Shown next to the name by `tandem --list`.
    pub description: &'static str,
    /// Build an unpowered machine. `init` is left to the driver thread.
    pub create: fn() -> Box<dyn Machine + Send>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn() -> Box<dyn Machine + Send>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Every registered machine, sorted by name for `--list`.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Comma-separated machine names, for error messages.
pub fn names() -> String {
    all().iter().map(|e| e.name).collect::<Vec<_>>().join(", ")
}

pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
