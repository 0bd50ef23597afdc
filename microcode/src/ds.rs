use std::fmt;

use crate::error::SelectError;

/// One of the four 8-bit microcode registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WordId {
    K0,
    K1,
    K2,
    K3,
}

impl WordId {
    pub const ALL: [WordId; 4] = [WordId::K0, WordId::K1, WordId::K2, WordId::K3];

    pub fn index(self) -> usize {
        match self {
            WordId::K0 => 0,
            WordId::K1 => 1,
            WordId::K2 => 2,
            WordId::K3 => 3,
        }
    }

    /// Parses `k0`..`k3` (case insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "k0" => Some(WordId::K0),
            "k1" => Some(WordId::K1),
            "k2" => Some(WordId::K2),
            "k3" => Some(WordId::K3),
            _ => None,
        }
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.index())
    }
}

/// A named, enumerated control and its current selection.
///
/// The selected index is always valid for the option list. A disabled
/// control always sits on its last option.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    name: String,
    options: Vec<String>,
    selected: usize,
    enabled: bool,
}

impl Control {
    /// `options` must not be empty and `selected` must index into it; the
    /// configuration parser checks both before building a control.
    pub(crate) fn new(name: &str, options: Vec<String>, selected: usize) -> Self {
        debug_assert!(selected < options.len());
        Control {
            name: name.to_string(),
            options,
            selected,
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_name(&self) -> &str {
        &self.options[self.selected]
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.options.iter().position(|option| option == label)
    }

    /// Selects an option. Does not trigger any recomputation.
    pub fn select(&mut self, index: usize) -> Result<(), SelectError> {
        if index >= self.options.len() {
            return Err(SelectError::OutOfRange {
                control: self.name.clone(),
                index,
                count: self.options.len(),
            });
        }
        self.selected = index;
        Ok(())
    }

    /// Disabling forces the last option first, every time, so a disabled
    /// control packs as all ones. Enabling keeps the current selection.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.selected = self.options.len() - 1;
        }
        self.enabled = enabled;
    }
}

/// Where a control's selected index lands in one packed word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitField {
    pub control: usize,
    pub word: WordId,
    pub mask: u8,
    pub shift: u8,
}

impl BitField {
    /// The bits this field occupies in its word.
    pub fn bits(&self) -> u8 {
        self.mask << self.shift
    }

    pub fn overlaps(&self, other: &BitField) -> bool {
        self.word == other.word && self.bits() & other.bits() != 0
    }
}

/// A signal path in the block diagram; only its visibility is modelled.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub name: String,
    pub visible: bool,
}

impl Arrow {
    pub fn new(name: &str, visible: bool) -> Self {
        Arrow {
            name: name.to_string(),
            visible,
        }
    }
}
