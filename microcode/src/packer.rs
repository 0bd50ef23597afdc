use std::fmt;

use crate::ds::{BitField, Control, WordId};

/// Value of a word, and of every bit no field claims: pulled high.
pub const UNDRIVEN: u8 = 0xFF;

/// The four K registers plus the `name=label` fragments that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedWords {
    words: [u8; 4],
    annotations: [Vec<String>; 4],
}

impl Default for PackedWords {
    fn default() -> Self {
        PackedWords {
            words: [UNDRIVEN; 4],
            annotations: Default::default(),
        }
    }
}

impl PackedWords {
    pub fn word(&self, id: WordId) -> u8 {
        self.words[id.index()]
    }

    /// `0x` plus lowercase hex, no padding.
    pub fn hex(&self, id: WordId) -> String {
        format!("0x{:x}", self.word(id))
    }

    /// Space separated `field=label` list in packing order.
    pub fn annotation(&self, id: WordId) -> String {
        self.annotations[id.index()].join(" ")
    }
}

impl fmt::Display for PackedWords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "WriteK({}, {}, {}, {});",
            self.hex(WordId::K3),
            self.hex(WordId::K2),
            self.hex(WordId::K1),
            self.hex(WordId::K0)
        )?;
        for id in WordId::ALL.iter().rev() {
            write!(f, "\n.set K{}_FIX", id.index())?;
            for fragment in &self.annotations[id.index()] {
                write!(f, " {}", fragment)?;
            }
        }
        Ok(())
    }
}

/// Folds every field into its word, in field order. Pure: the same
/// selections always give the same words and text.
pub fn pack(controls: &[Control], fields: &[BitField]) -> PackedWords {
    let mut packed = PackedWords::default();
    for field in fields {
        let control = &controls[field.control];
        let value = ((control.selected() & field.mask as usize) as u8) << field.shift;
        let word = &mut packed.words[field.word.index()];
        *word &= !field.bits();
        *word |= value;
        packed.annotations[field.word.index()]
            .push(format!("{}={}", control.name(), control.selected_name()));
    }
    packed
}

/// Checks a field against the controls and the fields placed before it.
/// Returns a bare message; callers attach line numbers or wrap it.
pub(crate) fn check_field(
    field: &BitField,
    placed: &[BitField],
    controls: &[Control],
) -> Result<(), String> {
    let name = controls
        .get(field.control)
        .map(Control::name)
        .ok_or_else(|| format!("Field refers to undefined control #{}", field.control))?;
    if field.mask == 0 {
        return Err(format!("Field '{}' has an empty mask", name));
    }
    if field.shift >= 8 || (field.mask as u16) << field.shift > UNDRIVEN as u16 {
        return Err(format!(
            "Field '{}' (mask {:#x} shifted by {}) does not fit in an 8-bit word",
            name, field.mask, field.shift
        ));
    }
    if let Some(other) = placed.iter().find(|other| other.overlaps(field)) {
        return Err(format!(
            "Field '{}' overlaps field '{}' in {}",
            name,
            controls[other.control].name(),
            field.word
        ));
    }
    Ok(())
}
