use std::collections::BTreeMap;

use log::debug;

use crate::{
    ds::{Arrow, BitField, Control},
    error::{ConfigError, SelectError},
    packer::{check_field, pack, PackedWords},
    parser::Config,
    rules::RuleEngine,
};

/// Owns every control, field, arrow and rule for one editing session.
///
/// Each accepted edit runs one full rule pass and then one full packing
/// pass before returning, so readers never see a half-updated state.
#[derive(Debug)]
pub struct Session {
    controls: Vec<Control>,
    fields: Vec<BitField>,
    arrows: Vec<Arrow>,
    engine: RuleEngine,
    packed: PackedWords,
}

impl Session {
    /// Validates the configuration and performs the first recompute.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let Config {
            controls,
            fields,
            arrows,
            rules,
        } = config;

        for (position, field) in fields.iter().enumerate() {
            check_field(field, &fields[..position], &controls).map_err(ConfigError::Layout)?;
        }
        let engine = RuleEngine::new(rules, &controls, &arrows)?;

        let mut session = Session {
            controls,
            fields,
            arrows,
            engine,
            packed: PackedWords::default(),
        };
        session.recompute();
        Ok(session)
    }

    /// The single entry point for user edits. A rejected edit changes nothing.
    pub fn on_control_changed(&mut self, name: &str, index: usize) -> Result<(), SelectError> {
        let position = self.position(name)?;
        let control = &mut self.controls[position];
        if !control.enabled() {
            return Err(SelectError::Disabled(name.to_string()));
        }
        control.select(index)?;
        debug!("{} <- {}", name, control.selected_name());
        self.recompute();
        Ok(())
    }

    /// Like `on_control_changed`, with the option given by label.
    pub fn select_by_name(&mut self, name: &str, label: &str) -> Result<(), SelectError> {
        let position = self.position(name)?;
        let index = self.controls[position].index_of(label).ok_or_else(|| {
            SelectError::UnknownOption {
                control: name.to_string(),
                label: label.to_string(),
            }
        })?;
        self.on_control_changed(name, index)
    }

    /// Rule pass, then packing pass.
    pub fn recompute(&mut self) {
        self.engine.evaluate(&mut self.controls, &mut self.arrows);
        self.packed = pack(&self.controls, &self.fields);
        debug!(
            "recomputed: {}",
            self.packed.to_string().lines().next().unwrap_or_default()
        );
    }

    pub fn packed_words(&self) -> &PackedWords {
        &self.packed
    }

    /// The `WriteK(...)` header and one `.set K<n>_FIX` line per word.
    pub fn annotation_text(&self) -> String {
        self.packed.to_string()
    }

    pub fn enabled_flags(&self) -> BTreeMap<String, bool> {
        self.controls
            .iter()
            .map(|control| (control.name().to_string(), control.enabled()))
            .collect()
    }

    pub fn visible_flags(&self) -> BTreeMap<String, bool> {
        self.arrows
            .iter()
            .map(|arrow| (arrow.name.clone(), arrow.visible))
            .collect()
    }

    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|control| control.name() == name)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    fn position(&self, name: &str) -> Result<usize, SelectError> {
        self.controls
            .iter()
            .position(|control| control.name() == name)
            .ok_or_else(|| SelectError::UnknownControl(name.to_string()))
    }
}
