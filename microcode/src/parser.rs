use crate::{
    condition::parse_condition,
    ds::{Arrow, BitField, Control, WordId},
    error::ParseError,
    packer::check_field,
    rules::{DerivationRule, Target},
};
use log::warn;
use std::collections::HashSet;
use std::io::BufRead;

/// Everything a session is built from, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub controls: Vec<Control>,
    pub fields: Vec<BitField>,
    pub arrows: Vec<Arrow>,
    pub rules: Vec<DerivationRule>,
}

/// Line oriented configuration reader.
///
/// ```text
/// @ name [k<n>/<mask>/<shift>] : opt *default opt   control and its field
/// * arrow on|off                                    arrow, initial visibility
/// ! control = condition                             enable rule
/// ^ arrow = condition                               visibility rule
/// ```
///
/// Names must be declared before a rule refers to them.
#[derive(Debug, Default)]
pub struct ParserState {
    line_number: usize,
    names: HashSet<String>,
    config: Config,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Config {
        self.config
    }

    /// Helper method to create a ParseError with the current line number
    fn parse_error(&self, message: &str) -> ParseError {
        ParseError::new(self.line_number, message)
    }
}

impl ParserState {
    pub fn parse<R: BufRead>(&mut self, reader: R) -> Result<(), ParseError> {
        for line in reader.lines() {
            self.line_number += 1;
            let line =
                line.map_err(|e| self.parse_error(&format!("Failed to read line: {}", e)))?;
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let mut chars = line.chars();
            let first_char = chars.next().unwrap_or_default();
            let rest = chars.as_str();
            match first_char {
                '@' => self.parse_control_line(rest)?,
                '*' => self.parse_arrow_line(rest)?,
                '!' => self.parse_enable_line(rest)?,
                '^' => self.parse_visibility_line(rest)?,
                _ => {
                    return Err(self.parse_error(&format!("Invalid line start '{}'", first_char)));
                }
            }
        }
        Ok(())
    }
}

impl ParserState {
    fn parse_control_line(&mut self, line: &str) -> Result<(), ParseError> {
        let (head, labels) = line
            .split_once(':')
            .ok_or_else(|| self.parse_error("Missing ':' before option labels"))?;
        let mut head_terms = head.split_whitespace();
        let name = head_terms
            .next()
            .ok_or_else(|| self.parse_error("Missing control name after '@'"))?;
        self.check_name(name)?;
        let layout = head_terms.next();
        if let Some(extra) = head_terms.next() {
            return Err(self.parse_error(&format!(
                "Unexpected term '{}' in definition of control '{}'",
                extra, name
            )));
        }

        let mut options: Vec<String> = Vec::new();
        let mut default = None;
        for term in labels.split_whitespace() {
            let label = match term.strip_prefix('*') {
                Some(label) => {
                    if default.is_some() {
                        return Err(self.parse_error(&format!(
                            "Control '{}' has more than one default option",
                            name
                        )));
                    }
                    default = Some(options.len());
                    label
                }
                None => term,
            };
            if label.is_empty() || !label.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(self.parse_error(&format!(
                    "Invalid option label '{}', must be alphanumeric",
                    label
                )));
            }
            if options.iter().any(|option| option == label) {
                return Err(self.parse_error(&format!(
                    "Option '{}' defined more than once for control '{}'",
                    label, name
                )));
            }
            options.push(label.to_string());
        }
        if options.is_empty() {
            return Err(self.parse_error(&format!("Control '{}' has no options", name)));
        }

        let option_count = options.len();
        self.config
            .controls
            .push(Control::new(name, options, default.unwrap_or(0)));
        self.names.insert(name.to_string());

        if let Some(layout) = layout {
            let field = self.parse_layout(layout, self.config.controls.len() - 1)?;
            check_field(&field, &self.config.fields, &self.config.controls)
                .map_err(|message| self.parse_error(&message))?;
            if option_count - 1 > field.mask as usize {
                warn!(
                    "Line {}: mask {:#x} of '{}' cannot encode all {} options",
                    self.line_number, field.mask, name, option_count
                );
            }
            self.config.fields.push(field);
        }
        Ok(())
    }

    /// `k<n>/<mask>/<shift>`
    fn parse_layout(&self, layout: &str, control: usize) -> Result<BitField, ParseError> {
        let parts: Vec<&str> = layout.split('/').collect();
        if parts.len() != 3 {
            return Err(self.parse_error(&format!(
                "Invalid field layout '{}', expected format 'k<n>/<mask>/<shift>'",
                layout
            )));
        }
        let word = WordId::from_name(parts[0]).ok_or_else(|| {
            self.parse_error(&format!(
                "Invalid word '{}', expected one of k0, k1, k2, k3",
                parts[0]
            ))
        })?;
        let mask = self.parse_number(parts[1])?;
        let shift = self.parse_number(parts[2])?;
        if mask > 0xFF || shift > 7 {
            return Err(self.parse_error(&format!(
                "Field layout '{}' does not fit in an 8-bit word",
                layout
            )));
        }
        Ok(BitField {
            control,
            word,
            mask: mask as u8,
            shift: shift as u8,
        })
    }

    fn parse_number(&self, term: &str) -> Result<u32, ParseError> {
        let (radix, digits) = match term.chars().next() {
            Some('h') => (16, &term[1..]),
            Some('d') => (10, &term[1..]),
            Some('b') => (2, &term[1..]),
            _ => (10, term),
        };
        u32::from_str_radix(digits, radix)
            .map_err(|_| self.parse_error(&format!("Invalid number format '{}'", term)))
    }

    fn check_name(&self, name: &str) -> Result<(), ParseError> {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(self.parse_error(&format!(
                "Invalid name '{}', must be alphanumeric",
                name
            )));
        }
        if name.chars().all(char::is_numeric) {
            return Err(self.parse_error(&format!("Name '{}' cannot be all numerals", name)));
        }
        if self.names.contains(name) {
            return Err(self.parse_error(&format!("Name '{}' defined more than once", name)));
        }
        Ok(())
    }
}

impl ParserState {
    fn parse_arrow_line(&mut self, line: &str) -> Result<(), ParseError> {
        let mut terms = line.split_whitespace();
        let name = terms
            .next()
            .ok_or_else(|| self.parse_error("Missing arrow name after '*'"))?;
        self.check_name(name)?;
        let visible = match terms.next() {
            Some("on") => true,
            Some("off") => false,
            Some(other) => {
                return Err(self.parse_error(&format!(
                    "Invalid visibility '{}' for arrow '{}', expected 'on' or 'off'",
                    other, name
                )));
            }
            None => {
                return Err(self.parse_error(&format!(
                    "Missing visibility for arrow '{}'",
                    name
                )));
            }
        };
        if let Some(extra) = terms.next() {
            return Err(self.parse_error(&format!(
                "Unexpected term '{}' in definition of arrow '{}'",
                extra, name
            )));
        }
        self.config.arrows.push(Arrow::new(name, visible));
        self.names.insert(name.to_string());
        Ok(())
    }
}

impl ParserState {
    fn parse_enable_line(&mut self, line: &str) -> Result<(), ParseError> {
        let (name, text) = self.split_rule(line)?;
        let control = self
            .config
            .controls
            .iter()
            .position(|control| control.name() == name)
            .ok_or_else(|| {
                self.parse_error(&format!("Enable rule for undefined control '{}'", name))
            })?;
        self.push_rule(Target::Enable(control), text)
    }

    fn parse_visibility_line(&mut self, line: &str) -> Result<(), ParseError> {
        let (name, text) = self.split_rule(line)?;
        let arrow = self
            .config
            .arrows
            .iter()
            .position(|arrow| arrow.name == name)
            .ok_or_else(|| {
                self.parse_error(&format!("Visibility rule for undefined arrow '{}'", name))
            })?;
        self.push_rule(Target::Show(arrow), text)
    }

    fn split_rule<'l>(&self, line: &'l str) -> Result<(&'l str, &'l str), ParseError> {
        let (target, text) = line.split_once('=').ok_or_else(|| {
            self.parse_error(&format!(
                "Invalid rule '{}', expected format 'name = condition'",
                line.trim()
            ))
        })?;
        let mut terms = target.split_whitespace();
        match (terms.next(), terms.next()) {
            (Some(name), None) => Ok((name, text.trim())),
            _ => Err(self.parse_error(&format!(
                "Invalid rule target '{}', expected a single name",
                target.trim()
            ))),
        }
    }

    fn push_rule(&mut self, target: Target, text: &str) -> Result<(), ParseError> {
        let condition = parse_condition(text, &self.config.controls)
            .map_err(|message| self.parse_error(&message))?;
        self.config.rules.push(DerivationRule {
            target,
            condition,
            text: text.to_string(),
            line: self.line_number,
        });
        Ok(())
    }
}

/// Reads a whole configuration.
pub fn parse_config<R: BufRead>(reader: R) -> Result<Config, ParseError> {
    let mut parser = ParserState::new();
    parser.parse(reader)?;
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use std::io::Cursor;

    /// Helper function to parse the given input
    fn parse_input(input: &str) -> Result<Config, ParseError> {
        parse_config(Cursor::new(input))
    }

    #[test]
    fn test_valid_input_all_line_types() {
        let input = r#"
            # Controls
            @ rcw_ir_uc k1/b1/1 : rcw_from_ir *rcw_from_uc
            @ src1 k2/b11/6 : r0 r1 r2 r3
            @ note : only_for_the_diagram

            # Arrows
            * regToBus off
            * sysdata on

            ! src1 = rcw_ir_uc == rcw_from_uc
            ^ regToBus = enabled(src1)
        "#;

        let config = parse_input(input).expect("Parsing failed");
        assert_eq!(config.controls.len(), 3);
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.arrows.len(), 2);
        assert_eq!(config.rules.len(), 2);

        assert_eq!(config.controls[0].selected_name(), "rcw_from_uc");
        assert_eq!(config.controls[1].selected(), 0);
        assert_eq!(
            config.fields[1],
            BitField {
                control: 1,
                word: WordId::K2,
                mask: 0b11,
                shift: 6
            }
        );
        assert!(config.arrows[1].visible);
        assert_eq!(config.rules[0].target, Target::Enable(1));
        assert_eq!(config.rules[0].line, 11);
        assert_eq!(config.rules[1].target, Target::Show(0));
        assert_eq!(config.rules[1].condition, Condition::Enabled(1));
    }

    #[test]
    fn test_layout_radix_prefixes() {
        let input = "@ a k3/h3/d6 : x y\n@ b K3/7/3 : x y";
        let config = parse_input(input).expect("Parsing failed");
        assert_eq!(config.fields[0].mask, 3);
        assert_eq!(config.fields[0].shift, 6);
        assert_eq!(config.fields[1].word, WordId::K3);
        assert_eq!(config.fields[1].mask, 7);
    }

    #[test]
    fn test_error_invalid_line_start() {
        let err = parse_input("& invalid line start").unwrap_err();
        assert_eq!(err.to_string(), "Error on line 1: Invalid line start '&'");
    }

    #[test]
    fn test_error_missing_colon() {
        let err = parse_input("@ a k3/1/0 x y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Missing ':' before option labels"
        );
    }

    #[test]
    fn test_error_duplicate_name() {
        let err = parse_input("@ a : x\n* a off").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Name 'a' defined more than once"
        );
    }

    #[test]
    fn test_error_name_all_numerals() {
        let err = parse_input("@ 123 : x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Name '123' cannot be all numerals"
        );
    }

    #[test]
    fn test_error_no_options() {
        let err = parse_input("@ a k0/1/0 :").unwrap_err();
        assert_eq!(err.to_string(), "Error on line 1: Control 'a' has no options");
    }

    #[test]
    fn test_error_duplicate_option() {
        let err = parse_input("@ a : yes no yes").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Option 'yes' defined more than once for control 'a'"
        );
    }

    #[test]
    fn test_error_two_defaults() {
        let err = parse_input("@ a : *yes *no").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Control 'a' has more than one default option"
        );
    }

    #[test]
    fn test_error_invalid_word() {
        let err = parse_input("@ a k4/1/0 : x y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Invalid word 'k4', expected one of k0, k1, k2, k3"
        );
    }

    #[test]
    fn test_error_invalid_layout() {
        let err = parse_input("@ a k0/1 : x y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Invalid field layout 'k0/1', expected format 'k<n>/<mask>/<shift>'"
        );
        let err = parse_input("@ a k0/bx/0 : x y").unwrap_err();
        assert_eq!(err.to_string(), "Error on line 1: Invalid number format 'bx'");
    }

    #[test]
    fn test_error_field_too_wide() {
        let err = parse_input("@ a k0/b111/6 : x y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Field 'a' (mask 0x7 shifted by 6) does not fit in an 8-bit word"
        );
        let err = parse_input("@ a k0/1/8 : x y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Field layout 'k0/1/8' does not fit in an 8-bit word"
        );
    }

    #[test]
    fn test_error_overlapping_fields() {
        let input = "@ a k3/b11/6 : w x y z\n@ b k3/b111/4 : x y";
        let err = parse_input(input).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Field 'b' overlaps field 'a' in k3"
        );
    }

    #[test]
    fn test_same_bits_in_different_words() {
        let input = "@ a k3/b11/6 : w x y z\n@ b k2/b11/6 : w x y z";
        assert!(parse_input(input).is_ok());
    }

    #[test]
    fn test_error_arrow_visibility() {
        let err = parse_input("* busToMux maybe").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Invalid visibility 'maybe' for arrow 'busToMux', expected 'on' or 'off'"
        );
        let err = parse_input("* busToMux").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 1: Missing visibility for arrow 'busToMux'"
        );
    }

    #[test]
    fn test_error_rule_for_undefined_target() {
        let err = parse_input("@ a : x y\n! b = a == x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Enable rule for undefined control 'b'"
        );
        let err = parse_input("@ a : x y\n^ b = a == x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Visibility rule for undefined arrow 'b'"
        );
    }

    #[test]
    fn test_error_rule_reads_undefined_control() {
        let err = parse_input("@ a : x y\n! a = b == x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Condition references undefined control 'b'"
        );
    }

    #[test]
    fn test_error_rule_format() {
        let err = parse_input("@ a : x y\n! a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Invalid rule 'a', expected format 'name = condition'"
        );
        let err = parse_input("@ a : x y\n! a b = a == x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Invalid rule target 'a b', expected a single name"
        );
    }
}
