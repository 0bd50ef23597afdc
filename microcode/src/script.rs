use std::{fmt, io::BufRead};

use crate::{
    error::{ParseError, SelectError},
    session::Session,
};

/// Which option an edit picks.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionRef {
    Index(usize),
    Label(String),
}

impl fmt::Display for OptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionRef::Index(index) => write!(f, "{}", index),
            OptionRef::Label(label) => write!(f, "{}", label),
        }
    }
}

/// One `control=option` assignment. All-digit options are indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub control: String,
    pub option: OptionRef,
}

impl Edit {
    pub fn parse(term: &str) -> Result<Self, String> {
        let parts: Vec<&str> = term.split('=').map(str::trim).collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(format!(
                "Invalid edit '{}', expected format 'control=option'",
                term.trim()
            ));
        }
        let option = match parts[1].parse::<usize>() {
            Ok(index) => OptionRef::Index(index),
            Err(_) => OptionRef::Label(parts[1].to_string()),
        };
        Ok(Edit {
            control: parts[0].to_string(),
            option,
        })
    }

    pub fn apply(&self, session: &mut Session) -> Result<(), SelectError> {
        match &self.option {
            OptionRef::Index(index) => session.on_control_changed(&self.control, *index),
            OptionRef::Label(label) => session.select_by_name(&self.control, label),
        }
    }
}

/// Reads one edit per line; `#` starts a comment.
pub fn read_script<R: BufRead>(reader: R) -> Result<Vec<Edit>, ParseError> {
    let mut edits = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line_number = number + 1;
        let line = line
            .map_err(|e| ParseError::new(line_number, &format!("Failed to read line: {}", e)))?;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        edits.push(Edit::parse(line).map_err(|message| ParseError::new(line_number, &message))?);
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config, ds::WordId};
    use std::io::Cursor;

    #[test]
    fn test_read_script() {
        let input = r#"
            # read a byte from memory
            sysdata_src=bus_mem
            m16_en = 1   # byte access
        "#;
        let edits = read_script(Cursor::new(input)).unwrap();
        assert_eq!(
            edits,
            vec![
                Edit {
                    control: "sysdata_src".to_string(),
                    option: OptionRef::Label("bus_mem".to_string()),
                },
                Edit {
                    control: "m16_en".to_string(),
                    option: OptionRef::Index(1),
                },
            ]
        );
    }

    #[test]
    fn test_error_invalid_edit() {
        let err = read_script(Cursor::new("rw=write\nrw")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error on line 2: Invalid edit 'rw', expected format 'control=option'"
        );
        assert!(Edit::parse("rw==write").is_err());
        assert!(Edit::parse("=write").is_err());
    }

    #[test]
    fn test_apply_edits_to_session() {
        let mut session = Session::new(config::load(None).unwrap()).unwrap();
        let edits = read_script(Cursor::new("sysdata_src=bus_mem\nm16_en=0\nrw=write")).unwrap();

        assert_eq!(edits[0].apply(&mut session), Ok(()));
        assert_eq!(edits[1].apply(&mut session), Ok(()));
        assert_eq!(
            edits[2].apply(&mut session),
            Err(SelectError::Disabled("rw".to_string()))
        );
        assert_eq!(session.packed_words().hex(WordId::K1), "0x9f");
        assert_eq!(session.packed_words().hex(WordId::K0), "0xbf");
    }

    #[test]
    fn test_shipped_script_applies_cleanly() {
        let mut session = Session::new(config::load(None).unwrap()).unwrap();
        let script = include_str!("../scripts/read_word.edits");
        for edit in read_script(script.as_bytes()).unwrap() {
            assert_eq!(edit.apply(&mut session), Ok(()), "{}={}", edit.control, edit.option);
        }
        assert!(session.visible_flags()["busToAluHold"]);
        assert!(session.visible_flags()["memToBus"]);
        assert_eq!(session.packed_words().hex(WordId::K3), "0xbb");
    }
}
