use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use ifrinstr::{EfiGuid, emit::SymbolResolver};
use log::debug;
use serde::Deserialize;

use crate::{
    question::QuestionDb,
    utils::error::{VfrError, VfrResult},
};

/// Shape of a symbol file:
///
/// ```toml
/// [strings]
/// STR_FORM_SET_TITLE = 0x0002
///
/// [guids]
/// gSetupFormSetGuid = "A04A27F4-DF00-4D42-B552-39511302113D"
///
/// [questions]
/// BootTimeout = 3
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SymbolFile {
    strings: BTreeMap<String, u16>,
    guids: BTreeMap<String, String>,
    questions: BTreeMap<String, u16>,
}

/// Names of the string tokens, GUIDs and questions a form was compiled
/// against, used to make the YAML and JSON dumps readable.
#[derive(Debug, Clone, Default)]
pub struct HeaderSymbols {
    strings: BTreeMap<u16, String>,
    guids: HashMap<EfiGuid, String>,
    questions: BTreeMap<u16, String>,
}

impl HeaderSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str, file: &str) -> VfrResult<Self> {
        let parsed: SymbolFile = toml::from_str(text).map_err(|source| VfrError::ConfigParse {
            file: file.to_string(),
            source,
        })?;

        let mut symbols = HeaderSymbols::new();
        for (name, id) in parsed.strings {
            symbols.add_string(name, id);
        }
        for (name, text) in parsed.guids {
            let guid = EfiGuid::parse(&text).ok_or_else(|| VfrError::InvalidGuid {
                name: name.clone(),
                text: text.clone(),
            })?;
            symbols.add_guid(name, guid);
        }
        for (name, id) in parsed.questions {
            symbols.add_question(name, id);
        }
        debug!(
            "loaded {} string, {} guid and {} question names from {file}",
            symbols.strings.len(),
            symbols.guids.len(),
            symbols.questions.len()
        );
        Ok(symbols)
    }

    pub fn load(path: &Path) -> VfrResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VfrError::io(path, e))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// The first name registered for an id wins.
    pub fn add_string(&mut self, name: impl Into<String>, id: u16) {
        self.strings.entry(id).or_insert_with(|| name.into());
    }

    pub fn add_guid(&mut self, name: impl Into<String>, guid: EfiGuid) {
        self.guids.entry(guid).or_insert_with(|| name.into());
    }

    pub fn add_question(&mut self, name: impl Into<String>, id: u16) {
        self.questions.entry(id).or_insert_with(|| name.into());
    }

    /// Adds the names of the questions declared during a compilation.
    pub fn extend_questions(&mut self, questions: &QuestionDb) {
        for (name, id) in questions.iter() {
            self.add_question(name, id);
        }
    }
}

impl SymbolResolver for HeaderSymbols {
    fn string_name(&self, id: u16) -> Option<&str> {
        self.strings.get(&id).map(String::as_str)
    }

    fn guid_name(&self, guid: &EfiGuid) -> Option<&str> {
        self.guids.get(guid).map(String::as_str)
    }

    fn question_name(&self, id: u16) -> Option<&str> {
        self.questions.get(&id).map(String::as_str)
    }
}
