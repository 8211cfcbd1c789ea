use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::utils::error::{VfrError, VfrResult};

/// Question ids handed out during one compilation.
///
/// Ids start at 1; 0 means "allocate one for me" in a question header.
/// Anonymous questions take an id but no name.
#[derive(Debug, Clone, Default)]
pub struct QuestionDb {
    by_name: BTreeMap<String, u16>,
    names: BTreeMap<u16, String>,
    used: BTreeSet<u16>,
    /// No id below this one is free.
    low_water: u16,
}

impl QuestionDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u16) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Picks the id [`QuestionDb::declare`] would assign without recording
    /// anything.
    pub fn next_id(&self, name: Option<&str>, requested: u16) -> VfrResult<u16> {
        if let Some(name) = name
            && let Some(id) = self.lookup(name)
        {
            return Err(VfrError::DuplicateQuestionName {
                name: name.to_string(),
                id,
            });
        }

        match requested {
            0 => self.first_free().ok_or_else(|| VfrError::QuestionIdsExhausted {
                name: name.unwrap_or("<anonymous>").to_string(),
            }),
            id if self.used.contains(&id) => Err(VfrError::DuplicateQuestionId { id }),
            id => Ok(id),
        }
    }

    /// Declares a question. With `requested == 0` the first free id is taken.
    pub fn declare(&mut self, name: Option<&str>, requested: u16) -> VfrResult<u16> {
        let id = self.next_id(name, requested)?;
        if requested == 0 {
            self.low_water = id;
        }
        self.used.insert(id);
        if let Some(name) = name {
            self.by_name.insert(name.to_string(), id);
            self.names.insert(id, name.to_string());
        }
        debug!("question {} gets id {id}", name.unwrap_or("<anonymous>"));
        Ok(id)
    }

    fn first_free(&self) -> Option<u16> {
        let mut candidate = self.low_water.max(1);
        while self.used.contains(&candidate) {
            candidate = candidate.checked_add(1)?;
        }
        Some(candidate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.by_name.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.names.clear();
        self.used.clear();
        self.low_water = 0;
    }
}
