//! Temps: virtual registers used as TAC operands.

use std::collections::BTreeSet;
use std::fmt;

use crate::core::Register;

/// Stable identity of a temp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_T{}", self.0)
    }
}

/// Temp-level sets are ordered by identity.
pub type TempSet = BTreeSet<TempId>;

/// One temp entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Temp {
    pub id: TempId,
    pub name: String,
    reg: Option<Register>,
}

impl Temp {
    /// Register currently bound to this temp.
    pub fn reg(&self) -> Option<Register> {
        self.reg
    }
}

/// Owner of all temps in a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct TempTable {
    temps: Vec<Temp>,
}

impl TempTable {
    pub fn new() -> Self {
        Self { temps: Vec::new() }
    }

    /// Create a temp and return its id.
    pub fn create(&mut self, name: impl Into<String>) -> TempId {
        let id = TempId(self.temps.len() as u32);
        self.temps.push(Temp {
            id,
            name: name.into(),
            reg: None,
        });
        id
    }

    pub fn get(&self, id: TempId) -> Option<&Temp> {
        self.temps.get(id.0 as usize)
    }

    /// Display name, falling back to the id form for foreign temps.
    pub fn name(&self, id: TempId) -> String {
        match self.get(id) {
            Some(temp) => temp.name.clone(),
            None => id.to_string(),
        }
    }

    pub fn reg(&self, id: TempId) -> Option<Register> {
        self.get(id).and_then(Temp::reg)
    }

    /// Bind a register to a temp, replacing any earlier binding.
    pub fn bind(&mut self, id: TempId, reg: Register) {
        if let Some(temp) = self.temps.get_mut(id.0 as usize) {
            temp.reg = Some(reg);
        }
    }

    pub fn len(&self) -> usize {
        self.temps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Temp> {
        self.temps.iter()
    }

    /// Render a set as `[ a b c ]`.
    pub fn format_set(&self, set: &TempSet) -> String {
        let mut out = String::from("[ ");
        for id in set {
            out.push_str(&self.name(*id));
            out.push(' ');
        }
        out.push(']');
        out
    }
}
