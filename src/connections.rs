use crate::error::{ConfigError, ConfigResult};
use crate::types::Index;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use tracing::warn;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A rigid segment between two markers. Tail minus head gives the segment's displacement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Connection {
    pub name: String,
    pub head: String,
    pub tail: String,
}

impl Connection {
    /// Connection named after its endpoints, e.g. `"LFHD - LBHD"`.
    pub fn new(head: &str, tail: &str) -> Self {
        Connection {
            name: format!("{head} - {tail}"),
            head: head.to_string(),
            tail: tail.to_string(),
        }
    }

    /// Parses a label such as `"LFHD - LBHD"` or `"LineRenderer: LFHD - LBHD"`.
    /// The namespace before the colon is dropped.
    pub fn from_label(label: &str) -> ConfigResult<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\s*(?:[^:]*:)?\s*([^\s:]+)\s+-\s+([^\s:]+)\s*$")
                .expect("connection label pattern is a valid regex")
        });

        let captures = pattern
            .captures(label)
            .ok_or_else(|| ConfigError::InvalidConnectionLabel(label.to_string()))?;
        Ok(Connection::new(&captures[1], &captures[2]))
    }
}

/// A named set of connections averaged into one body-part direction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BodyPartGroup {
    pub name: String,
    pub connections: Vec<String>,
}

impl BodyPartGroup {
    pub fn new(name: &str, connections: &[&str]) -> Self {
        BodyPartGroup {
            name: name.to_string(),
            connections: connections.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Static lookup from connection name to its endpoint marker names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionTable {
    connections: Vec<Connection>,
    index: HashMap<String, Index>,
}

impl ConnectionTable {
    /// Later duplicates of a name are ignored.
    pub fn new(connections: impl IntoIterator<Item = Connection>) -> Self {
        let mut table = ConnectionTable::default();
        for connection in connections {
            if table.index.contains_key(&connection.name) {
                warn!(connection = %connection.name, "duplicate connection ignored");
                continue;
            }
            table
                .index
                .insert(connection.name.clone(), table.connections.len());
            table.connections.push(connection);
        }
        table
    }

    pub fn resolve(&self, name: &str) -> ConfigResult<(&str, &str)> {
        self.get(name)
            .map(|c| (c.head.as_str(), c.tail.as_str()))
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Connection> {
        self.index.get(name).map(|&i| &self.connections[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Every marker name referenced as a head or tail.
    pub fn marker_names(&self) -> BTreeSet<&str> {
        self.connections
            .iter()
            .flat_map(|c| [c.head.as_str(), c.tail.as_str()])
            .collect()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////
