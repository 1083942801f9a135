//! Interface status table model

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use vlanswap_common::{Template, TemplateError};

use crate::types::{InterfaceRecord, VlanId};

/// Built-in grammar for Cisco IOS `show interfaces status`.
pub const IOS_STATUS_TEMPLATE: &str =
    include_str!("../templates/cisco_ios_show_interfaces_status.textfsm");

/// Result type alias for status table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors that can occur while turning status output into a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The grammar itself is broken or rejected the input.
    #[error("Status template error: {0}")]
    Template(#[from] TemplateError),

    /// The grammar file could not be read.
    #[error("Failed to read status template '{path}': {source}")]
    TemplateFile {
        /// The template path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The grammar or a row does not have the seven status columns.
    #[error("Expected {expected} status columns, found {found}")]
    ColumnMismatch {
        /// Columns required.
        expected: usize,
        /// Columns present.
        found: usize,
    },

    /// The device returned text, but no line of it is a status row.
    #[error("Unrecognized interface status output: {first_line}")]
    Unrecognized {
        /// The first non-blank line of the output.
        first_line: String,
    },

    /// The same interface appears twice in one retrieval.
    #[error("Interface '{name}' listed more than once")]
    DuplicateInterface {
        /// The repeated interface name.
        name: String,
    },
}

/// Compiles the built-in IOS status grammar.
pub fn default_status_template() -> TableResult<Template> {
    Ok(Template::parse(IOS_STATUS_TEMPLATE)?)
}

/// Loads and compiles a status grammar from `path`.
pub fn load_status_template(path: &Path) -> TableResult<Template> {
    let source = std::fs::read_to_string(path).map_err(|source| TableError::TemplateFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Template::parse(&source)?)
}

/// Every port from one status retrieval, in device order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceStatusTable {
    records: Vec<InterfaceRecord>,
}

impl InterfaceStatusTable {
    /// Parses raw `show interfaces status` output with `template`.
    pub fn parse(template: &Template, raw: &str) -> TableResult<Self> {
        let width = template.header().len();
        if width != InterfaceRecord::FIELD_COUNT {
            return Err(TableError::ColumnMismatch {
                expected: InterfaceRecord::FIELD_COUNT,
                found: width,
            });
        }

        let rows = template.parse_text(raw)?;
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let found = row.len();
            let record =
                InterfaceRecord::from_row(row).ok_or(TableError::ColumnMismatch {
                    expected: InterfaceRecord::FIELD_COUNT,
                    found,
                })?;
            if !seen.insert(record.name.clone()) {
                return Err(TableError::DuplicateInterface { name: record.name });
            }
            records.push(record);
        }

        if records.is_empty() {
            if let Some(first_line) = raw.lines().map(str::trim).find(|l| !l.is_empty()) {
                return Err(TableError::Unrecognized {
                    first_line: first_line.to_string(),
                });
            }
        }

        debug!(count = records.len(), "Parsed interface status table");
        Ok(Self { records })
    }

    /// Builds a table from already-parsed records.
    pub fn from_records(records: Vec<InterfaceRecord>) -> Self {
        Self { records }
    }

    /// Names of the interfaces whose access VLAN is `vlan`, in table order.
    ///
    /// Trunk and routed ports never match: their VLAN column is not numeric.
    pub fn filter_by_vlan(&self, vlan: &VlanId) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.is_in_vlan(vlan))
            .map(|record| record.name.as_str())
            .collect()
    }

    /// The records in device order.
    pub fn records(&self) -> &[InterfaceRecord] {
        &self.records
    }

    /// Number of interfaces.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no interfaces.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
