//! Decoding downloaded report parts into records
//!
//! A part is tab-separated text. The first line is a header whose columns look
//! like `ym:s:goalsID`; only the last `:`-segment (`goalsID`) names the field.
//! Every following line is one record.
//!
//! Columns whose name starts with a configured group prefix (by default only
//! `goals`) hold a list per row instead of a scalar. All columns of a group are
//! parsed (see [`list`]) and transposed, so that position *k* across the group's
//! columns becomes the *k*-th entry of the group:
//!
//! ```
//! use logs_report_dl::decoder::{FieldValue, RecordDecoder, Scalar};
//!
//! let decoder = RecordDecoder::new(
//!     vec!["visitID".into(), "goalsID".into(), "goalsPrice".into()],
//!     &["goals".to_string()],
//! );
//! let record = decoder.decode("42\t[1,2]\t[10,20]").unwrap();
//!
//! assert_eq!(record.text("visitID"), Some("42"));
//! let goals = record.group("goals").unwrap();
//! assert_eq!(goals.len(), 2);
//! assert_eq!(goals[1]["goalsPrice"], Scalar::Int(20));
//! ```

pub mod list;

pub use list::{ListParseError, Scalar, parse_list};

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// One entry of a repeated group: field name → value at that position
pub type GroupEntry = BTreeMap<String, Scalar>;

/// Value of a decoded field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain column, passed through verbatim
    Text(String),
    /// Repeated group, one entry per list position
    Group(Vec<GroupEntry>),
}

impl FieldValue {
    /// The text of a plain column
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Group(_) => None,
        }
    }

    /// The entries of a group
    pub fn as_group(&self) -> Option<&[GroupEntry]> {
        match self {
            FieldValue::Group(entries) => Some(entries),
            FieldValue::Text(_) => None,
        }
    }
}

/// One decoded line: field (or group) name → value
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecodedRecord(BTreeMap<String, FieldValue>);

impl DecodedRecord {
    /// Value of a field or group
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Text of a plain column
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Entries of a group
    pub fn group(&self, name: &str) -> Option<&[GroupEntry]> {
        self.get(name).and_then(FieldValue::as_group)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the record has no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over top-level keys and values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Unwrap into the underlying map
    pub fn into_inner(self) -> BTreeMap<String, FieldValue> {
        self.0
    }
}

/// Why a line could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Token count differs from the header (typically a truncated line)
    #[error("line has {found} fields, header has {expected}")]
    FieldCount {
        /// Number of header fields
        expected: usize,
        /// Number of tokens on the line
        found: usize,
    },

    /// A group column does not hold a valid list literal
    ///
    /// [`PartRecords`] does not surface this: it logs a warning and skips
    /// the line.
    #[error("field '{field}' is not a valid list: {source}")]
    List {
        /// The offending column
        field: String,
        /// Parser error
        #[source]
        source: ListParseError,
    },
}

/// Field names of a header line: the last `:`-segment of every column
pub fn parse_header(header: &str) -> Vec<String> {
    header
        .trim_end_matches('\r')
        .split('\t')
        .map(|column| {
            column
                .rsplit_once(':')
                .map_or(column, |(_, name)| name)
                .to_string()
        })
        .collect()
}

#[derive(Clone, Debug)]
struct Group {
    name: String,
    /// Indices into the field list, in header order
    members: Vec<usize>,
}

/// Decodes lines of one part, given its header
#[derive(Clone, Debug)]
pub struct RecordDecoder {
    fields: Vec<String>,
    groups: Vec<Group>,
    grouped: Vec<bool>,
}

impl RecordDecoder {
    /// Build a decoder for `fields` (already unprefixed, in column order)
    ///
    /// A field joins the first group whose prefix it starts with. Groups with
    /// no matching field do not appear in decoded records.
    pub fn new(fields: Vec<String>, group_prefixes: &[String]) -> Self {
        let mut grouped = vec![false; fields.len()];
        let mut groups = Vec::new();

        for prefix in group_prefixes {
            let members: Vec<usize> = fields
                .iter()
                .enumerate()
                .filter(|(i, field)| !grouped[*i] && field.starts_with(prefix.as_str()))
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }
            for &i in &members {
                grouped[i] = true;
            }
            groups.push(Group {
                name: prefix.clone(),
                members,
            });
        }

        Self {
            fields,
            groups,
            grouped,
        }
    }

    /// Build a decoder from a raw header line
    pub fn from_header(header: &str, group_prefixes: &[String]) -> Self {
        Self::new(parse_header(header), group_prefixes)
    }

    /// Field names in column order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Decode one data line
    ///
    /// # Errors
    /// [`DecodeError::FieldCount`] when the line does not have one token per
    /// field, [`DecodeError::List`] when a group column is not a list literal
    pub fn decode(&self, line: &str) -> Result<DecodedRecord, DecodeError> {
        let tokens: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if tokens.len() != self.fields.len() {
            return Err(DecodeError::FieldCount {
                expected: self.fields.len(),
                found: tokens.len(),
            });
        }

        let mut record = BTreeMap::new();

        for group in &self.groups {
            let columns = group
                .members
                .iter()
                .map(|&i| {
                    parse_group_column(tokens[i]).map_err(|source| DecodeError::List {
                        field: self.fields[i].clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            // Transpose; a ragged group is cut to its shortest column
            let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
            let entries = (0..rows)
                .map(|k| {
                    group
                        .members
                        .iter()
                        .zip(&columns)
                        .map(|(&i, column)| (self.fields[i].clone(), column[k].clone()))
                        .collect::<GroupEntry>()
                })
                .collect();

            record.insert(group.name.clone(), FieldValue::Group(entries));
        }

        for (i, field) in self.fields.iter().enumerate() {
            if !self.grouped[i] {
                record.insert(field.clone(), FieldValue::Text(tokens[i].to_string()));
            }
        }

        Ok(DecodedRecord(record))
    }
}

/// An empty cell is an empty group, anything else must be a list literal
fn parse_group_column(token: &str) -> Result<Vec<Scalar>, ListParseError> {
    if token.trim().is_empty() {
        Ok(Vec::new())
    } else {
        parse_list(token)
    }
}

/// Records of one downloaded part, decoded lazily line by line
///
/// Only empty lines are passed over unread; a line of blank values under a
/// multi-column header is still a record. Lines that do not decode are
/// skipped: a wrong token count silently (the expected symptom of a
/// truncated transfer), a broken group column with a warning.
#[derive(Debug)]
pub struct PartRecords {
    text: String,
    pos: usize,
    decoder: RecordDecoder,
}

impl PartRecords {
    /// Prepare a part for decoding
    ///
    /// With `unescape_quotes`, every `\'` in the text becomes `'` before the
    /// header is read.
    pub fn new(text: String, group_prefixes: &[String], unescape_quotes: bool) -> Self {
        let text = if unescape_quotes && text.contains("\\'") {
            text.replace("\\'", "'")
        } else {
            text
        };

        let header_end = text.find('\n').unwrap_or(text.len());
        let decoder = RecordDecoder::from_header(&text[..header_end], group_prefixes);
        let pos = (header_end + 1).min(text.len());

        Self { text, pos, decoder }
    }

    /// Field names from the part's header
    pub fn fields(&self) -> &[String] {
        self.decoder.fields()
    }
}

impl Iterator for PartRecords {
    type Item = DecodedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let start = self.pos;
            let len = self.text[start..].find('\n').unwrap_or(self.text.len() - start);
            self.pos = start + len + 1;

            let line = self.text[start..start + len].trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            match self.decoder.decode(line) {
                Ok(record) => return Some(record),
                Err(e @ DecodeError::FieldCount { .. }) => {
                    debug!(error = %e, "skipping malformed line");
                }
                Err(e) => {
                    warn!(error = %e, "skipping undecodable line");
                }
            }
        }
        None
    }
}

/// Decode a whole part at once
pub fn decode_part(text: &str, group_prefixes: &[String], unescape_quotes: bool) -> Vec<DecodedRecord> {
    PartRecords::new(text.to_string(), group_prefixes, unescape_quotes).collect()
}
