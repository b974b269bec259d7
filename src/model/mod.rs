//! Row Model: the in-memory role table for one edit session.
//!
//! Rows are either *persisted* (identity issued by the backend) or *staged*
//! (client-only, pending creation). The model owns every row, keeps them in
//! display order and stores whatever the cell editor commits. It never
//! validates field rules itself.
//!
pub mod cell;
pub mod session;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::{Member, RoleRecord};

/// Text shown in place of an unset value.
pub const UNSET_MARKER: &str = "-";

/// Prefix of every staged row identity. Backend identities are
/// alphanumeric, so the underscore keeps the two spaces disjoint.
pub const STAGED_PREFIX: &str = "new_";

/// Editable columns of a role row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Identifier,
    FullName,
    Group,
    Subgroup,
    PassPhrase,
}

impl Field {
    /// All fields in column order.
    pub const ALL: [Field; 5] = [
        Field::Identifier,
        Field::FullName,
        Field::Group,
        Field::Subgroup,
        Field::PassPhrase,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Identifier => "ROLE ID",
            Field::FullName => "FULL NAME",
            Field::Group => "GROUP",
            Field::Subgroup => "SUBGROUP",
            Field::PassPhrase => "PASSWORD",
        }
    }

    pub fn is_optional(self) -> bool {
        matches!(self, Field::Group | Field::Subgroup | Field::PassPhrase)
    }

    /// Next column to the right, saturating at the last one.
    pub fn next(self) -> Self {
        let idx = self.index();
        Self::ALL[(idx + 1).min(Self::ALL.len() - 1)]
    }

    /// Next column to the left, saturating at the first one.
    pub fn prev(self) -> Self {
        Self::ALL[self.index().saturating_sub(1)]
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// A cell value; `Unset` is distinct from the empty string and is never
/// stored as one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CellValue {
    #[default]
    Unset,
    Set(String),
}

static UNSET: CellValue = CellValue::Unset;

impl CellValue {
    /// Normalize raw input: empty input and the marker itself become `Unset`.
    pub fn from_input(raw: &str) -> Self {
        if raw.is_empty() || raw == UNSET_MARKER {
            Self::Unset
        } else {
            Self::Set(raw.to_string())
        }
    }

    /// Normalize a value received from the backend (`null` and `""` are unset).
    pub fn from_wire(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.is_empty() => Self::Set(s),
            _ => Self::Unset,
        }
    }

    /// Text to render in the table.
    pub fn display(&self) -> &str {
        match self {
            Self::Set(s) => s,
            Self::Unset => UNSET_MARKER,
        }
    }

    /// Text to pre-fill an input with; unset cells start empty.
    pub fn as_input(&self) -> &str {
        match self {
            Self::Set(s) => s,
            Self::Unset => "",
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Set(s) => Some(s),
            Self::Unset => None,
        }
    }

    pub fn to_wire(&self) -> Option<String> {
        self.as_deref().map(str::to_string)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

/// Client-generated identity of a staged row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StagedId(String);

impl StagedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StagedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row identity: exactly one of persisted or staged.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowId {
    Persisted(String),
    Staged(StagedId),
}

impl RowId {
    pub fn is_staged(&self) -> bool {
        matches!(self, RowId::Staged(_))
    }

    /// Backend identity, for persisted rows only.
    pub fn persisted(&self) -> Option<&str> {
        match self {
            RowId::Persisted(id) => Some(id),
            RowId::Staged(_) => None,
        }
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::Persisted(id) => f.write_str(id),
            RowId::Staged(id) => Display::fmt(id, f),
        }
    }
}

/// Generator of staged identities: creation time in milliseconds plus a
/// per-millisecond sequence number.
#[derive(Debug, Default)]
pub struct StagedIdGen {
    last_millis: u128,
    seq: u64,
}

impl StagedIdGen {
    pub fn next_id(&mut self) -> StagedId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.next_at(now)
    }

    /// Generate an identity for the given clock reading. A clock that steps
    /// backwards is clamped to the last reading so identities never repeat.
    pub fn next_at(&mut self, millis: u128) -> StagedId {
        let millis = millis.max(self.last_millis);
        if millis == self.last_millis {
            self.seq += 1;
        } else {
            self.last_millis = millis;
            self.seq = 0;
        }
        StagedId(format!("{STAGED_PREFIX}{millis}_{}", self.seq))
    }
}

/// One table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: RowId,
    fields: BTreeMap<Field, CellValue>,
    /// Read-only membership as last loaded; empty for staged rows.
    pub members: Vec<Member>,
}

impl Row {
    /// A staged row with every field unset.
    pub fn staged(id: StagedId) -> Self {
        Self {
            id: RowId::Staged(id),
            fields: Field::ALL.iter().map(|f| (*f, CellValue::Unset)).collect(),
            members: Vec::new(),
        }
    }

    pub fn from_record(record: RoleRecord) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(Field::Identifier, CellValue::from_wire(Some(record.identifier.clone())));
        fields.insert(Field::FullName, CellValue::from_wire(record.full_name));
        fields.insert(Field::Group, CellValue::from_wire(record.group));
        fields.insert(Field::Subgroup, CellValue::from_wire(record.subgroup));
        fields.insert(Field::PassPhrase, CellValue::from_wire(record.pass_phrase));
        Self {
            id: RowId::Persisted(record.identifier),
            fields,
            members: record.members,
        }
    }

    pub fn value(&self, field: Field) -> &CellValue {
        self.fields.get(&field).unwrap_or(&UNSET)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &CellValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// Whether the row has any field assigned at all (unset counts).
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    fn set(&mut self, field: Field, value: CellValue) {
        self.fields.insert(field, value);
    }
}

/// Result of [`RowModel::remove_row`].
#[derive(Debug, PartialEq, Eq)]
pub enum Removal {
    /// Staged row dropped locally.
    Removed(Row),
    /// Persisted row; removal must go through the backend.
    RequiresServer(String),
    NotFound,
}

/// Ordered rows of the current session (order = display order = append order).
#[derive(Debug, Default)]
pub struct RowModel {
    rows: Vec<Row>,
    ids: StagedIdGen,
}

impl RowModel {
    pub fn from_records(records: Vec<RoleRecord>) -> Self {
        let mut model = Self::default();
        model.replace_with(records);
        model
    }

    /// Replace every row with authoritative server state. The staged id
    /// generator is kept so identities stay unique for the whole session.
    pub fn replace_with(&mut self, records: Vec<RoleRecord>) {
        self.rows = records.into_iter().map(Row::from_record).collect();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.get(id).is_some()
    }

    /// Append a fresh staged row and return it.
    pub fn add_staged_row(&mut self) -> &Row {
        let id = self.ids.next_id();
        tracing::debug!(row = %id, "staged new row");
        self.rows.push(Row::staged(id));
        &self.rows[self.rows.len() - 1]
    }

    pub fn remove_row(&mut self, id: &RowId) -> Removal {
        match id {
            RowId::Persisted(pid) => {
                if self.contains(id) {
                    Removal::RequiresServer(pid.clone())
                } else {
                    Removal::NotFound
                }
            }
            RowId::Staged(_) => match self.rows.iter().position(|r| &r.id == id) {
                Some(pos) => Removal::Removed(self.rows.remove(pos)),
                None => Removal::NotFound,
            },
        }
    }

    /// Store a committed value. Returns `false` if the row is gone.
    pub fn set_value(&mut self, id: &RowId, field: Field, value: CellValue) -> bool {
        match self.rows.iter_mut().find(|r| &r.id == id) {
            Some(row) => {
                row.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn staged_count(&self) -> usize {
        self.rows.iter().filter(|r| r.id.is_staged()).count()
    }

    /// Distinct group names present in the model, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .rows
            .iter()
            .filter_map(|r| r.value(Field::Group).as_deref().map(str::to_string))
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, group: Option<&str>) -> RoleRecord {
        RoleRecord {
            identifier: id.to_string(),
            full_name: Some(name.to_string()),
            group: group.map(str::to_string),
            subgroup: None,
            pass_phrase: Some(String::new()),
            members: Vec::new(),
        }
    }

    #[test]
    fn staged_ids_unique_within_same_millisecond() {
        let mut ids = StagedIdGen::default();
        let a = ids.next_at(1_700_000_000_000);
        let b = ids.next_at(1_700_000_000_000);
        let c = ids.next_at(1_700_000_000_000);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.as_str().starts_with(STAGED_PREFIX));
        // clock stepping back must not recycle an identity
        let d = ids.next_at(1_699_999_999_000);
        assert!(![&a, &b, &c].contains(&&d));
    }

    #[test]
    fn staged_id_never_looks_like_backend_id() {
        let mut ids = StagedIdGen::default();
        let id = ids.next_id();
        assert!(!id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn record_normalizes_empty_to_unset() {
        let row = Row::from_record(record("ops1", "Ops", None));
        assert_eq!(row.id, RowId::Persisted("ops1".into()));
        assert_eq!(row.value(Field::Identifier), &CellValue::Set("ops1".into()));
        assert!(row.value(Field::Group).is_unset());
        assert!(row.value(Field::PassPhrase).is_unset());
        assert_eq!(row.value(Field::Group).display(), UNSET_MARKER);
    }

    #[test]
    fn add_staged_row_appends_all_unset() {
        let mut model = RowModel::from_records(vec![record("a1", "A", None)]);
        let id = model.add_staged_row().id.clone();
        assert_eq!(model.len(), 2);
        assert_eq!(model.rows()[1].id, id);
        assert!(Field::ALL.iter().all(|f| model.rows()[1].value(*f).is_unset()));
        assert_eq!(model.staged_count(), 1);
    }

    #[test]
    fn remove_row_only_drops_staged_locally() {
        let mut model = RowModel::from_records(vec![record("a1", "A", None)]);
        let staged = model.add_staged_row().id.clone();

        let persisted = RowId::Persisted("a1".into());
        assert_eq!(model.remove_row(&persisted), Removal::RequiresServer("a1".into()));
        assert_eq!(model.len(), 2);

        assert!(matches!(model.remove_row(&staged), Removal::Removed(_)));
        assert_eq!(model.len(), 1);
        assert_eq!(model.remove_row(&staged), Removal::NotFound);
        assert_eq!(model.remove_row(&RowId::Persisted("zz".into())), Removal::NotFound);
    }

    #[test]
    fn replace_keeps_staged_ids_unique() {
        let mut model = RowModel::default();
        let first = model.add_staged_row().id.clone();
        model.replace_with(vec![record("a1", "A", None)]);
        let second = model.add_staged_row().id.clone();
        assert_ne!(first, second);
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn groups_are_sorted_and_distinct() {
        let model = RowModel::from_records(vec![
            record("a1", "A", Some("ops")),
            record("a2", "B", Some("dev")),
            record("a3", "C", Some("ops")),
            record("a4", "D", None),
        ]);
        assert_eq!(model.groups(), vec!["dev".to_string(), "ops".to_string()]);
    }

    #[test]
    fn field_navigation_saturates() {
        assert_eq!(Field::Identifier.prev(), Field::Identifier);
        assert_eq!(Field::Identifier.next(), Field::FullName);
        assert_eq!(Field::PassPhrase.next(), Field::PassPhrase);
    }
}
