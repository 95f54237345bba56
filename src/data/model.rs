use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SelectError};

use super::columns;

// ---------------------------------------------------------------------------
// Value – a single cell of a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, used for star identifiers and the components
/// of 2-D columns.
/// Collected into `BTreeSet` for distinct-ID counts, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnData – one named column of the survey
// ---------------------------------------------------------------------------

/// A full column as read from a data source. One entry per star.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Integer(Vec<i64>),
    Text(Vec<String>),
    /// 2-D column: one fixed-width row per star, e.g. `IDs` stored as
    /// `(APOGEE_ID, location)` pairs.
    Rows(Vec<Vec<Value>>),
}

impl ColumnData {
    /// Number of stars (rows) in the column.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Rows(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the element type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnData::Float(_) => "float",
            ColumnData::Integer(_) => "integer",
            ColumnData::Text(_) => "text",
            ColumnData::Rows(_) => "2-D",
        }
    }

    /// Numeric view of the column. Integers are promoted to `f64`.
    pub fn to_f64(&self, name: &str) -> Result<Vec<f64>> {
        match self {
            ColumnData::Float(v) => Ok(v.clone()),
            ColumnData::Integer(v) => Ok(v.iter().map(|&i| i as f64).collect()),
            other => Err(SelectError::NotNumeric {
                column: name.to_string(),
                kind: other.kind(),
            }),
        }
    }

    /// Select component `index` of every row of a 2-D column.
    ///
    /// A 1-D column has a single component, so index 0 returns its values.
    /// Rows shorter than `index + 1` yield [`Value::Null`].
    pub fn sub_column(&self, index: usize) -> Vec<Value> {
        match self {
            ColumnData::Rows(rows) => rows
                .iter()
                .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
                .collect(),
            _ if index > 0 => vec![Value::Null; self.len()],
            ColumnData::Float(v) => v.iter().map(|&f| Value::Float(f)).collect(),
            ColumnData::Integer(v) => v.iter().map(|&i| Value::Integer(i)).collect(),
            ColumnData::Text(v) => v.iter().map(|s| Value::String(s.clone())).collect(),
        }
    }

    /// Single cell of the column rendered as a [`Value`].
    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            ColumnData::Float(v) => v.get(row).map(|&f| Value::Float(f)),
            ColumnData::Integer(v) => v.get(row).map(|&i| Value::Integer(i)),
            ColumnData::Text(v) => v.get(row).map(|s| Value::String(s.clone())),
            ColumnData::Rows(v) => v.get(row).map(|r| {
                Value::String(
                    r.iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(";"),
                )
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultBundle – output of a selection run
// ---------------------------------------------------------------------------

/// Star identifiers, every selection column in full, and the positions of
/// the stars that survived all cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle {
    /// First component of the `IDs` column, one per star.
    pub ids: Vec<Value>,
    /// Raw, unfiltered columns keyed by name.
    pub columns: BTreeMap<String, ColumnData>,
    /// Strictly increasing row positions passing every cut.
    pub indices: Vec<usize>,
}

impl ResultBundle {
    /// Number of stars loaded.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn selected_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of distinct identifiers among all loaded stars.
    pub fn distinct_ids(&self) -> usize {
        self.ids.iter().collect::<BTreeSet<_>>().len()
    }

    /// Identifiers of the selected stars, in index order.
    pub fn selected_ids(&self) -> Result<Vec<&Value>> {
        self.indices
            .iter()
            .map(|&i| {
                self.ids
                    .get(i)
                    .ok_or_else(|| out_of_range(columns::IDS, i, self.ids.len()))
            })
            .collect()
    }

    /// Training labels of the selected stars: one row per selected star,
    /// one value per entry of [`columns::params`], in that order.
    pub fn labels(&self) -> Result<Vec<Vec<f64>>> {
        let params = columns::PARAMS
            .iter()
            .map(|&name| {
                self.columns
                    .get(name)
                    .ok_or_else(|| SelectError::MissingColumn(name.to_string()))?
                    .to_f64(name)
            })
            .collect::<Result<Vec<_>>>()?;

        self.indices
            .iter()
            .map(|&i| {
                params
                    .iter()
                    .zip(columns::PARAMS)
                    .map(|(col, name)| {
                        col.get(i)
                            .copied()
                            .ok_or_else(|| out_of_range(name, i, col.len()))
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect()
    }
}

fn out_of_range(column: &str, index: usize, len: usize) -> SelectError {
    SelectError::RowOutOfRange {
        column: column.to_string(),
        index,
        len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_column_selects_first_component() {
        let ids = ColumnData::Rows(vec![
            vec![Value::String("2M001".into()), Value::Integer(4102)],
            vec![Value::String("2M002".into()), Value::Integer(4102)],
        ]);
        assert_eq!(
            ids.sub_column(0),
            vec![Value::String("2M001".into()), Value::String("2M002".into())]
        );
        assert_eq!(ids.sub_column(1), vec![Value::Integer(4102); 2]);
        assert_eq!(ids.sub_column(2), vec![Value::Null; 2]);
    }

    #[test]
    fn one_dimensional_column_is_its_own_first_component() {
        let ids = ColumnData::Text(vec!["a".into(), "b".into()]);
        assert_eq!(
            ids.sub_column(0),
            vec![Value::String("a".into()), Value::String("b".into())]
        );
        assert_eq!(ids.sub_column(1), vec![Value::Null; 2]);
    }

    #[test]
    fn integers_promote_to_float() {
        let col = ColumnData::Integer(vec![0, 1, -3]);
        assert_eq!(col.to_f64("star_flag").unwrap(), vec![0.0, 1.0, -3.0]);
    }

    #[test]
    fn text_is_not_numeric() {
        let col = ColumnData::Text(vec!["x".into()]);
        assert_eq!(
            col.to_f64("TEFF"),
            Err(SelectError::NotNumeric {
                column: "TEFF".into(),
                kind: "text"
            })
        );
    }

    #[test]
    fn distinct_ids_ignores_duplicates() {
        let bundle = ResultBundle {
            ids: vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("a".into()),
            ],
            columns: BTreeMap::new(),
            indices: vec![0, 2],
        };
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.distinct_ids(), 2);
        assert_eq!(
            bundle.selected_ids().unwrap(),
            vec![&Value::String("a".into()), &Value::String("a".into())]
        );
    }

    #[test]
    fn hand_built_bundle_with_short_columns_errors() {
        let mut cols: BTreeMap<String, ColumnData> = columns::PARAMS
            .iter()
            .map(|&name| (name.to_string(), ColumnData::Float(vec![4500.0, 4600.0])))
            .collect();
        cols.insert(columns::N_FE.to_string(), ColumnData::Float(vec![0.1]));
        let bundle = ResultBundle {
            ids: vec![Value::Integer(1)],
            columns: cols,
            indices: vec![1],
        };

        assert_eq!(
            bundle.selected_ids(),
            Err(SelectError::RowOutOfRange {
                column: "IDs".into(),
                index: 1,
                len: 1,
            })
        );
        assert_eq!(
            bundle.labels(),
            Err(SelectError::RowOutOfRange {
                column: "N_FE".into(),
                index: 1,
                len: 1,
            })
        );
    }

    #[test]
    fn value_ordering_is_total_for_floats() {
        let mut set = BTreeSet::new();
        set.insert(Value::Float(f64::NAN));
        set.insert(Value::Float(f64::NAN));
        set.insert(Value::Float(1.0));
        assert_eq!(set.len(), 2);
    }
}
