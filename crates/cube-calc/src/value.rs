use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

/// A scalar cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Datum::Number(n) => Some(*n),
            Datum::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// MDX truthiness: a boolean is itself, a number is non-zero, anything
    /// else (including null) is false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Datum::Bool(b) => *b,
            Datum::Number(n) => *n != 0.0,
            _ => false,
        }
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Number(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Number(value as f64)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Number(n) => write!(f, "{n}"),
            Datum::Text(s) => f.write_str(s),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Null => f.write_str(""),
        }
    }
}

/// A per-cell evaluation error. Cell errors are values, not aborts: a grid
/// query still renders its other cells.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("no aggregator in context")]
    NoAggregator,

    #[error("level not found: {0}")]
    UnknownLevel(String),

    #[error("member not found: {0}")]
    UnknownMember(String),

    #[error("cell evaluation failed: {0}")]
    Storage(String),
}

/// Outcome of evaluating one cell.
///
/// `Pending` means the storage layer has not cached the value yet; it is a
/// normal, frequent control-flow outcome, not an error. Combinators scan past
/// it and the caller re-drives evaluation once the cache is populated.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Ready(Datum),
    Pending,
    Error(CellError),
}

impl CellValue {
    pub fn is_pending(&self) -> bool {
        matches!(self, CellValue::Pending)
    }

    /// A concrete, non-null value — the test used by non-empty pruning.
    pub fn is_ready_non_null(&self) -> bool {
        matches!(self, CellValue::Ready(d) if !d.is_null())
    }
}

impl From<Datum> for CellValue {
    fn from(value: Datum) -> Self {
        CellValue::Ready(value)
    }
}

/// A sort key derived from a [`CellValue`].
///
/// Concrete values order as number < text < bool; null, error and pending
/// keys sort after every concrete value regardless of sort direction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SortKey {
    Number(OrderedFloat<f64>),
    Text(String),
    Bool(bool),
    Null,
    Error,
    Pending,
}

impl SortKey {
    pub fn of(value: &CellValue) -> Self {
        match value {
            CellValue::Ready(Datum::Number(n)) => SortKey::Number(OrderedFloat(*n)),
            CellValue::Ready(Datum::Text(s)) => SortKey::Text(s.clone()),
            CellValue::Ready(Datum::Bool(b)) => SortKey::Bool(*b),
            CellValue::Ready(Datum::Null) => SortKey::Null,
            CellValue::Error(_) => SortKey::Error,
            CellValue::Pending => SortKey::Pending,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, SortKey::Number(_) | SortKey::Text(_) | SortKey::Bool(_))
    }

    fn class(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Text(_) => 1,
            SortKey::Bool(_) => 2,
            SortKey::Null => 3,
            SortKey::Error => 4,
            SortKey::Pending => 5,
        }
    }

    /// Compares two keys for the given direction. Non-concrete keys stay last
    /// in both directions.
    pub fn compare(&self, other: &Self, descending: bool) -> Ordering {
        match (self.is_concrete(), other.is_concrete()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => return self.class().cmp(&other.class()),
            (true, true) => {}
        }
        let natural = match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            _ => self.class().cmp(&other.class()),
        };
        if descending {
            natural.reverse()
        } else {
            natural
        }
    }
}
