//! Column definitions and comparators.
//!
//! A [`Column`] describes how one grid column derives its cells from row
//! fields, how it sorts, and how it filters. Comparators are chosen from the
//! column type unless the caller overrides them.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// The kind of data a column displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    /// Plain text.
    #[default]
    Text,
    /// Email address, filtered like text.
    Email,
    /// Hyperlink, filtered like text.
    Link,
    /// Numeric value.
    Number,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Image source.
    Image,
    /// Icon name.
    Icon,
    /// Row action buttons; carries no data.
    Actions,
}

impl ColumnType {
    /// Whether cells of this type carry a parsed date.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime)
    }

    /// The filter applied to this type when the column does not name one.
    pub fn default_filter_type(self) -> Option<FilterType> {
        match self {
            Self::Text | Self::Email | Self::Link => Some(FilterType::Text),
            Self::Number => Some(FilterType::NumberRange),
            Self::Date | Self::Time | Self::DateTime => Some(FilterType::Exact),
            Self::Image | Self::Icon | Self::Actions => None,
        }
    }

    /// The cell component this type sorts by when the column does not name one.
    pub fn default_sort_key(self) -> CellKey {
        if self.is_temporal() {
            CellKey::Date
        } else {
            CellKey::Text
        }
    }
}

/// Sort direction of a column or a group level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// Natural order.
    #[default]
    None,
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Applies this direction to an ascending ordering.
    ///
    /// `None` yields `Equal` so stable sorts keep the natural order.
    pub fn apply(self, ascending: Ordering) -> Ordering {
        match self {
            Self::None => Ordering::Equal,
            Self::Asc => ascending,
            Self::Desc => ascending.reverse(),
        }
    }
}

/// Which component of a [`Cell`] a column sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellKey {
    /// The display text.
    #[default]
    Text,
    /// The parsed date.
    Date,
    /// The icon name.
    Icon,
    /// The image source.
    Src,
}

/// Predicate family used by the filter engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Case-insensitive AND of whitespace-separated terms.
    Text,
    /// Inclusive `"min,max"` numeric range.
    NumberRange,
    /// Exact match against the formatted text.
    Exact,
}

/// A comparable projection of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    /// The cell has no value for the sort key.
    Empty,
    /// Text value.
    Text(&'a str),
    /// Numeric value.
    Number(f64),
    /// Date value.
    Date(NaiveDateTime),
}

impl SortValue<'_> {
    fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

/// Type alias for a sort comparator over cell projections.
pub type CompareFn = Arc<dyn Fn(&SortValue<'_>, &SortValue<'_>) -> Ordering + Send + Sync>;

/// Compares two strings the way a locale-aware UI would for Latin text:
/// case-insensitively first, then by code point to keep the order total.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// The default ascending comparator. Empty values sort first.
pub fn compare_sort_values(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Empty, SortValue::Empty) => Ordering::Equal,
        (SortValue::Number(x), SortValue::Number(y)) => x.total_cmp(y),
        (SortValue::Date(x), SortValue::Date(y)) => x.cmp(y),
        (SortValue::Text(x), SortValue::Text(y)) => locale_compare(x, y),
        _ => a.rank().cmp(&b.rank()),
    }
}

/// A grid column definition.
#[derive(Clone)]
pub struct Column {
    /// Unique column id.
    pub id: String,
    /// Row field the cells derive from. Dotted paths reach into nested objects.
    pub field: String,
    /// Data type.
    pub column_type: ColumnType,
    /// Cell component used for sorting.
    pub sort_key: CellKey,
    /// Whether the user may sort by this column.
    pub can_sort: bool,
    /// Current sort direction. At most one column is not `None`.
    pub direction: SortDirection,
    /// Filter family; `None` means the column is never filtered.
    pub filter_type: Option<FilterType>,
    /// Current filter value; empty means inactive.
    pub filter_value: Option<String>,
    /// Custom ascending comparator.
    pub sort_asc: Option<CompareFn>,
    /// Custom descending comparator.
    pub sort_desc: Option<CompareFn>,
    /// `chrono` format overriding the configured one for temporal columns.
    pub format: Option<String>,
}

impl Column {
    /// Creates a column reading the field of the same name.
    pub fn new(id: impl Into<String>, column_type: ColumnType) -> Self {
        let id = id.into();
        Self {
            field: id.clone(),
            id,
            column_type,
            sort_key: column_type.default_sort_key(),
            can_sort: column_type != ColumnType::Actions,
            direction: SortDirection::None,
            filter_type: column_type.default_filter_type(),
            filter_value: None,
            sort_asc: None,
            sort_desc: None,
            format: None,
        }
    }

    /// Shorthand for a text column.
    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, ColumnType::Text)
    }

    /// Shorthand for a number column.
    pub fn number(id: impl Into<String>) -> Self {
        Self::new(id, ColumnType::Number)
    }

    /// Shorthand for a date column.
    pub fn date(id: impl Into<String>) -> Self {
        Self::new(id, ColumnType::Date)
    }

    /// Reads cells from a different row field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Sorts by a different cell component.
    pub fn with_sort_key(mut self, sort_key: CellKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Enables or disables sorting.
    pub fn sortable(mut self, can_sort: bool) -> Self {
        self.can_sort = can_sort;
        self
    }

    /// Overrides the filter family.
    pub fn with_filter_type(mut self, filter_type: Option<FilterType>) -> Self {
        self.filter_type = filter_type;
        self
    }

    /// Sets an initial filter value.
    pub fn with_filter_value(mut self, value: impl Into<String>) -> Self {
        self.filter_value = Some(value.into());
        self
    }

    /// Sets an initial sort direction.
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Overrides the temporal display format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Installs a custom ascending comparator.
    pub fn with_sort_asc<F>(mut self, compare: F) -> Self
    where
        F: Fn(&SortValue<'_>, &SortValue<'_>) -> Ordering + Send + Sync + 'static,
    {
        self.sort_asc = Some(Arc::new(compare));
        self
    }

    /// Installs a custom descending comparator.
    pub fn with_sort_desc<F>(mut self, compare: F) -> Self
    where
        F: Fn(&SortValue<'_>, &SortValue<'_>) -> Ordering + Send + Sync + 'static,
    {
        self.sort_desc = Some(Arc::new(compare));
        self
    }

    /// The filter value if one is set and non-empty.
    pub fn active_filter(&self) -> Option<&str> {
        self.filter_value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Projects a cell onto this column's sort key.
    pub fn sort_value<'a>(&self, cell: &'a Cell) -> SortValue<'a> {
        match self.sort_key {
            CellKey::Date => cell.date.map_or(SortValue::Empty, SortValue::Date),
            CellKey::Icon => cell.icon.as_deref().map_or(SortValue::Empty, SortValue::Text),
            CellKey::Src => cell.src.as_deref().map_or(SortValue::Empty, SortValue::Text),
            CellKey::Text => match cell.text.as_deref() {
                None | Some("") => SortValue::Empty,
                Some(text) if self.column_type == ColumnType::Number => text
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map_or(SortValue::Text(text), SortValue::Number),
                Some(text) => SortValue::Text(text),
            },
        }
    }

    /// Compares two cells of this column in `direction`.
    pub fn compare_cells(&self, a: &Cell, b: &Cell, direction: SortDirection) -> Ordering {
        let (a, b) = (self.sort_value(a), self.sort_value(b));
        match direction {
            SortDirection::None => Ordering::Equal,
            SortDirection::Asc => match &self.sort_asc {
                Some(compare) => compare(&a, &b),
                None => compare_sort_values(&a, &b),
            },
            SortDirection::Desc => match (&self.sort_desc, &self.sort_asc) {
                (Some(compare), _) => compare(&a, &b),
                (None, Some(compare)) => compare(&a, &b).reverse(),
                (None, None) => compare_sort_values(&a, &b).reverse(),
            },
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("column_type", &self.column_type)
            .field("sort_key", &self.sort_key)
            .field("can_sort", &self.can_sort)
            .field("direction", &self.direction)
            .field("filter_type", &self.filter_type)
            .field("filter_value", &self.filter_value)
            .field("custom_sort", &(self.sort_asc.is_some() || self.sort_desc.is_some()))
            .finish()
    }
}
