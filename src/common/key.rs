use std::fmt;

use arrow::array::ArrayRef;
use arrow::datatypes::Field;
use datafusion::scalar::ScalarValue;

use crate::common::error::Result;
use crate::interval::{Bounds, Time};

pub const DEFAULT_TIME_COLUMN: &str = "_time";
pub const DEFAULT_START_COLUMN: &str = "_start";
pub const DEFAULT_STOP_COLUMN: &str = "_stop";
pub const DEFAULT_VALUE_COLUMN: &str = "_value";

pub fn time_scalar(t: Time) -> ScalarValue {
    ScalarValue::TimestampNanosecond(Some(t), None)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyColumn {
    pub name: String,
    pub value: ScalarValue,
}

/// Ordered column bindings identifying one logical sub-stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GroupKey {
    columns: Vec<KeyColumn>,
}

impl GroupKey {
    pub fn new(columns: Vec<(String, ScalarValue)>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, value)| KeyColumn { name, value })
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[KeyColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_col(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&ScalarValue> {
        self.index_of(name).map(|i| &self.columns[i].value)
    }

    /// Overwrites the binding for `name`, appending it if absent.
    pub fn with_value(mut self, name: &str, value: ScalarValue) -> Self {
        match self.index_of(name) {
            Some(i) => self.columns[i].value = value,
            None => self.columns.push(KeyColumn { name: name.to_string(), value }),
        }
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.columns.retain(|c| c.name != name);
        self
    }

    /// Binds the start/stop columns to `bounds`, leaving the key untouched when it already matches.
    pub fn with_bounds(self, start_col: &str, stop_col: &str, bounds: &Bounds) -> Self {
        let start = time_scalar(bounds.start);
        let stop = time_scalar(bounds.stop);
        if self.value(start_col) == Some(&start) && self.value(stop_col) == Some(&stop) {
            return self;
        }
        self.with_value(start_col, start).with_value(stop_col, stop)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|c| Field::new(&c.name, c.value.data_type(), true))
            .collect()
    }

    /// Key values broadcast to `num_rows` rows, in key order.
    pub fn to_arrays(&self, num_rows: usize) -> Result<Vec<ArrayRef>> {
        let mut arrays = Vec::with_capacity(self.columns.len());
        for c in &self.columns {
            arrays.push(c.value.to_array_of_size(num_rows)?);
        }
        Ok(arrays)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", c.name, c.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray, TimestampNanosecondArray};
    use std::collections::HashSet;

    fn host_key(host: &str) -> GroupKey {
        GroupKey::new(vec![("host".to_string(), ScalarValue::Utf8(Some(host.to_string())))])
    }

    #[test]
    fn test_with_bounds_appends_then_overwrites() {
        let key = host_key("a").with_bounds("_start", "_stop", &Bounds::new(0, 10));
        assert_eq!(key.len(), 3);
        assert_eq!(key.value("_start"), Some(&time_scalar(0)));
        assert_eq!(key.value("_stop"), Some(&time_scalar(10)));

        let key = key.with_bounds("_start", "_stop", &Bounds::new(5, 20));
        assert_eq!(key.len(), 3);
        assert_eq!(key.columns()[1].name, "_start");
        assert_eq!(key.value("_start"), Some(&time_scalar(5)));
        assert_eq!(key.value("_stop"), Some(&time_scalar(20)));
    }

    #[test]
    fn test_key_hash_eq() {
        let mut keys = HashSet::new();
        keys.insert(host_key("a"));
        keys.insert(host_key("a"));
        keys.insert(host_key("b"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_to_arrays() {
        let key = host_key("a").with_bounds("_start", "_stop", &Bounds::new(1, 2));
        let arrays = key.to_arrays(3).unwrap();
        assert_eq!(arrays.len(), 3);
        let hosts = arrays[0].as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts.value(2), "a");
        let stops = arrays[2].as_any().downcast_ref::<TimestampNanosecondArray>().unwrap();
        assert_eq!(stops.value(0), 2);
        assert_eq!(key.to_string(), format!("{{host=a,_start={},_stop={}}}", time_scalar(1), time_scalar(2)));
    }
}
