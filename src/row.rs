use std::sync::Arc;

use bytes::Bytes;
use hashbrown::HashMap;

use crate::column::MySqlColumn;
use crate::error::{Error, Result};
use crate::value::{MySqlScalar, MySqlValueFormat, MySqlValueRef};

/// A single row of a result set.
///
/// Cells are raw wire bytes until a typed accessor is invoked; see
/// [`MySqlValueRef`] for the permitted conversions.
#[derive(Debug, Clone)]
pub struct MySqlRow {
    pub(crate) values: Vec<Option<Bytes>>,
    pub(crate) format: MySqlValueFormat,
    pub(crate) columns: Arc<Vec<MySqlColumn>>,

    // keyed by the lower-cased column name; lookups are case-insensitive
    pub(crate) column_names: Arc<HashMap<String, usize>>,
}

impl MySqlRow {
    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The columns of the owning result set.
    #[must_use]
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    /// Borrow the raw cell at `index`: a zero-based position or a
    /// case-insensitive column name.
    pub fn try_get(&self, index: impl ColumnIndex) -> Result<MySqlValueRef<'_>> {
        let index = index.index(self)?;

        Ok(MySqlValueRef {
            value: self.values[index].as_ref(),
            format: self.format,
            type_info: self.columns[index].type_info(),
        })
    }

    /// Read the cell at `index` as a UTF-8 string.
    pub fn get_str(&self, index: impl ColumnIndex) -> Result<&str> {
        self.try_get(index)?.as_str()
    }

    /// Read the cell at `index` as raw bytes; `None` for SQL `NULL`.
    pub fn get_bytes(&self, index: impl ColumnIndex) -> Result<Option<&[u8]>> {
        Ok(self.try_get(index)?.as_bytes())
    }

    /// Read the cell at `index` as a signed integer.
    pub fn get_i64(&self, index: impl ColumnIndex) -> Result<i64> {
        self.try_get(index)?.as_i64()
    }

    /// Read the cell at `index` as an unsigned integer.
    pub fn get_u64(&self, index: impl ColumnIndex) -> Result<u64> {
        self.try_get(index)?.as_u64()
    }

    /// Read the cell at `index` as a double.
    pub fn get_f64(&self, index: impl ColumnIndex) -> Result<f64> {
        self.try_get(index)?.as_f64()
    }

    /// Read the cell at `index` as a boolean (`TINYINT(1)` only).
    pub fn get_bool(&self, index: impl ColumnIndex) -> Result<bool> {
        self.try_get(index)?.as_bool()
    }

    /// Read the cell at `index` as a date-time; `None` for the zero date.
    pub fn get_datetime(&self, index: impl ColumnIndex) -> Result<Option<chrono::NaiveDateTime>> {
        self.try_get(index)?.as_datetime()
    }

    /// The raw string-or-bytes mapping of the row, keyed by column name.
    ///
    /// Textual cells become strings, opaque cells stay bytes, `NULL` stays
    /// `NULL`. For typed values use [`typed_assoc`](Self::typed_assoc).
    #[must_use]
    pub fn assoc(&self) -> HashMap<String, MySqlScalar> {
        self.columns
            .iter()
            .map(|column| {
                let value = match self.try_get(column.ordinal()) {
                    Ok(v) if v.is_null() => MySqlScalar::Null,
                    Ok(v) => match v.as_str() {
                        Ok(s) => MySqlScalar::String(s.to_owned()),
                        Err(_) => MySqlScalar::Bytes(v.as_bytes().unwrap_or_default().to_vec()),
                    },
                    Err(_) => MySqlScalar::Null,
                };

                (column.name().to_owned(), value)
            })
            .collect()
    }

    /// The best-native-type mapping of the row, keyed by column name.
    pub fn typed_assoc(&self) -> Result<HashMap<String, MySqlScalar>> {
        self.columns
            .iter()
            .map(|column| {
                Ok((
                    column.name().to_owned(),
                    self.try_get(column.ordinal())?.to_scalar()?,
                ))
            })
            .collect()
    }
}

/// A zero-based column position or a case-insensitive column name.
pub trait ColumnIndex {
    fn index(&self, row: &MySqlRow) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn index(&self, row: &MySqlRow) -> Result<usize> {
        if *self >= row.len() {
            return Err(Error::ColumnIndexOutOfBounds {
                index: *self,
                len: row.len(),
            });
        }

        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn index(&self, row: &MySqlRow) -> Result<usize> {
        row.column_names
            .get(&self.to_lowercase())
            .copied()
            .ok_or_else(|| Error::ColumnNotFound((*self).to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use hashbrown::HashMap;

    use super::MySqlRow;
    use crate::column::MySqlColumn;
    use crate::protocol::text::{ColumnFlags, ColumnType};
    use crate::type_info::MySqlTypeInfo;
    use crate::value::{MySqlScalar, MySqlValueFormat};

    fn sample_row() -> MySqlRow {
        let columns = vec![
            MySqlColumn::new(
                0,
                "id".into(),
                MySqlTypeInfo::new(ColumnType::Long, 63, ColumnFlags::empty(), 11),
            ),
            MySqlColumn::new(
                1,
                "Name".into(),
                MySqlTypeInfo::new(ColumnType::VarString, 45, ColumnFlags::empty(), 255),
            ),
        ];

        let column_names: HashMap<String, usize> = columns
            .iter()
            .map(|c| (c.name().to_lowercase(), c.ordinal()))
            .collect();

        MySqlRow {
            values: vec![
                Some(Bytes::from_static(b"7")),
                Some(Bytes::from_static(b"ada")),
            ],
            format: MySqlValueFormat::Text,
            columns: Arc::new(columns),
            column_names: Arc::new(column_names),
        }
    }

    #[test]
    fn test_positional_and_named_access() {
        let row = sample_row();

        assert_eq!(row.get_i64(0).unwrap(), 7);
        assert_eq!(row.get_str("name").unwrap(), "ada");

        // named access is case-insensitive
        assert_eq!(row.get_str("NAME").unwrap(), "ada");
        assert_eq!(row.get_str("Name").unwrap(), "ada");
    }

    #[test]
    fn test_unknown_column() {
        let row = sample_row();

        assert!(matches!(
            row.get_str("missing"),
            Err(crate::Error::ColumnNotFound(name)) if name == "missing"
        ));

        assert!(matches!(
            row.get_str(9),
            Err(crate::Error::ColumnIndexOutOfBounds { index: 9, len: 2 })
        ));
    }

    #[test]
    fn test_assoc_and_typed_assoc() {
        let row = sample_row();

        let raw = row.assoc();
        assert_eq!(raw["id"], MySqlScalar::String("7".into()));
        assert_eq!(raw["Name"], MySqlScalar::String("ada".into()));

        let typed = row.typed_assoc().unwrap();
        assert_eq!(typed["id"], MySqlScalar::Int(7));
        assert_eq!(typed["Name"], MySqlScalar::String("ada".into()));
    }
}
