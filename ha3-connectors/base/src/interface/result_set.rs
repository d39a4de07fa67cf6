use ha3_core::{
    data::{DataType, DataValue},
    err::Result,
};

/// A result set from an executed query
///
/// Cursors are forward-only.
pub trait ResultSet {
    /// Gets the row structure of the result set
    fn get_structure(&self) -> Result<RowStructure>;

    /// Advances to the next row, returning false once the rows are exhausted
    fn next_row(&mut self) -> Result<bool>;

    /// Reads the value of the column at the supplied (zero-based) index
    /// of the current row
    fn get_value(&mut self, idx: usize) -> Result<DataValue>;

    /// Reads all remaining rows
    fn read_rows(&mut self) -> Result<Vec<Vec<DataValue>>> {
        let cols = self.get_structure()?.cols.len();
        let mut rows = vec![];

        while self.next_row()? {
            rows.push(
                (0..cols)
                    .map(|idx| self.get_value(idx))
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        Ok(rows)
    }
}

/// The structure of a row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowStructure {
    /// The list of named columns in the row with their corrosponding data types
    pub cols: Vec<(String, DataType)>,
}

impl RowStructure {
    pub fn new(cols: Vec<(String, DataType)>) -> Self {
        Self { cols }
    }

    pub fn types(&self) -> Vec<DataType> {
        self.cols.iter().map(|i| i.1).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.cols.iter().map(|i| i.0.as_str()).collect()
    }
}
