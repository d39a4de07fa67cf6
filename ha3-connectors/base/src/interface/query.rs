use std::{collections::HashMap, fmt};

use ha3_core::{
    data::{DataType, DataValue},
    err::Result,
};
use serde::{Deserialize, Serialize};

use super::ResultSet;

/// A query which is ready to be executed
pub trait QueryHandle {
    type TResultSet: ResultSet;

    /// Gets the types of the input expected by the query
    fn get_structure(&self) -> Result<QueryInputStructure>;

    /// Writes the next query parameter to the query
    fn write(&mut self, val: DataValue) -> Result<()>;

    /// Restarts the query, so new query parameters can be written
    fn restart(&mut self) -> Result<()>;

    /// Executes the query, returning the generated result set
    fn execute_query(&mut self) -> Result<Self::TResultSet>;

    /// Executes the query, returning the number of affected rows, if known
    fn execute_modify(&mut self) -> Result<Option<u64>>;

    /// Returns a loggable representation of the query
    fn logged(&self) -> Result<LoggedQuery>;
}

/// The structure of data expected by a query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryInputStructure {
    /// The list of query parameter ids and their associated data types
    ///
    /// The parameters are to be written to the query in the order they appear in the vector.
    pub params: Vec<(u32, DataType)>,
}

impl QueryInputStructure {
    pub fn new(params: Vec<(u32, DataType)>) -> Self {
        Self { params }
    }

    pub fn types(&self) -> Vec<DataType> {
        self.params.iter().map(|(_, t)| *t).collect()
    }
}

/// A string representation of a query, used mainly for logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedQuery {
    query: String,
    params: Vec<String>,
    other: HashMap<String, String>,
}

impl LoggedQuery {
    pub fn new(
        query: impl Into<String>,
        params: Vec<String>,
        other: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            query: query.into(),
            params,
            other: other.unwrap_or_default(),
        }
    }

    pub fn new_query(query: impl Into<String>) -> Self {
        Self::new(query, vec![], None)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn params(&self) -> &Vec<String> {
        &self.params
    }

    pub fn other(&self) -> &HashMap<String, String> {
        &self.other
    }

    pub fn other_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.other
    }
}

impl fmt::Display for LoggedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)?;

        if !self.params.is_empty() {
            write!(f, " params: [{}]", self.params.join(", "))?;
        }

        let mut other = self.other.iter().collect::<Vec<_>>();
        other.sort();
        for (key, val) in other {
            write!(f, " {}: {}", key, val)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_logged_query_display() {
        let mut logged = LoggedQuery::new("SELECT * FROM t WHERE id = ?", vec!["5".into()], None);
        logged.other_mut().insert("table".into(), "t".into());

        assert_eq!(
            logged.to_string(),
            "SELECT * FROM t WHERE id = ? params: [5] table: t"
        );
    }

    #[test]
    fn test_logged_query_plain() {
        assert_eq!(LoggedQuery::new_query("SELECT 1").to_string(), "SELECT 1");
    }
}
