use ha3_core::err::Result;

use super::Connection;

/// Compiles textual statements into a connector-specific query object
pub trait QueryCompiler {
    type TConnection: Connection;
    type TQuery;

    /// Convert the supplied SQL string into a query
    fn query_from_string(connection: &mut Self::TConnection, query: String)
        -> Result<Self::TQuery>;
}
