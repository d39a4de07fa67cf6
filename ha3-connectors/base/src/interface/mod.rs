mod query;
pub use query::*;
mod query_compiler;
pub use query_compiler::*;
mod result_set;
pub use result_set::*;

use ha3_core::{config, err::Result};

/// A connector to a remote search service
pub trait Connector {
    type TConnectionConfig: Clone + Send + 'static;
    type TConnectionPool: ConnectionPool<TConnection = Self::TConnection>;
    type TConnection: Connection<TQuery = Self::TQuery, TQueryHandle = Self::TQueryHandle>;
    type TQueryCompiler: QueryCompiler<TConnection = Self::TConnection, TQuery = Self::TQuery>;
    type TQueryHandle: QueryHandle<TResultSet = Self::TResultSet>;
    type TQuery;
    type TResultSet: ResultSet;

    /// The type of the connector, usually the name of the target platform
    const TYPE: &'static str;

    /// Parses the supplied configuration yaml into the strongly typed Options
    fn parse_options(options: config::Value) -> Result<Self::TConnectionConfig>;

    /// Gets a connection pool instance
    fn create_connection_pool(options: Self::TConnectionConfig) -> Result<Self::TConnectionPool>;
}

/// Opens connections to the target service
pub trait ConnectionPool: Clone + Sized + Send + 'static {
    type TConnection: Connection;

    /// Acquires a connection to the target service
    fn acquire(&mut self) -> Result<Self::TConnection>;
}

/// An open connection to the target service
pub trait Connection: Sized {
    type TQuery;
    type TQueryHandle: QueryHandle;

    /// Prepares the supplied query
    fn prepare(&mut self, query: Self::TQuery) -> Result<Self::TQueryHandle>;

    /// Releases the resources held by the connection.
    /// Closing an already closed connection has no effect.
    fn close(&mut self) -> Result<()>;
}
