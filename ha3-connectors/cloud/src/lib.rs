mod client;
use ha3_connectors_base::interface::{ConnectionPool, Connector};
use ha3_core::{config, err::Result};
pub use client::*;
mod conf;
pub use conf::*;
mod connection;
pub use connection::*;
mod data;
pub use data::*;
mod dynamic_params;
pub use dynamic_params::*;
mod kv_pair;
pub use kv_pair::*;
mod mutation;
pub use mutation::*;
mod parameterizer;
pub use parameterizer::*;
mod pool;
pub use pool::*;
mod query;
pub use query::*;
mod query_compiler;
pub use query_compiler::*;
mod result_set;
pub use result_set::*;
mod scanner;
pub use scanner::*;

/// The connector for HA3 search engine instances, speaking the engine's SQL dialect over http
#[derive(Default)]
pub struct Ha3Connector;

impl Connector for Ha3Connector {
    type TConnectionConfig = Ha3ConnectionConfig;
    type TConnectionPool = Ha3ConnectionPool;
    type TConnection = Ha3Connection;
    type TQueryCompiler = Ha3QueryCompiler;
    type TQueryHandle = Ha3PreparedQuery;
    type TQuery = Ha3Query;
    type TResultSet = Ha3ResultSet;

    const TYPE: &'static str = "ha3.cloud";

    fn parse_options(options: config::Value) -> Result<Self::TConnectionConfig> {
        Ha3ConnectionConfig::parse(options)
    }

    fn create_connection_pool(options: Ha3ConnectionConfig) -> Result<Self::TConnectionPool> {
        Ok(Ha3ConnectionPool::new(options))
    }
}

impl Ha3Connector {
    /// Connects to an HA3 instance through the process wide client registry
    pub fn connect(config: Ha3ConnectionConfig) -> Result<<Self as Connector>::TConnection> {
        Ha3Connector::create_connection_pool(config)?.acquire()
    }

    /// Connects using a `jdbc:ha3://` connection string and properties
    pub fn connect_url(
        url: &str,
        props: &std::collections::HashMap<String, String>,
    ) -> Result<<Self as Connector>::TConnection> {
        Self::connect(Ha3ConnectionConfig::from_url(url, props)?)
    }
}
