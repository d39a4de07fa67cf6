use std::sync::Arc;

use ha3_connectors_base::interface::{Connection, QueryCompiler, QueryHandle};
use ha3_core::{
    data::DataValue,
    err::{bail, Context, Result},
};
use ha3_logging::info;

use crate::{
    Ha3Client, Ha3ClientLease, Ha3ConnectionConfig, Ha3PreparedQuery, Ha3Query, Ha3QueryCompiler,
    Ha3ResultSet, StatementType,
};

/// A connection to an engine instance, backed by a shared client
pub struct Ha3Connection {
    conf: Ha3ConnectionConfig,
    lease: Option<Ha3ClientLease>,
    /// Table read by the last query
    schema: Option<String>,
}

impl Ha3Connection {
    pub fn new(conf: Ha3ConnectionConfig, lease: Ha3ClientLease) -> Self {
        Self {
            conf,
            lease: Some(lease),
            schema: None,
        }
    }

    pub fn conf(&self) -> &Ha3ConnectionConfig {
        &self.conf
    }

    pub fn is_closed(&self) -> bool {
        self.lease.is_none()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub(crate) fn set_schema(&mut self, table: impl Into<String>) {
        self.schema = Some(table.into());
    }

    fn client(&self) -> Result<Arc<Ha3Client>> {
        match &self.lease {
            Some(lease) => Ok(Arc::clone(lease.client())),
            None => bail!("Connection is closed"),
        }
    }

    /// Compiles the statement against this connection
    pub fn prepare_sql(&mut self, sql: impl Into<String>) -> Result<Ha3PreparedQuery> {
        let sql = sql.into();
        if self.is_closed() {
            bail!("Connection is closed");
        }

        let query = Ha3QueryCompiler::query_from_string(self, sql.clone())
            .with_context(|| format!("Failed to compile query: {}", sql))?;

        if self.conf.enable_detail_log {
            info!("Compiled query {:?}", query);
        }

        self.prepare(query)
    }

    /// Runs a SELECT
    pub fn execute_query(&mut self, sql: impl Into<String>) -> Result<Ha3ResultSet> {
        self.execute_prepared_query(sql, vec![])
    }

    /// Runs a SELECT with values bound to its `?` placeholders in order
    pub fn execute_prepared_query(
        &mut self,
        sql: impl Into<String>,
        params: Vec<DataValue>,
    ) -> Result<Ha3ResultSet> {
        let mut query = self.prepare_sql(sql)?;

        for param in params.into_iter() {
            query.write(param)?;
        }

        query.execute_query()
    }

    /// Runs an INSERT or DELETE, returning the number of written documents
    pub fn execute_update(&mut self, sql: impl Into<String>) -> Result<u64> {
        let sql = sql.into();
        let kind = StatementType::classify(&sql)?;
        if !kind.is_write() {
            return Err(StatementType::unsupported(kind.as_char()));
        }

        let mut query = self.prepare_sql(sql)?;

        Ok(query.execute_modify()?.unwrap_or_default())
    }
}

impl Connection for Ha3Connection {
    type TQuery = Ha3Query;
    type TQueryHandle = Ha3PreparedQuery;

    fn prepare(&mut self, query: Ha3Query) -> Result<Ha3PreparedQuery> {
        Ok(Ha3PreparedQuery::new(
            self.client()?,
            query,
            self.conf.enable_detail_log,
        ))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(lease) = self.lease.take() {
            if self.conf.enable_detail_log {
                info!("Closing connection");
            }
            drop(lease);
        }

        Ok(())
    }
}
