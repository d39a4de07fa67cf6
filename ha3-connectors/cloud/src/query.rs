use std::{collections::HashMap, sync::Arc, time::Instant};

use ha3_connectors_base::{
    common::{data::QueryParamSink, query::QueryParam},
    interface::{LoggedQuery, QueryHandle, QueryInputStructure},
};
use ha3_core::{
    data::DataValue,
    err::{bail, DriverError, Result},
};
use ha3_logging::{info, MaxLogLength};

use crate::{
    encode_inline, encode_json_payload, Ha3Client, Ha3ResultSet, Ha3WriteQuery, StatementType,
    WriteCmd, DYNAMIC_PARAMS_KEY, DYNAMIC_PARAMS_MARKER, KVPAIR_SEPARATOR, URLENCODE_DATA_KEY,
};

const MAX_LOGGED_SQL_LEN: usize = 2048;

/// A compiled statement
#[derive(Debug, Clone, PartialEq)]
pub enum Ha3Query {
    Select(Ha3SelectQuery),
    Write(Ha3WriteQuery),
}

impl Ha3Query {
    pub fn statement_type(&self) -> StatementType {
        match self {
            Ha3Query::Select(_) => StatementType::Select,
            Ha3Query::Write(write) => match write.commands.first().map(|c| c.cmd) {
                Some(WriteCmd::Delete) => StatementType::Delete,
                _ => StatementType::Insert,
            },
        }
    }

    fn params(&self) -> Vec<QueryParam> {
        match self {
            Ha3Query::Select(select) => select.params.clone(),
            Ha3Query::Write(_) => vec![],
        }
    }
}

/// A SELECT ready to be sent to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Ha3SelectQuery {
    pub sql: String,
    /// Directives attached to the statement, none when the text already carries its own
    pub kv_pairs: Option<String>,
    /// Constants lifted out of the text, or the caller bound `?` placeholders
    pub params: Vec<QueryParam>,
}

impl Ha3SelectQuery {
    pub fn new(sql: impl Into<String>, kv_pairs: Option<String>, params: Vec<QueryParam>) -> Self {
        Self {
            sql: sql.into(),
            kv_pairs,
            params,
        }
    }

    /// Renders the statement text sent to the engine with the parameter values
    /// attached to the directives
    pub fn render(&self, values: &[DataValue]) -> Result<String> {
        if self.kv_pairs.is_none() && values.is_empty() {
            return Ok(self.sql.clone());
        }

        let mut kv_pairs = self.kv_pairs.clone().unwrap_or_default();

        if kv_pairs.contains(DYNAMIC_PARAMS_MARKER) {
            if values.is_empty() {
                bail!("Dynamic params were requested but no values were supplied");
            }

            let payload = encode_json_payload(values, kv_pairs.contains(URLENCODE_DATA_KEY))?;
            kv_pairs = kv_pairs.replace(
                DYNAMIC_PARAMS_MARKER,
                &format!("{}:{}", DYNAMIC_PARAMS_KEY, payload),
            );
        } else if !values.is_empty() {
            if !kv_pairs.is_empty() {
                kv_pairs.push(';');
            }
            kv_pairs.push_str(&format!("{}:{}", DYNAMIC_PARAMS_KEY, encode_inline(values)?));
        }

        Ok(if !self.sql.contains(KVPAIR_SEPARATOR) {
            format!("{}{}{}", self.sql, KVPAIR_SEPARATOR, kv_pairs)
        } else if self.sql.ends_with(';') {
            format!("{}{}", self.sql, kv_pairs)
        } else {
            format!("{};{}", self.sql, kv_pairs)
        })
    }
}

/// A compiled statement bound to a client, accepting parameter values
pub struct Ha3PreparedQuery {
    client: Arc<Ha3Client>,
    query: Ha3Query,
    sink: QueryParamSink,
    /// Detail logging of the connection which prepared the query
    detail_log: bool,
}

impl Ha3PreparedQuery {
    pub fn new(client: Arc<Ha3Client>, query: Ha3Query, detail_log: bool) -> Self {
        let sink = QueryParamSink::new(query.params());

        Self {
            client,
            query,
            sink,
            detail_log,
        }
    }

    pub fn detail_log(&self) -> bool {
        self.detail_log
    }

    pub fn query(&self) -> &Ha3Query {
        &self.query
    }

    /// Binds the value to the `?` placeholder at the (one-based) index
    pub fn bind(&mut self, idx: usize, val: DataValue) -> Result<()> {
        match idx.checked_sub(1) {
            Some(idx) => self.sink.set(idx, val),
            None => Err(DriverError::invalid_param("parameter index starts at 1").into()),
        }
    }

    /// The statement text as it would be sent with the currently bound values
    pub fn rendered(&self) -> Result<String> {
        match &self.query {
            Ha3Query::Select(select) => select.render(&self.sink.get_all()?),
            Ha3Query::Write(write) => Ok(format!(
                "{:?} {} commands on {}",
                self.query.statement_type(),
                write.commands.len(),
                write.table
            )),
        }
    }
}

impl QueryHandle for Ha3PreparedQuery {
    type TResultSet = Ha3ResultSet;

    fn get_structure(&self) -> Result<QueryInputStructure> {
        Ok(self.sink.get_input_structure().clone())
    }

    fn write(&mut self, val: DataValue) -> Result<()> {
        self.sink.write(val)
    }

    fn restart(&mut self) -> Result<()> {
        self.sink.clear();
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Ha3ResultSet> {
        let select = match &self.query {
            Ha3Query::Select(select) => select,
            Ha3Query::Write(_) => {
                return Err(StatementType::unsupported(
                    self.query.statement_type().as_char(),
                ))
            }
        };

        let sql = select.render(&self.sink.get_all()?)?;
        if self.detail_log {
            info!("Executing query {}", MaxLogLength::new(Some(MAX_LOGGED_SQL_LEN), sql.as_str()));
        }

        let start = Instant::now();
        let body = self.client.query(&sql, self.detail_log);

        if self.detail_log {
            info!("Query completed in {}ms", start.elapsed().as_millis());
        }

        Ok(Ha3ResultSet::new(&body))
    }

    fn execute_modify(&mut self) -> Result<Option<u64>> {
        let write = match &self.query {
            Ha3Query::Write(write) => write,
            Ha3Query::Select(_) => return Err(StatementType::unsupported('S')),
        };

        if self.detail_log {
            info!(
                "Writing {} commands to {} with primary key {}",
                write.commands.len(),
                write.table,
                write.pk
            );
        }

        self.client.push(&write.table, &write.pk, &write.commands)?;

        Ok(Some(write.commands.len() as u64))
    }

    fn logged(&self) -> Result<LoggedQuery> {
        let params = self
            .sink
            .get_params()
            .iter()
            .map(|p| match p {
                QueryParam::Dynamic(p) => format!("?{}", p.id),
                QueryParam::Constant(v) => format!("{:?}", v),
            })
            .collect();

        let (text, other) = match &self.query {
            Ha3Query::Select(select) => (
                select.sql.clone(),
                select
                    .kv_pairs
                    .clone()
                    .map(|kv| HashMap::from([("kvpair".to_string(), kv)])),
            ),
            Ha3Query::Write(write) => (
                self.rendered()?,
                Some(HashMap::from([("pk".to_string(), write.pk.clone())])),
            ),
        };

        Ok(LoggedQuery::new(text, params, other))
    }
}
