use ha3_core::err::{Context, DriverError, ErrorCode, ErrorInfo, Result};
use ha3_logging::{debug, error, info, MaxLogLength};
use serde::Deserialize;

use crate::{Ha3ConnectionConfig, WriteCommand, FORMAT_TYPE_KEY, KVPAIR_SEPARATOR};

/// Response served in local mode
const LOCAL_SQL_RESULT: &str = include_str!("../resources/ha3_sql_result.json");

const EMPTY_RESULT_MSG: &str = "ERROR: query result is empty,ha3Result is null!";

/// Header naming the primary key field of bulk writes
pub const PK_FIELD_HEADER: &str = "X-Opensearch-Swift-PK-Field";

/// Transport to the search engine
pub trait RemoteEngine: Send + Sync {
    /// Runs the statement, returning the raw response body
    fn search(&self, sql: &str) -> Result<String>;

    /// Sends a bulk write of documents to the table
    fn push(&self, table: &str, pk: &str, docs: &serde_json::Value) -> Result<()>;
}

/// Talks to the engine over its http api
pub struct HttpEngine {
    client: reqwest::blocking::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl HttpEngine {
    pub fn new(conf: &Ha3ConnectionConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(conf.connect_timeout())
            .user_agent(concat!("ha3-connector/v", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build http client")?;

        Ok(Self {
            client,
            endpoint: conf.endpoint(),
            username: conf.username.clone(),
            password: conf.password.clone(),
        })
    }
}

impl RemoteEngine for HttpEngine {
    fn search(&self, sql: &str) -> Result<String> {
        let url = format!("{}/sql", self.endpoint);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "sql": sql }))
            .send()
            .with_context(|| format!("Error during request to {}", url))?;

        let response = response.error_for_status()?;

        response.text().context("Failed to read response body")
    }

    fn push(&self, table: &str, pk: &str, docs: &serde_json::Value) -> Result<()> {
        let url = format!("{}/update/{}/actions/bulk", self.endpoint, table);

        self.client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(PK_FIELD_HEADER, pk)
            .json(docs)
            .send()
            .with_context(|| format!("Error during request to {}", url))?
            .error_for_status()?;

        Ok(())
    }
}

/// Serves the bundled sample response and accepts every write, without network access
#[derive(Debug, Default)]
pub struct LocalEngine;

impl RemoteEngine for LocalEngine {
    fn search(&self, _sql: &str) -> Result<String> {
        Ok(LOCAL_SQL_RESULT.to_string())
    }

    fn push(&self, table: &str, _pk: &str, docs: &serde_json::Value) -> Result<()> {
        debug!(
            "Discarding {} documents for {} in local mode",
            docs.as_array().map(|d| d.len()).unwrap_or_default(),
            table
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    error_info: Option<RawErrorInfo>,
    #[serde(default)]
    sql_result: Option<RawSqlResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawErrorInfo {
    error_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawSqlResult {
    #[serde(default)]
    column_name: Vec<String>,
    #[serde(default)]
    column_type: Vec<String>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// The handle to an engine instance, shared by every connection with the same credentials
pub struct Ha3Client {
    conf: Ha3ConnectionConfig,
    engine: Box<dyn RemoteEngine>,
}

impl Ha3Client {
    pub fn new(conf: Ha3ConnectionConfig) -> Result<Self> {
        let engine: Box<dyn RemoteEngine> = if conf.is_local_mode() {
            Box::new(LocalEngine)
        } else {
            Box::new(HttpEngine::new(&conf)?)
        };

        Ok(Self::with_engine(conf, engine))
    }

    pub fn with_engine(conf: Ha3ConnectionConfig, engine: Box<dyn RemoteEngine>) -> Self {
        Self { conf, engine }
    }

    pub fn conf(&self) -> &Ha3ConnectionConfig {
        &self.conf
    }

    /// Runs the statement and returns the response in the shape read by
    /// [`crate::Ha3ResultSet`]. Failures are reported through its error info.
    pub fn query(&self, sql: &str, detail_log: bool) -> String {
        let sql = full_json_sql(sql);

        if detail_log {
            info!("sql: {}", MaxLogLength::new(Some(4096), sql.as_str()));
        }

        let res = self
            .engine
            .search(&sql)
            .and_then(|body| Self::normalise_response(&body));

        match res {
            Ok(res) => res,
            Err(err) => {
                error!("ERROR: {:#}", err);
                let code = match DriverError::code_of(&err) {
                    Some(ErrorCode::RemoteProtocol) => ErrorCode::RemoteProtocol.code(),
                    _ => 404,
                };
                let info = ErrorInfo::new(code, format!("{:#}", err), format!("{:#}", err));
                serde_json::json!({ "error": info }).to_string()
            }
        }
    }

    fn normalise_response(body: &str) -> Result<String> {
        let raw: RawResponse = serde_json::from_str(body)
            .map_err(|err| remote_protocol(format!("malformed query response: {}", err)))?;

        let info = match raw.error_info {
            Some(info) => {
                let info = ErrorInfo::new(info.error_code, info.message, info.error);
                if info.is_error() {
                    error!(
                        "ERROR: query result has error: errorCode: {} errorInfo: {}",
                        info.error_code, info.error
                    );
                }
                info
            }
            None => {
                error!("{}", EMPTY_RESULT_MSG);
                ErrorInfo::new(404, EMPTY_RESULT_MSG, EMPTY_RESULT_MSG)
            }
        };

        let result = raw.sql_result.unwrap_or_default();
        if result.column_name.len() != result.column_type.len() {
            return Err(remote_protocol(format!(
                "query response has {} column names but {} column types",
                result.column_name.len(),
                result.column_type.len()
            )));
        }
        let columns = result
            .column_name
            .iter()
            .zip(result.column_type.iter())
            .map(|(name, r#type)| serde_json::json!({ "name": name, "type": r#type }))
            .collect::<Vec<_>>();

        Ok(serde_json::json!({
            "error": info,
            "columns": columns,
            "rows": result.data,
        })
        .to_string())
    }

    /// Sends the write commands to the table
    pub fn push(&self, table: &str, pk: &str, commands: &[WriteCommand]) -> Result<()> {
        if table.is_empty() {
            return Err(DriverError::new(
                ErrorCode::InputSchemaNull,
                "no table to write to",
            )
            .into());
        }

        let docs = commands
            .iter()
            .map(|c| c.to_json())
            .collect::<Result<Vec<_>>>()?;

        self.engine
            .push(table, pk, &serde_json::Value::Array(docs))
            .map_err(|err| {
                DriverError::new(
                    ErrorCode::InsertFail,
                    format!("Failed to write to {}: {:#}", table, err),
                )
                .into()
            })
    }
}

fn remote_protocol(msg: String) -> ha3_core::err::Error {
    DriverError::new(ErrorCode::RemoteProtocol, msg).into()
}

/// Forces the `full_json` response format onto the statement's directives
pub fn full_json_sql(sql: &str) -> String {
    let full_json = format!("{}:full_json", FORMAT_TYPE_KEY);

    if !sql.contains(KVPAIR_SEPARATOR) {
        return format!("{}{}{};", sql, KVPAIR_SEPARATOR, full_json);
    }

    if !sql.contains(FORMAT_TYPE_KEY) {
        return sql.replacen(
            KVPAIR_SEPARATOR,
            &format!("{}{};", KVPAIR_SEPARATOR, full_json),
            1,
        );
    }

    for other in ["string", "json", "flatbuffers"] {
        let from = format!("{}:{}", FORMAT_TYPE_KEY, other);
        if sql.contains(&from) {
            return sql.replace(&from, &full_json);
        }
    }

    sql.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ha3_core::data::DataValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{Ha3ResultSet, WriteCmd};

    #[derive(Default)]
    struct MockEngine {
        response: Option<String>,
        searched: Mutex<Vec<String>>,
        pushed: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
    }

    impl RemoteEngine for MockEngine {
        fn search(&self, sql: &str) -> Result<String> {
            self.searched.lock().unwrap().push(sql.to_string());
            self.response
                .clone()
                .ok_or_else(|| ha3_core::err::anyhow!("connection refused"))
        }

        fn push(&self, table: &str, pk: &str, docs: &serde_json::Value) -> Result<()> {
            self.pushed
                .lock()
                .unwrap()
                .push((table.into(), pk.into(), docs.clone()));
            Ok(())
        }
    }

    fn client(response: Option<&str>) -> Ha3Client {
        Ha3Client::with_engine(
            Ha3ConnectionConfig::default(),
            Box::new(MockEngine {
                response: response.map(|r| r.to_string()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_full_json_sql() {
        assert_eq!(
            full_json_sql("SELECT 1"),
            "SELECT 1&&kvpair=formatType:full_json;"
        );
        assert_eq!(
            full_json_sql("SELECT 1&&kvpair=timeout:10"),
            "SELECT 1&&kvpair=formatType:full_json;timeout:10"
        );
        assert_eq!(
            full_json_sql("SELECT 1&&kvpair=formatType:json;timeout:10"),
            "SELECT 1&&kvpair=formatType:full_json;timeout:10"
        );
        assert_eq!(
            full_json_sql("SELECT 1&&kvpair=formatType:flatbuffers"),
            "SELECT 1&&kvpair=formatType:full_json"
        );
        assert_eq!(
            full_json_sql("SELECT 1&&kvpair=formatType:full_json"),
            "SELECT 1&&kvpair=formatType:full_json"
        );
    }

    #[test]
    fn test_query_normalises_response() {
        let client = client(Some(
            &json!({
                "error_info": {"ErrorCode": 0, "Message": "", "Error": ""},
                "sql_result": {
                    "column_name": ["id", "name"],
                    "column_type": ["int64", "string"],
                    "data": [[1, "a"]]
                }
            })
            .to_string(),
        ));

        let mut rs = Ha3ResultSet::new(&client.query("SELECT id, name FROM t", false));

        assert_eq!(rs.error_info(), Some(&ErrorInfo::new(0, "", "")));
        assert!(rs.next());
        assert_eq!(rs.get(0).unwrap(), DataValue::Int64(1));
        assert_eq!(rs.get(1).unwrap(), DataValue::from("a"));
        assert!(!rs.next());
    }

    #[test]
    fn test_query_missing_error_info() {
        let client = client(Some(r#"{"sql_result": {"column_name": [], "column_type": [], "data": []}}"#));
        let rs = Ha3ResultSet::new(&client.query("SELECT 1", false));

        assert_eq!(
            rs.error_info(),
            Some(&ErrorInfo::new(404, EMPTY_RESULT_MSG, EMPTY_RESULT_MSG))
        );
    }

    #[test]
    fn test_query_remote_error_captured() {
        let client = client(Some(
            r#"{"error_info": {"ErrorCode": 4001, "Message": "bad", "Error": "table not found"}}"#,
        ));
        let rs = Ha3ResultSet::new(&client.query("SELECT 1", false));

        assert_eq!(
            rs.error_info(),
            Some(&ErrorInfo::new(4001, "bad", "table not found"))
        );
    }

    #[test]
    fn test_query_transport_failure_captured() {
        let client = client(None);
        let rs = Ha3ResultSet::new(&client.query("SELECT 1", false));

        let info = rs.error_info().unwrap();
        assert_eq!(info.error_code, 404);
        assert_eq!(info.message, "connection refused");
        assert!(rs.is_empty());
    }

    #[test]
    fn test_query_malformed_response_captured() {
        let client = client(Some("<html>gateway timeout</html>"));
        let rs = Ha3ResultSet::new(&client.query("SELECT 1", false));

        let info = rs.error_info().unwrap();
        assert_eq!(info.error_code, ErrorCode::RemoteProtocol.code());
        assert!(info.is_error());
        assert!(info.message.contains("malformed query response"));
        assert!(rs.is_empty());
    }

    #[test]
    fn test_query_mismatched_columns_captured() {
        let client = client(Some(
            &json!({
                "error_info": {"ErrorCode": 0},
                "sql_result": {
                    "column_name": ["id", "name"],
                    "column_type": ["int64"],
                    "data": [[1, "a"]]
                }
            })
            .to_string(),
        ));
        let rs = Ha3ResultSet::new(&client.query("SELECT 1", false));

        let info = rs.error_info().unwrap();
        assert_eq!(info.error_code, ErrorCode::RemoteProtocol.code());
        assert!(rs.is_empty());
    }

    #[test]
    fn test_push_requires_table() {
        let engine = MockEngine::default();
        let pushed = Arc::clone(&engine.pushed);
        let client = Ha3Client::with_engine(Ha3ConnectionConfig::default(), Box::new(engine));

        let err = client.push("", "id", &[]).unwrap_err();

        assert_eq!(DriverError::code_of(&err), Some(ErrorCode::InputSchemaNull));
        assert!(pushed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_local_engine_serves_sample() {
        let conf = Ha3ConnectionConfig {
            mode: Some("local".into()),
            ..Default::default()
        };
        let client = Ha3Client::new(conf).unwrap();
        let rs = Ha3ResultSet::new(&client.query("SELECT * FROM t", false));

        assert_eq!(rs.error_info().map(|i| i.error_code), Some(0));
        assert!(!rs.is_empty());
    }

    #[test]
    fn test_push_serialises_commands() {
        let engine = MockEngine::default();
        let pushed = Arc::clone(&engine.pushed);
        let client = Ha3Client::with_engine(Ha3ConnectionConfig::default(), Box::new(engine));

        client
            .push(
                "docs",
                "id",
                &[WriteCommand::new(
                    WriteCmd::Delete,
                    [("id".to_string(), DataValue::Int64(9))].into_iter().collect(),
                )],
            )
            .unwrap();

        assert_eq!(
            *pushed.lock().unwrap(),
            vec![(
                "docs".to_string(),
                "id".to_string(),
                json!([{"cmd": "delete", "fields": {"id": 9}}])
            )]
        );
    }
}
