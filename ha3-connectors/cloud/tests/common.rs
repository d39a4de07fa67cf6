#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ha3_connectors_cloud::{
    ClientRegistry, Ha3Client, Ha3Connection, Ha3ConnectionConfig, Ha3Connector, RemoteEngine,
};
use ha3_core::err::Result;

pub const SAMPLE_RESPONSE: &str = r#"{
    "error_info": {"ErrorCode": 0, "Message": "", "Error": ""},
    "sql_result": {
        "column_name": ["id", "name"],
        "column_type": ["int64", "string"],
        "data": [[1, "a"], [2, "b"]]
    }
}"#;

pub fn local_conf(service_name: &str) -> Ha3ConnectionConfig {
    Ha3ConnectionConfig {
        service_name: service_name.into(),
        username: "user".into(),
        password: "pass".into(),
        mode: Some("local".into()),
        enable_dynamic_params: true,
        ..Default::default()
    }
}

pub fn connect_local(service_name: &str) -> Ha3Connection {
    Ha3Connector::connect(local_conf(service_name)).unwrap()
}

/// Captures the requests sent to the engine
#[derive(Clone, Default)]
pub struct RecordingEngine {
    pub searched: Arc<Mutex<Vec<String>>>,
    pub pushed: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
}

impl RecordingEngine {
    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<(String, String, serde_json::Value)> {
        self.pushed.lock().unwrap().clone()
    }
}

impl RemoteEngine for RecordingEngine {
    fn search(&self, sql: &str) -> Result<String> {
        self.searched.lock().unwrap().push(sql.to_string());
        Ok(SAMPLE_RESPONSE.to_string())
    }

    fn push(&self, table: &str, pk: &str, docs: &serde_json::Value) -> Result<()> {
        self.pushed
            .lock()
            .unwrap()
            .push((table.to_string(), pk.to_string(), docs.clone()));
        Ok(())
    }
}

/// Connects through a private registry to a recording engine
pub fn connect_recording(conf: Ha3ConnectionConfig) -> (Ha3Connection, RecordingEngine) {
    let engine = RecordingEngine::default();
    let registry = ClientRegistry::new();
    let boxed = engine.clone();
    let lease = registry
        .acquire_with(&conf, move |conf| {
            Ok(Ha3Client::with_engine(conf, Box::new(boxed)))
        })
        .unwrap();

    (Ha3Connection::new(conf, lease), engine)
}
