use std::collections::HashMap;

use ha3_connectors_base::interface::{Connection, Connector, ResultSet};
use ha3_connectors_cloud::{ClientRegistry, Ha3Connector};
use ha3_core::{config::parse_config, data::DataValue};
use pretty_assertions::assert_eq;
use serial_test::serial;

mod common;

#[test]
#[serial]
fn test_ha3_local_mode_execute_query() {
    ha3_logging::init_for_tests();
    let mut con = common::connect_local("connect.local.ha3");

    let mut rs = con
        .execute_query("SELECT id, title FROM articles WHERE score > 3")
        .unwrap();

    assert_eq!(rs.error_info().map(|e| e.error_code), Some(0));
    assert_eq!(
        rs.get_structure().unwrap().names(),
        vec!["id", "title", "score", "category"]
    );
    assert_eq!(rs.read_rows().unwrap().len(), 3);
    assert_eq!(con.schema(), Some("articles"));
}

#[test]
#[serial]
fn test_ha3_local_mode_shares_client() {
    let conf = common::local_conf("connect.shared.ha3");

    let mut first = Ha3Connector::connect(conf.clone()).unwrap();
    let second = Ha3Connector::connect(conf.clone()).unwrap();
    assert_eq!(ClientRegistry::global().ref_count(&conf), 2);

    first.close().unwrap();
    assert_eq!(ClientRegistry::global().ref_count(&conf), 1);

    drop(second);
    assert_eq!(ClientRegistry::global().ref_count(&conf), 0);
}

#[test]
#[serial]
fn test_ha3_connect_url() {
    let props = HashMap::from([
        ("user".to_string(), "u".to_string()),
        ("pass".to_string(), "p".to_string()),
    ]);

    let mut con = Ha3Connector::connect_url(
        "jdbc:ha3://url.local.ha3?mode=local&enableDynamicParams=true",
        &props,
    )
    .unwrap();

    assert_eq!(con.conf().service_name, "url.local.ha3");
    assert_eq!(con.conf().username, "u");
    assert!(con.conf().enable_dynamic_params);

    let mut rs = con.execute_query("SELECT * FROM t").unwrap();
    assert!(rs.next());
    assert_eq!(rs.get(0).unwrap(), DataValue::Int64(1));
}

#[test]
fn test_ha3_connect_url_invalid_prefix() {
    let err = Ha3Connector::connect_url("jdbc:mysql://localhost", &HashMap::new())
        .err()
        .unwrap();

    assert_eq!(
        err.to_string(),
        "Expected [jdbc:ha3://] url, received [jdbc:mysql://localhost]"
    );
}

#[test]
fn test_ha3_parse_options() {
    let conf = Ha3Connector::parse_options(
        parse_config(
            r#"
serviceName: ha3.example.com
username: user
password: pass
maxPoolSize: "5"
enableDetailLog: true
"#,
        )
        .unwrap(),
    )
    .unwrap();

    assert_eq!(conf.service_name, "ha3.example.com");
    assert_eq!(conf.max_pool_size, 5);
    assert!(conf.enable_detail_log);
    assert!(!conf.enable_dynamic_params);
}
