use std::{collections::BTreeMap, ops::ControlFlow};

use ha3_core::{
    data::DataValue,
    err::{DriverError, Error, Result},
};
use serde::Serialize;
use sqlparser::{
    ast::{
        BinaryOperator, Delete, Expr, FromTable, Insert, ObjectName, ObjectNamePart, SetExpr,
        Statement, TableFactor, TableObject, Visit, Visitor,
    },
    dialect::MySqlDialect,
    parser::Parser,
};

use crate::{sql_literal_to_val, val_to_json};

/// Document operation understood by the write endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteCmd {
    Add,
    Delete,
}

/// A single document write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCommand {
    pub cmd: WriteCmd,
    pub fields: BTreeMap<String, DataValue>,
}

impl WriteCommand {
    pub fn new(cmd: WriteCmd, fields: BTreeMap<String, DataValue>) -> Self {
        Self { cmd, fields }
    }

    /// The wire form, eg `{"cmd":"add","fields":{"id":1}}`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut fields = serde_json::Map::new();
        for (col, val) in self.fields.iter() {
            fields.insert(col.clone(), val_to_json(val.clone())?);
        }

        Ok(serde_json::json!({
            "cmd": self.cmd,
            "fields": fields,
        }))
    }
}

/// Write commands bound for a table
#[derive(Debug, Clone, PartialEq)]
pub struct Ha3WriteQuery {
    pub table: String,
    /// Primary key field of the table, taken as the first referenced column
    pub pk: String,
    pub commands: Vec<WriteCommand>,
}

/// Translates `INSERT` and `DELETE` statements into document writes
pub struct Ha3MutationCompiler;

impl Ha3MutationCompiler {
    pub fn compile(sql: &str) -> Result<Ha3WriteQuery> {
        let mut statements = Parser::parse_sql(&MySqlDialect {}, sql)
            .map_err(|e| invalid(format!("invalid sql: {}", e)))?;

        if statements.len() != 1 {
            return Err(invalid(format!(
                "expected a single statement, found {}",
                statements.len()
            )));
        }

        match statements.remove(0) {
            Statement::Insert(insert) => Self::compile_insert(&insert),
            Statement::Delete(delete) => Self::compile_delete(&delete),
            other => Err(DriverError::unsupported(format!(
                "only insert and delete statements can be written, found '{}'",
                other
            ))
            .into()),
        }
    }

    fn compile_insert(insert: &Insert) -> Result<Ha3WriteQuery> {
        let table = match &insert.table {
            TableObject::TableName(name) => object_name_leaf(name),
            _ => None,
        }
        .ok_or_else(|| invalid(format!("unsupported insert target '{}'", insert.table)))?;

        let columns = insert
            .columns
            .iter()
            .map(|c| c.value.clone())
            .collect::<Vec<_>>();
        let pk = columns
            .first()
            .cloned()
            .ok_or_else(|| invalid("invalid sql param. no column"))?;

        let rows = match insert.source.as_ref().map(|s| s.body.as_ref()) {
            Some(SetExpr::Values(values)) => &values.rows,
            _ => return Err(invalid("only insert ... values statements are supported")),
        };

        let mut commands = vec![];
        for row in rows.iter() {
            if row.len() != columns.len() {
                return Err(invalid("values size not match column size!"));
            }

            let mut fields = BTreeMap::new();
            for (col, expr) in columns.iter().zip(row.iter()) {
                fields.insert(col.clone(), literal(expr)?);
            }

            commands.push(WriteCommand::new(WriteCmd::Add, fields));
        }

        Ok(Ha3WriteQuery {
            table,
            pk,
            commands,
        })
    }

    fn compile_delete(delete: &Delete) -> Result<Ha3WriteQuery> {
        let tables = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        let table = tables
            .first()
            .and_then(|t| match &t.relation {
                TableFactor::Table { name, .. } => object_name_leaf(name),
                _ => None,
            })
            .ok_or_else(|| invalid("unsupported delete target"))?;

        let selection = delete.selection.as_ref().ok_or_else(|| {
            invalid("column error, only support delete data by primary key.")
        })?;

        let mut collector = ColumnCollector::default();
        let _ = selection.visit(&mut collector);
        if collector.columns.len() != 1 {
            return Err(invalid(
                "column error, only support delete data by primary key.",
            ));
        }
        let pk = collector.columns.remove(0);

        let keys = Self::primary_keys(selection)?;
        let commands = keys
            .into_iter()
            .map(|key| {
                WriteCommand::new(WriteCmd::Delete, BTreeMap::from([(pk.clone(), key)]))
            })
            .collect();

        Ok(Ha3WriteQuery {
            table,
            pk,
            commands,
        })
    }

    /// Reads the key values out of `pk = literal` or `pk IN (literal, ...)`
    fn primary_keys(selection: &Expr) -> Result<Vec<DataValue>> {
        match selection {
            Expr::Nested(inner) => Self::primary_keys(inner),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                if column_name(left).is_none() {
                    return Err(invalid("column should in front of value."));
                }

                Ok(vec![key_literal(right)?])
            }
            Expr::InList { negated: true, .. } => {
                Err(invalid("only support in, not support not in"))
            }
            Expr::InList { expr, list, .. } => {
                if column_name(expr).is_none() {
                    return Err(invalid("column should in front of value."));
                }

                list.iter().map(key_literal).collect()
            }
            other => Err(invalid(format!(
                "only support delete by primary key equality or in list, found '{}'",
                other
            ))),
        }
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    DriverError::invalid_param(msg).into()
}

fn literal(expr: &Expr) -> Result<DataValue> {
    sql_literal_to_val(expr).ok_or_else(|| invalid(format!("unsupported value '{}'", expr)))
}

fn key_literal(expr: &Expr) -> Result<DataValue> {
    match literal(expr)? {
        DataValue::Null => Err(invalid("primary key value can not be null")),
        val => Ok(val),
    }
}

fn object_name_leaf(name: &ObjectName) -> Option<String> {
    match name.0.last()? {
        ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
        _ => None,
    }
}

fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.clone()),
        _ => None,
    }
}

/// Collects the distinct column names referenced by an expression
#[derive(Default)]
struct ColumnCollector {
    columns: Vec<String>,
}

impl Visitor for ColumnCollector {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Some(col) = column_name(expr) {
            if !self.columns.contains(&col) {
                self.columns.push(col);
            }
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use ha3_core::err::ErrorCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fields(pairs: &[(&str, DataValue)]) -> BTreeMap<String, DataValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn assert_invalid(sql: &str, msg: &str) {
        let err = Ha3MutationCompiler::compile(sql).unwrap_err();

        assert_eq!(DriverError::code_of(&err), Some(ErrorCode::InvalidParam));
        assert!(
            err.to_string().ends_with(msg),
            "'{}' does not end with '{}'",
            err,
            msg
        );
    }

    #[test]
    fn test_compile_insert_multiple_rows() {
        let query =
            Ha3MutationCompiler::compile("INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y')").unwrap();

        assert_eq!(
            query,
            Ha3WriteQuery {
                table: "t".into(),
                pk: "a".into(),
                commands: vec![
                    WriteCommand::new(
                        WriteCmd::Add,
                        fields(&[("a", DataValue::Int64(1)), ("b", DataValue::from("x"))])
                    ),
                    WriteCommand::new(
                        WriteCmd::Add,
                        fields(&[("a", DataValue::Int64(2)), ("b", DataValue::from("y"))])
                    ),
                ]
            }
        );
    }

    #[test]
    fn test_compile_insert_allows_null_and_negative() {
        let query =
            Ha3MutationCompiler::compile("INSERT INTO `docs` (id, score, tag) VALUES (7, -1.5, NULL)")
                .unwrap();

        assert_eq!(query.table, "docs");
        assert_eq!(
            query.commands[0].fields,
            fields(&[
                ("id", DataValue::Int64(7)),
                ("score", DataValue::Decimal("-1.5".parse().unwrap())),
                ("tag", DataValue::Null),
            ])
        );
    }

    #[test]
    fn test_compile_insert_row_width_mismatch() {
        assert_invalid(
            "INSERT INTO t (a, b) VALUES (1, 'x'), (2)",
            "values size not match column size!",
        );
    }

    #[test]
    fn test_compile_insert_non_literal() {
        assert_invalid("INSERT INTO t (a) VALUES (now())", "unsupported value 'now()'");
    }

    #[test]
    fn test_compile_insert_without_columns() {
        assert_invalid("INSERT INTO t VALUES (1)", "invalid sql param. no column");
    }

    #[test]
    fn test_compile_delete_in_list() {
        let query = Ha3MutationCompiler::compile("DELETE FROM t WHERE id IN (1, 2, 3)").unwrap();

        assert_eq!(query.table, "t");
        assert_eq!(query.pk, "id");
        assert_eq!(query.commands.len(), 3);
        assert!(query.commands.iter().all(|c| c.cmd == WriteCmd::Delete));
        assert_eq!(
            query.commands[2].fields,
            fields(&[("id", DataValue::Int64(3))])
        );
    }

    #[test]
    fn test_compile_delete_equality() {
        let query = Ha3MutationCompiler::compile("DELETE FROM t WHERE id = 'k1'").unwrap();

        assert_eq!(
            query.commands,
            vec![WriteCommand::new(
                WriteCmd::Delete,
                fields(&[("id", DataValue::from("k1"))])
            )]
        );
    }

    #[test]
    fn test_compile_delete_rejects_multiple_columns() {
        assert_invalid(
            "DELETE FROM t WHERE id = 1 AND name = 'x'",
            "column error, only support delete data by primary key.",
        );
    }

    #[test]
    fn test_compile_delete_rejects_missing_where() {
        assert_invalid(
            "DELETE FROM t",
            "column error, only support delete data by primary key.",
        );
    }

    #[test]
    fn test_compile_delete_rejects_value_first() {
        assert_invalid("DELETE FROM t WHERE 1 = id", "column should in front of value.");
    }

    #[test]
    fn test_compile_delete_rejects_not_in() {
        assert_invalid(
            "DELETE FROM t WHERE id NOT IN (1, 2)",
            "only support in, not support not in",
        );
    }

    #[test]
    fn test_compile_delete_rejects_other_predicates() {
        let err = Ha3MutationCompiler::compile("DELETE FROM t WHERE id > 1").unwrap_err();

        assert_eq!(DriverError::code_of(&err), Some(ErrorCode::InvalidParam));
    }

    #[test]
    fn test_compile_rejects_update() {
        let err = Ha3MutationCompiler::compile("UPDATE t SET a = 1 WHERE id = 1").unwrap_err();

        assert_eq!(DriverError::code_of(&err), Some(ErrorCode::Unsupported));
    }

    #[test]
    fn test_write_command_to_json() {
        let cmd = WriteCommand::new(
            WriteCmd::Add,
            fields(&[("id", DataValue::Int64(1)), ("name", DataValue::from("a"))]),
        );

        assert_eq!(
            cmd.to_json().unwrap(),
            json!({"cmd": "add", "fields": {"id": 1, "name": "a"}})
        );
    }
}
