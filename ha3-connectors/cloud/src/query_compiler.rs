use ha3_connectors_base::{common::query::QueryParam, interface::QueryCompiler};
use ha3_core::{
    data::{DataType, DataValue},
    err::{DriverError, Result},
};

use crate::{
    Ha3Connection, Ha3ConnectionConfig, Ha3KvPairBuilder, Ha3MutationCompiler, Ha3Parameterizer,
    Ha3Query, Ha3SelectQuery, SqlScanner,
};

/// The statement kinds accepted by the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Delete,
}

impl StatementType {
    /// Classifies the statement by its first significant character
    pub fn classify(sql: &str) -> Result<Self> {
        match SqlScanner::new(sql).first_significant_char() {
            Some('S' | 's') => Ok(Self::Select),
            Some('I' | 'i') => Ok(Self::Insert),
            Some('D' | 'd') => Ok(Self::Delete),
            Some(c) => Err(Self::unsupported(c)),
            None => Err(DriverError::empty_param("query is empty").into()),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Select => 'S',
            Self::Insert => 'I',
            Self::Delete => 'D',
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Select)
    }

    pub(crate) fn unsupported(c: char) -> ha3_core::err::Error {
        DriverError::unsupported(format!("Provided query type '{}' is not supported!", c)).into()
    }
}

/// The result of rewriting a SELECT for the plan cache
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedSelect {
    pub sql: String,
    /// Literals lifted out of the `WHERE` clause
    pub values: Vec<DataValue>,
}

impl TranslatedSelect {
    fn unchanged(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            values: vec![],
        }
    }
}

/// Query compiler for the HA3 connector
pub struct Ha3QueryCompiler;

impl QueryCompiler for Ha3QueryCompiler {
    type TConnection = Ha3Connection;
    type TQuery = Ha3Query;

    fn query_from_string(connection: &mut Self::TConnection, query: String) -> Result<Ha3Query> {
        let compiled = Self::compile(connection.conf(), &query)?;

        if let Ha3Query::Select(_) = compiled {
            if let Some(table) = SqlScanner::new(&query).word_after("from") {
                connection.set_schema(table);
            }
        }

        Ok(compiled)
    }
}

impl Ha3QueryCompiler {
    pub fn compile(conf: &Ha3ConnectionConfig, sql: &str) -> Result<Ha3Query> {
        match StatementType::classify(sql)? {
            StatementType::Select => Ok(Ha3Query::Select(Self::compile_select(conf, sql))),
            StatementType::Insert | StatementType::Delete => {
                Ok(Ha3Query::Write(Ha3MutationCompiler::compile(sql)?))
            }
        }
    }

    /// Compiles a SELECT into the text and directives sent to the engine.
    ///
    /// Statements with bound `?` placeholders are never rewritten, the bound
    /// values are sent inline alongside the plan cache directives.
    pub fn compile_select(conf: &Ha3ConnectionConfig, sql: &str) -> Ha3SelectQuery {
        let placeholders = SqlScanner::new(sql).count_placeholders();
        let bound = (0..placeholders)
            .map(|i| QueryParam::dynamic(i as u32 + 1, DataType::Null))
            .collect::<Vec<_>>();

        if sql.contains("kvpair") {
            return Ha3SelectQuery::new(sql, None, bound);
        }

        if placeholders > 0 || !conf.enable_dynamic_params {
            return Ha3SelectQuery::new(
                sql,
                Some(Ha3KvPairBuilder::plan_cache().serialize()),
                bound,
            );
        }

        let translated = Self::translate(sql);
        let mut kv_pairs = Ha3KvPairBuilder::plan_cache()
            .format_type("full_json")
            .database_name("general")
            .enable_urlencode_data();

        if !translated.values.is_empty() {
            kv_pairs = kv_pairs.dynamic_params();
        }

        Ha3SelectQuery::new(
            translated.sql,
            Some(kv_pairs.serialize()),
            translated
                .values
                .into_iter()
                .map(QueryParam::constant)
                .collect(),
        )
    }

    /// Lifts the `WHERE` literals out of the statement, keeping any
    /// `GROUP BY` tail and moving `LIMIT` and `OFFSET` to the end.
    ///
    /// Statements that cannot be rewritten safely are returned as is.
    pub fn translate(sql: &str) -> TranslatedSelect {
        let scanner = SqlScanner::new(sql);

        let (begin, inner, end) = match scanner.outer_parens() {
            Some((open, close)) if scanner.count_keyword("select") > 1 => {
                (&sql[..=open], &sql[open + 1..close], &sql[close..])
            }
            _ => ("", sql, ""),
        };

        let (inner, limit) = take_keyword_number(inner.to_string(), "limit");
        let (inner, offset) = take_keyword_number(inner, "offset");

        let (prefix, clause) = match SqlScanner::new(&inner).find_keyword("where") {
            Some(idx) => inner.split_at(idx),
            None => return TranslatedSelect::unchanged(sql),
        };

        let (filter, tail) = match SqlScanner::new(clause).find_keyword_pair("group", "by") {
            Some(idx) => clause.split_at(idx),
            None => (clause, ""),
        };

        let parameterized = Ha3Parameterizer::parameterize(filter);
        if !parameterized.is_parameterized() {
            return TranslatedSelect::unchanged(sql);
        }

        let mut out = format!("{}{} {}", prefix, parameterized.clause, tail)
            .trim_end()
            .to_string();

        if let Some(limit) = limit.filter(|l| *l > 0) {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            out.push_str(&format!(" OFFSET {}", offset));
        }

        TranslatedSelect {
            sql: format!("{}{}{}", begin, out, end),
            values: parameterized.values,
        }
    }
}

/// Removes the first `keyword <n>` phrase, returning the remaining text and `n`
fn take_keyword_number(sql: String, keyword: &str) -> (String, Option<u64>) {
    let found = SqlScanner::new(&sql).find_keyword_number(keyword);

    match found {
        Some((range, n)) => {
            let mut sql = sql;
            sql.replace_range(range, "");
            (sql, Some(n))
        }
        None => (sql, None),
    }
}
