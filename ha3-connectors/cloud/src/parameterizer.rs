use std::ops::ControlFlow;

use ha3_core::{
    data::DataValue,
    err::{bail, ensure, Context, Result},
};
use ha3_logging::info;
use sqlparser::{
    ast::{Expr, SetExpr, Statement, Value, VisitMut, VisitorMut},
    dialect::MySqlDialect,
    parser::Parser,
};

use crate::sql_literal_to_val;

/// Synthetic statement the clause is parsed within
const MOCK_PREFIX: &str = "SELECT * FROM __ha3_mock";

/// A clause with its literals replaced by `?`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedClause {
    pub clause: String,
    /// Literals in source order
    pub values: Vec<DataValue>,
}

impl ParameterizedClause {
    fn unchanged(clause: &str) -> Self {
        Self {
            clause: clause.to_string(),
            values: vec![],
        }
    }

    pub fn is_parameterized(&self) -> bool {
        !self.values.is_empty()
    }
}

/// Lifts literals out of a `WHERE ...` clause so the engine can cache one plan
/// for every statement of the same shape
pub struct Ha3Parameterizer;

impl Ha3Parameterizer {
    /// Whether the clause can be parameterized. `CASE WHEN` and `IN` lists
    /// change plan shape with their literals so are left inline.
    pub fn is_eligible(clause: &str) -> bool {
        let lower = clause.to_lowercase();

        !lower.contains("case when") && !lower.contains(" in")
    }

    /// Parameterizes the clause, returning it unchanged with no values when
    /// it is ineligible or cannot be parsed
    pub fn parameterize(clause: &str) -> ParameterizedClause {
        if clause.trim().is_empty() || !Self::is_eligible(clause) {
            return ParameterizedClause::unchanged(clause);
        }

        match Self::try_parameterize(clause) {
            Ok(res) => res,
            Err(err) => {
                info!("Failed to parameterize clause, sending as is: {:?}", err);
                ParameterizedClause::unchanged(clause)
            }
        }
    }

    fn try_parameterize(clause: &str) -> Result<ParameterizedClause> {
        let sql = format!("{} {}", MOCK_PREFIX, clause);
        let mut statements =
            Parser::parse_sql(&MySqlDialect {}, &sql).context("Failed to parse clause")?;
        ensure!(
            statements.len() == 1,
            "Expected a single statement, found {}",
            statements.len()
        );

        let mut statement = statements.remove(0);
        let mut extractor = LiteralExtractor::default();

        match &mut statement {
            Statement::Query(query) => match query.body.as_mut() {
                SetExpr::Select(select) => {
                    if let Some(selection) = select.selection.as_mut() {
                        let _ = selection.visit(&mut extractor);
                    }
                }
                _ => bail!("Unexpected query body"),
            },
            _ => bail!("Unexpected statement"),
        }

        let rendered = statement.to_string();
        let clause = rendered
            .strip_prefix(MOCK_PREFIX)
            .with_context(|| format!("Unexpected rendering '{}'", rendered))?
            .trim_start()
            .to_string();

        Ok(ParameterizedClause {
            clause,
            values: extractor.values,
        })
    }
}

/// Replaces numeric and string literals with placeholders in source order
#[derive(Default)]
struct LiteralExtractor {
    values: Vec<DataValue>,
}

impl LiteralExtractor {
    fn is_extractable(value: &Value) -> bool {
        matches!(
            value,
            Value::Number(..) | Value::SingleQuotedString(_) | Value::DoubleQuotedString(_)
        )
    }

    fn is_number(expr: &Expr) -> bool {
        matches!(expr, Expr::Value(v) if matches!(v.value, Value::Number(..)))
    }
}

impl VisitorMut for LiteralExtractor {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        let literal = match &*expr {
            Expr::Value(v) if Self::is_extractable(&v.value) => sql_literal_to_val(expr),
            Expr::UnaryOp { expr: inner, .. } if Self::is_number(inner) => sql_literal_to_val(expr),
            _ => None,
        };

        let literal = match literal {
            Some(literal) => literal,
            None => return ControlFlow::Continue(()),
        };

        // collapse a negated number into a single placeholder
        let collapsed = match &*expr {
            Expr::UnaryOp { expr: inner, .. } => Some(inner.as_ref().clone()),
            _ => None,
        };
        if let Some(collapsed) = collapsed {
            *expr = collapsed;
        }

        if let Expr::Value(v) = expr {
            v.value = Value::Placeholder("?".to_string());
            self.values.push(literal);
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parameterize_numbers_and_strings() {
        let res = Ha3Parameterizer::parameterize("WHERE id = 5 AND name = 'bob'");

        assert_eq!(res.clause, "WHERE id = ? AND name = ?");
        assert_eq!(res.values, vec![DataValue::Int64(5), DataValue::from("bob")]);
    }

    #[test]
    fn test_parameterize_negative_number() {
        let res = Ha3Parameterizer::parameterize("WHERE score > -1.5");

        assert_eq!(res.clause, "WHERE score > ?");
        assert_eq!(res.values, vec![DataValue::Decimal("-1.5".parse().unwrap())]);
    }

    #[test]
    fn test_parameterize_keeps_null_bool_and_placeholders() {
        let res = Ha3Parameterizer::parameterize("WHERE a IS NULL AND b = true AND c = ? AND d = 2");

        assert_eq!(res.clause, "WHERE a IS NULL AND b = true AND c = ? AND d = ?");
        assert_eq!(res.values, vec![DataValue::Int64(2)]);
    }

    #[test]
    fn test_parameterize_keeps_order_by() {
        let res = Ha3Parameterizer::parameterize("WHERE id = 5 ORDER BY 1");

        assert_eq!(res.clause, "WHERE id = ? ORDER BY 1");
        assert_eq!(res.values, vec![DataValue::Int64(5)]);
    }

    #[test]
    fn test_parameterize_case_when_ineligible() {
        let clause = "WHERE CASE WHEN a = 1 THEN 1 ELSE 0 END = 1";
        let res = Ha3Parameterizer::parameterize(clause);

        assert_eq!(res.clause, clause);
        assert!(!res.is_parameterized());
    }

    #[test]
    fn test_parameterize_in_ineligible() {
        let clause = "WHERE id IN (1, 2)";
        let res = Ha3Parameterizer::parameterize(clause);

        assert_eq!(res.clause, clause);
        assert!(res.values.is_empty());
    }

    #[test]
    fn test_parameterize_parse_failure_is_unchanged() {
        let clause = "WHERE (((";
        let res = Ha3Parameterizer::parameterize(clause);

        assert_eq!(res.clause, clause);
        assert!(res.values.is_empty());
    }

    #[test]
    fn test_parameterize_empty_clause() {
        let res = Ha3Parameterizer::parameterize("");

        assert_eq!(res.clause, "");
        assert!(res.values.is_empty());
    }
}
