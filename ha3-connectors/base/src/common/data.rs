use ha3_core::{
    data::DataValue,
    err::{bail, DriverError, Result},
};

use crate::{common::query::QueryParam, interface::QueryInputStructure};

/// Captures the query input parameters.
#[derive(Debug, Clone)]
pub struct QueryParamSink {
    /// The list of query parameters expected by the query.
    params: Vec<QueryParam>,
    /// The input structure expected by the query.
    /// This only contains the dynamic query params and excludes constants.
    input: QueryInputStructure,
    /// The values bound to the dynamic parameters, by position
    values: Vec<Option<DataValue>>,
    /// Position of the next sequential write
    cursor: usize,
}

impl QueryParamSink {
    pub fn new(params: Vec<QueryParam>) -> Self {
        let input = QueryInputStructure::new(
            params
                .iter()
                .filter_map(|p| p.as_dynamic())
                .map(|p| (p.id, p.r#type))
                .collect(),
        );
        let values = vec![None; input.params.len()];

        Self {
            params,
            input,
            values,
            cursor: 0,
        }
    }

    /// Gets the expected query input structure when writing to the query.
    pub fn get_input_structure(&self) -> &QueryInputStructure {
        &self.input
    }

    /// Gets the list of query parameters
    pub fn get_params(&self) -> &Vec<QueryParam> {
        &self.params
    }

    /// Returns whether all query params have been written
    pub fn all_params_written(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    /// Writes the next dynamic parameter
    pub fn write(&mut self, val: DataValue) -> Result<()> {
        if self.cursor >= self.values.len() {
            bail!("All query parameters have already been written");
        }

        self.values[self.cursor] = Some(val);
        self.cursor += 1;
        Ok(())
    }

    /// Binds the dynamic parameter at the supplied zero-based position
    pub fn set(&mut self, idx: usize, val: DataValue) -> Result<()> {
        match self.values.get_mut(idx) {
            Some(slot) => *slot = Some(val),
            None => {
                return Err(DriverError::invalid_param(format!(
                    "parameter index {} out of range, query has {} parameters",
                    idx + 1,
                    self.values.len()
                ))
                .into())
            }
        }

        Ok(())
    }

    /// Returns the query parameter values, including both constants and dynamic parameters
    ///
    /// Unbound dynamic parameters are rejected as empty.
    pub fn get_all(&self) -> Result<Vec<DataValue>> {
        let mut res = vec![];
        let mut dyn_param_idx = 0;

        for param in self.params.iter() {
            match param {
                QueryParam::Dynamic(_) => {
                    match self.values.get(dyn_param_idx).cloned().flatten() {
                        Some(val) => res.push(val),
                        None => return Err(DriverError::empty_param("empty params!").into()),
                    }
                    dyn_param_idx += 1;
                }
                QueryParam::Constant(v) => res.push(v.clone()),
            }
        }

        Ok(res)
    }

    /// Clears the query parameter sink, clearing all current input
    pub fn clear(&mut self) {
        self.values = vec![None; self.input.params.len()];
        self.cursor = 0;
    }
}
