use std::fmt::{self, Display};

use itertools::Itertools;

/// Separates the SQL text from the directive string on the wire
pub const KVPAIR_SEPARATOR: &str = "&&kvpair=";

pub const DYNAMIC_PARAMS_KEY: &str = "dynamic_params";
/// Marker directive replaced by the encoded parameter payload at send time
pub const DYNAMIC_PARAMS_MARKER: &str = "dynamic_params:dynamic_params";
pub const URLENCODE_DATA_KEY: &str = "urlencode_data";
pub const FORMAT_TYPE_KEY: &str = "formatType";

/// Builds the semicolon separated `key:value` directive string
/// sent alongside a query.
///
/// Pairs keep their insertion order and are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ha3KvPairBuilder {
    pairs: Vec<(String, String)>,
}

impl Ha3KvPairBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn serialize(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .join(";")
    }

    pub fn trace(self, value: impl Display) -> Self {
        self.add("trace", value)
    }

    pub fn format_type(self, value: impl Display) -> Self {
        self.add(FORMAT_TYPE_KEY, value)
    }

    /// Query timeout in milliseconds
    pub fn timeout(self, ms: u32) -> Self {
        self.add("timeout", ms)
    }

    pub fn enable_search_info(self) -> Self {
        self.add("searchInfo", true)
    }

    pub fn disable_search_info(self) -> Self {
        self.add("searchInfo", false)
    }

    pub fn enable_sql_plan(self) -> Self {
        self.add("sqlPlan", true)
    }

    pub fn disable_sql_plan(self) -> Self {
        self.add("sqlPlan", false)
    }

    pub fn enable_forbit_merge_search_info(self) -> Self {
        self.add("forbitMergeSearchInfo", true)
    }

    pub fn disable_forbit_merge_search_info(self) -> Self {
        self.add("forbitMergeSearchInfo", false)
    }

    pub fn enable_result_readable(self) -> Self {
        self.add("resultReadable", true)
    }

    pub fn disable_result_readable(self) -> Self {
        self.add("resultReadable", false)
    }

    pub fn parallel(self, value: u32) -> Self {
        self.add("parallel", value)
    }

    pub fn parallel_tables(self, value: impl Display) -> Self {
        self.add("parallelTables", value)
    }

    pub fn database_name(self, value: impl Display) -> Self {
        self.add("databaseName", value)
    }

    pub fn catalog_name(self, value: impl Display) -> Self {
        self.add("catalogName", value)
    }

    pub fn enable_lack_result(self) -> Self {
        self.add("lackResultEnable", true)
    }

    pub fn disable_lack_result(self) -> Self {
        self.add("lackResultEnable", false)
    }

    pub fn enable_debug(self) -> Self {
        self.add("iquan.optimizer.debug.enable", true)
    }

    pub fn disable_debug(self) -> Self {
        self.add("iquan.optimizer.debug.enable", false)
    }

    pub fn enable_force_sort_limit(self) -> Self {
        self.add("iquan.optimizer.sort.limit.use.together", true)
    }

    pub fn disable_force_sort_limit(self) -> Self {
        self.add("iquan.optimizer.sort.limit.use.together", false)
    }

    pub fn enable_force_limit(self) -> Self {
        self.add("iquan.optimizer.force.limit.enable", true)
    }

    pub fn disable_force_limit(self) -> Self {
        self.add("iquan.optimizer.force.limit.enable", false)
    }

    pub fn force_limit_num(self, value: u64) -> Self {
        self.add("iquan.optimizer.force.limit.num", value)
    }

    pub fn enable_join_condition_check(self) -> Self {
        self.add("iquan.optimizer.join.condition.check", true)
    }

    pub fn disable_join_condition_check(self) -> Self {
        self.add("iquan.optimizer.join.condition.check", false)
    }

    pub fn format_version(self, value: impl Display) -> Self {
        self.add("iquan.plan.format.version", value)
    }

    pub fn plan_format_type(self, value: impl Display) -> Self {
        self.add("iquan.plan.format.type", value)
    }

    pub fn prepare_level(self, value: impl Display) -> Self {
        self.add("iquan.plan.prepare.level", value)
    }

    pub fn enable_cache(self) -> Self {
        self.add("iquan.plan.cache.enable", true)
    }

    pub fn disable_cache(self) -> Self {
        self.add("iquan.plan.cache.enable", false)
    }

    pub fn source_id(self, value: impl Display) -> Self {
        self.add("exec.source.id", value)
    }

    pub fn source_spec(self, value: impl Display) -> Self {
        self.add("exec.source.spec", value)
    }

    /// Adds the marker later substituted with the encoded parameters
    pub fn dynamic_params(self) -> Self {
        self.add(DYNAMIC_PARAMS_KEY, DYNAMIC_PARAMS_KEY)
    }

    pub fn enable_urlencode_data(self) -> Self {
        self.add(URLENCODE_DATA_KEY, true)
    }

    pub fn disable_urlencode_data(self) -> Self {
        self.add(URLENCODE_DATA_KEY, false)
    }

    pub fn optimizer_level(self, value: impl Display) -> Self {
        self.add("iquan.optimizer.level", value)
    }

    /// Plan cache directives attached to every statement we send
    pub fn plan_cache() -> Self {
        Self::new()
            .enable_cache()
            .prepare_level("jni.post.optimize")
    }
}

impl Display for Ha3KvPairBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}
