use std::fmt::{self, Display};

/// Truncates the displayed form of a value, used to keep large
/// queries and responses out of the logs
pub struct MaxLogLength<'a, T: Display + ?Sized> {
    limit: Option<usize>,
    val: &'a T,
}

impl<'a, T: Display + ?Sized> MaxLogLength<'a, T> {
    pub fn new(limit: Option<usize>, val: &'a T) -> Self {
        Self { limit, val }
    }
}

impl<'a, T: Display + ?Sized> Display for MaxLogLength<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt = self.val.to_string();

        match self.limit {
            Some(limit) if fmt.chars().count() > limit => {
                let truncated: String = fmt.chars().take(limit).collect();
                write!(f, "{}...", truncated)
            }
            _ => write!(f, "{}", fmt),
        }
    }
}
