mod coerce;
mod r#type;
mod value;

pub use coerce::*;
pub use r#type::*;
pub use value::*;

pub use chrono;
pub use rust_decimal;
