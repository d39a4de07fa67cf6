pub use anyhow::{anyhow, bail, ensure, Context, Error, Result};

mod code;
pub use code::*;
mod driver;
pub use driver::*;
mod info;
pub use info::*;
