//! MCNP input deck reader: cell material signatures and the declared history
//! count.

mod model;
mod parser;

pub use model::{CellDensityMap, McnpInput};
pub use parser::{
    McnpInputParser, is_comment, normalize_density, parse_mcnp_file, parse_mcnp_source,
};
