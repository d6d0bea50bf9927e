/*!
 * Registry Module
 * Single source of truth for hosted units
 */

mod types;
mod units;

pub use types::{UnitDetail, UnitSummary};
pub use units::Registry;
