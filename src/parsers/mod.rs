pub mod clover;

use crate::error::Result;
use crate::model::CoverageReport;

/// Every format adapter implements this trait.
pub trait Parser {
    /// Identifying label recorded on the reports this adapter produces.
    fn name(&self) -> &'static str;

    /// Parse the input bytes into the canonical coverage tree.
    fn parse(&self, input: &[u8]) -> Result<CoverageReport>;
}
