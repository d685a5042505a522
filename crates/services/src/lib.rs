pub mod report;

pub use report::{
    ReportError, ReportGenerator, ReportGeneratorConfig, ReportOutcome, ReportSurfaces,
};

#[cfg(test)]
mod test_utils;
