use tandem_core::sync::ReportSink;

/// Prints sync progress to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ReportSink for ConsoleReporter {
    fn report(&self, message: &str) {
        println!("{message}");
    }
}
