//! Output formatters for benchmark results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use storebench_core::{BenchmarkResult, Comparison};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the results of a session.
    fn format_results(&self, results: &[BenchmarkResult]) -> String;

    /// Format a progress fraction.
    fn format_progress(&self, progress: f64) -> String;

    /// Whether progress overwrites the previous line instead of appending one.
    fn redraws_progress(&self) -> bool {
        true
    }
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// "Compare N read/write operations between a, b and c".
pub fn describe(operations: usize, names: &[&str]) -> String {
    let backends = match names {
        [] => "no backends".to_string(),
        [only] => only.to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    };
    format!("Compare {} read/write operations between {}", operations, backends)
}

fn percent(progress: f64) -> u32 {
    (progress.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_results(&self, results: &[BenchmarkResult]) -> String {
        if results.is_empty() {
            return "No results".to_string();
        }

        let comparison = Comparison::new(results);
        let mut table = Table::new();
        table.set_header(vec!["Backend", "Write", "Read", "Total", "Speedup"]);

        for entry in &comparison.entries {
            let name = if entry.winner {
                format!("{} *", entry.result.name)
            } else {
                entry.result.name.clone()
            };
            let speedup = if entry.winner {
                format!("{}x faster", entry.speedup)
            } else {
                format!("{}x", entry.speedup)
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{}ms", entry.result.write_time_ms)),
                Cell::new(format!("{}ms", entry.result.read_time_ms)),
                Cell::new(format!("{}ms", entry.total_time_ms)),
                Cell::new(speedup),
            ]);
        }

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        format!("{}\n{}", describe(results[0].operations, &names), table)
    }

    fn format_progress(&self, progress: f64) -> String {
        format!("{}% complete", percent(progress))
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_results(&self, results: &[BenchmarkResult]) -> String {
        let comparison = Comparison::new(results);
        serde_json::to_string_pretty(&comparison.entries).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_progress(&self, progress: f64) -> String {
        serde_json::json!({ "progress": percent(progress) }).to_string()
    }

    fn redraws_progress(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<BenchmarkResult> {
        vec![
            BenchmarkResult {
                name: "sled".to_string(),
                write_time_ms: 40,
                read_time_ms: 10,
                operations: 100,
            },
            BenchmarkResult {
                name: "sqlite".to_string(),
                write_time_ms: 120,
                read_time_ms: 80,
                operations: 100,
            },
        ]
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(100, &[]), "Compare 100 read/write operations between no backends");
        assert_eq!(describe(100, &["a"]), "Compare 100 read/write operations between a");
        assert_eq!(
            describe(300, &["a", "b", "c"]),
            "Compare 300 read/write operations between a, b and c"
        );
    }

    #[test]
    fn test_table_format() {
        let output = TableFormatter.format_results(&sample());
        assert!(output.starts_with("Compare 100 read/write operations between sled and sqlite"));
        assert!(output.contains("sled *"));
        assert!(output.contains("4x faster"));
        assert!(output.contains("200ms"));
    }

    #[test]
    fn test_table_empty() {
        assert_eq!(TableFormatter.format_results(&[]), "No results");
    }

    #[test]
    fn test_json_format() {
        let output = JsonFormatter.format_results(&sample());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "sled");
        assert_eq!(rows[0]["write_time_ms"], 40);
        assert_eq!(rows[0]["total_time_ms"], 50);
        assert_eq!(rows[0]["winner"], true);
        assert_eq!(rows[1]["speedup"], 1.0);
    }

    #[test]
    fn test_progress_format() {
        assert_eq!(TableFormatter.format_progress(0.456), "46% complete");
        assert_eq!(JsonFormatter.format_progress(1.0), r#"{"progress":100}"#);
        assert!(TableFormatter.redraws_progress());
        assert!(!JsonFormatter.redraws_progress());
    }
}
