use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Print a JSON document: compact for `json`, indented otherwise.
pub fn print_json(value: &serde_json::Value, format: OutputFormat) {
    let text = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Table | OutputFormat::Pretty => serde_json::to_string_pretty(value),
    };
    println!("{}", text.unwrap_or_else(|_| "null".to_string()));
}

/// One call made during `demo`.
#[derive(Debug, Serialize)]
pub struct CallRecord {
    pub function: String,
    pub args: String,
    pub outcome: &'static str,
    pub result: String,
}

pub fn print_calls(calls: &[CallRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(calls).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FUNCTION", "ARGS", "OUTCOME", "RESULT"]);
            for call in calls {
                table.add_row(vec![
                    call.function.clone(),
                    call.args.clone(),
                    call.outcome.to_string(),
                    call.result.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for call in calls {
                println!(
                    "{}({}) {} {}",
                    call.function, call.args, call.outcome, call.result
                );
            }
        }
    }
}
