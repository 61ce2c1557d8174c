//! Summary statistics tool

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordReduction {
    pub original_word_count: usize,
    pub new_word_count: usize,
    /// Percentage, rounded to two decimal places; negative when the summary is longer
    pub percentage_reduction: f64,
}

/// Word counts split on whitespace, and how much shorter the summary is
pub fn compute_word_reduction(original: &str, summarized: &str) -> WordReduction {
    let original_word_count = original.split_whitespace().count();
    let new_word_count = summarized.split_whitespace().count();

    let percentage_reduction = if original_word_count == 0 {
        0.0
    } else {
        let raw = (original_word_count as f64 - new_word_count as f64) / original_word_count as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    };

    WordReduction { original_word_count, new_word_count, percentage_reduction }
}

pub struct WordReductionTool;

#[async_trait]
impl Tool for WordReductionTool {
    fn name(&self) -> &str { "compute_word_reduction" }
    fn description(&self) -> &str {
        "Compute word counts of the original and summarized text and the percentage reduction"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("original_text", ParamKind::String, "The full original input text"),
            ParamSpec::required("summarized_text", ParamKind::String, "The summarized version of the text"),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let stats = compute_word_reduction(args.str("original_text")?, args.str("summarized_text")?);
        Ok(serde_json::to_value(stats)?)
    }
}
