//! Clock tool - local time in a city

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::{Tz, TZ_VARIANTS};
use serde_json::{json, Value};
use crate::Result;
use crate::error::Error;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

/// Find the IANA zone for a city name.
///
/// "new york" becomes "new_york"; a zone whose last segment is exactly that
/// wins, otherwise the alphabetically first zone containing it.
pub fn find_zone(city: &str) -> Option<Tz> {
    let needle = city.trim().replace(' ', "_").to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let exact = TZ_VARIANTS.iter().find(|tz| {
        tz.name()
            .rsplit('/')
            .next()
            .map_or(false, |last| last.eq_ignore_ascii_case(&needle))
    });

    exact
        .or_else(|| {
            TZ_VARIANTS.iter()
                .filter(|tz| tz.name().to_lowercase().contains(&needle))
                .min_by_key(|tz| tz.name())
        })
        .copied()
}

/// Render the time report for `city` at `now`
pub fn time_report(city: &str, tz: Tz, now: DateTime<Utc>) -> String {
    let local = now.with_timezone(&tz);
    format!(
        "The current time in {} is {} (Timezone: {})",
        city,
        local.format("%Y-%m-%d %H:%M:%S"),
        tz.name()
    )
}

pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str { "get_current_time" }
    fn description(&self) -> &str { "Get the current local time in a city" }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("city", ParamKind::String, "City name, e.g. \"Tokyo\"")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let city = args.str("city")?;
        let tz = find_zone(city).ok_or_else(|| {
            Error::NotFound(format!("Sorry, I don't have timezone information for {}.", city))
        })?;

        Ok(json!({ "report": time_report(city, tz, Utc::now()) }))
    }
}
