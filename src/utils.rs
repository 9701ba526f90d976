// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

/// Accepts Unix seconds or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid time '{}', expected Unix seconds or YYYY-MM-DD", s))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date '{}'", s))?;
    Ok(midnight.and_utc().timestamp())
}

pub fn fmt_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Parses a signed decimal like `-12.34` into minor units for the given scale.
pub fn parse_minor_units(s: &str, decimal_places: u32) -> Result<i64> {
    let d = s
        .trim()
        .parse::<rust_decimal::Decimal>()
        .with_context(|| format!("Invalid amount '{}'", s))?;
    let scaled = d * rust_decimal::Decimal::from(10i64.pow(decimal_places));
    if !scaled.fract().is_zero() {
        return Err(anyhow!(
            "Amount '{}' has more than {} decimal places",
            s,
            decimal_places
        ));
    }
    i64::try_from(scaled).map_err(|_| anyhow!("Amount '{}' is out of range", s))
}

pub fn fmt_minor_units(amount: i64, decimal_places: u32) -> String {
    rust_decimal::Decimal::new(amount, decimal_places).to_string()
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_from_seconds_or_dates() {
        assert_eq!(parse_timestamp("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_timestamp("1970-01-02").unwrap(), 86_400);
        assert!(parse_timestamp("yesterday").is_err());
        assert_eq!(fmt_timestamp(86_400), "1970-01-02 00:00:00");
    }

    #[test]
    fn minor_units_respect_scale() {
        assert_eq!(parse_minor_units("-12.34", 2).unwrap(), -1234);
        assert_eq!(parse_minor_units("5", 0).unwrap(), 5);
        assert!(parse_minor_units("1.234", 2).is_err());
        assert_eq!(fmt_minor_units(-1234, 2), "-12.34");
    }
}
