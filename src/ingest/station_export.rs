/// Station CSV Export Parser
///
/// Parses the fixed-format hydrological station exports: an arbitrary
/// preamble, a line matching `^Hydro` (case-insensitive) whose nearest
/// preceding non-blank line carries `<station> <location...>`, then a
/// tabular data section introduced by a row whose first field is the
/// literal `Year`.
///
/// Rows are `[year, YYYYMMDD, time, level, flow, ...]`; trailing columns
/// are ignored and malformed rows are skipped rather than failing the
/// file.
use chrono::NaiveDate;
use csv::StringRecord;
use regex::Regex;
use tracing::{debug, warn};

const BOM: char = '\u{feff}';

/// Station metadata sniffed once from the header region of a file.
///
/// Both fields stay empty when the marker or the preceding station line
/// is missing; that is accepted silently, not treated as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationHeader {
    pub station: String,
    pub location: String,
}

impl StationHeader {
    /// Scan the raw file text for the `Hydro` marker and split the
    /// nearest preceding non-blank line into station code and location.
    pub fn scan(text: &str) -> Self {
        let marker = Regex::new(r"(?i)^hydro").unwrap();
        let lines: Vec<&str> = text.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if !marker.is_match(line.trim_start_matches(BOM).trim()) {
                continue;
            }

            // Nearest non-blank line above the marker holds the station line
            for candidate in lines[..i].iter().rev() {
                let candidate = candidate.trim_start_matches(BOM).trim();
                if candidate.is_empty() {
                    continue;
                }

                let mut parts = candidate.split_whitespace();
                let code = parts.next().unwrap_or_default();
                let location = parts.collect::<Vec<_>>().join(" ");

                // A lone token is not a station line; fall back to empty fields
                if !location.is_empty() {
                    return Self {
                        station: code.to_string(),
                        location,
                    };
                }
                break;
            }
            break;
        }

        debug!("No station header found, using empty station/location");
        Self::default()
    }
}

/// One coerced data row from the data section
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub year: i32,
    pub date: NaiveDate,
    pub time: String,
    pub level: Option<f64>,
    pub flow: Option<f64>,
}

/// True for the literal header row that opens the data section
pub fn is_data_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|field| field.trim_start_matches(BOM).trim() == "Year")
        .unwrap_or(false)
}

/// Coerce a candidate data row, or None when the row should be skipped.
///
/// The first field gates the row: it must parse as a number, which also
/// drops footer lines like `Total` and trailing blanks. Empty date or
/// time fields skip the row as well.
pub fn parse_data_row(record: &StringRecord) -> Option<DataRow> {
    let year_field = record.get(0)?.trim();
    if year_field.is_empty() {
        return None;
    }
    // Integer part of the numeric token, so "2020" and "2020.0" both gate
    let year = year_field.parse::<f64>().ok().filter(|v| v.is_finite())? as i32;

    let date_field = record.get(1)?.trim();
    let time_field = record.get(2)?.trim();
    if date_field.is_empty() || time_field.is_empty() {
        return None;
    }

    let date = parse_compact_date(date_field)?;
    let level = parse_measurement(record.get(3));
    let flow = parse_measurement(record.get(4));

    Some(DataRow {
        year,
        date,
        time: time_field.to_string(),
        level,
        flow,
    })
}

/// Parse an 8-digit `YYYYMMDD` token into a calendar date.
///
/// Tokens of the wrong length, with non-digit characters, or naming an
/// impossible date (month 13, day 32) reject the row. The storage column
/// is a real DATE, so such values cannot be passed through.
fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        warn!("Malformed date token {:?}, skipping row", raw);
        return None;
    }

    match NaiveDate::parse_from_str(raw, "%Y%m%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!("Impossible calendar date {:?}, skipping row", raw);
            None
        }
    }
}

/// Level/flow coercion: empty or absent fields are NULL, and so are
/// unparseable or non-finite values (single storage policy).
fn parse_measurement(field: Option<&str>) -> Option<f64> {
    let raw = field?.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!("Unparseable measurement {:?}, storing NULL", raw);
            None
        }
    }
}
