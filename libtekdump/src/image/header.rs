use std::{io::BufRead, sync::LazyLock};

use bon::Builder;
use chrono::NaiveDate;
use nom::{
    character::complete::{digit0, multispace0, one_of},
    combinator::opt,
    sequence::{pair, preceded},
    IResult,
};
use regex::Regex;
use tracing::{debug, warn};

use crate::{error::Stage, reader::LineReader, Error, MAX_DIMENSION};

/// Shortest acceptable info line (the first header line)
pub const MIN_INFO_LINE_LEN: usize = 19;

/// Date layouts the scope has been seen to use, tried in order
const DATE_FORMATS: [&str; 4] = ["%d-%b-%y", "%d-%b-%Y", "%m/%d/%y", "%Y-%m-%d"];

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"date:[ \t]*(\S*)").expect("valid date regex"));
static TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time:[ \t]*(\S+)").expect("valid time regex"));

/// Capture metadata sent by the scope ahead of the image body
///
/// The header is three lines: an info line holding `date:` and optionally `time:`,
/// then the column count, then the row count.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct CaptureHeader {
    /// The date as sent by the scope
    pub date: String,
    /// The time as sent by the scope, if present
    pub time: Option<String>,
    /// Pixels per row
    pub columns: usize,
    /// Number of rows
    pub rows: usize,
}

impl CaptureHeader {
    /// Reads the three header lines from `lines`
    ///
    /// # Errors
    ///
    /// This function errors if the input ends before the header is complete, or if the
    /// header is malformed:
    /// - the info line is too short or has no `date:` field
    /// - the column or row count is not a number in `1..=MAX_DIMENSION`
    pub fn read_from<R: BufRead>(lines: &mut LineReader<R>) -> Result<Self, Error> {
        let info = next_header_line(lines)?;
        let (date, time) = parse_info_line(&info)?;
        let columns = parse_dimension(&next_header_line(lines)?, "column")?;
        let rows = parse_dimension(&next_header_line(lines)?, "row")?;

        let header = Self {
            date,
            time,
            columns,
            rows,
        };
        debug!(
            "header: date={} time={} ncols={} nrows={}",
            header.date,
            header.time.as_deref().unwrap_or_default(),
            header.columns,
            header.rows
        );
        Ok(header)
    }

    /// Tries to interpret [`Self::date`] as a calendar date
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let date = self.date.trim_matches('"');
        let parsed = DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date, format).ok());
        if parsed.is_none() {
            warn!("Unrecognized date format: {date}");
        }
        parsed
    }
}

fn next_header_line<R: BufRead>(lines: &mut LineReader<R>) -> Result<String, Error> {
    match lines.next_line()? {
        Some(line) => Ok(String::from_utf8_lossy(line).into_owned()),
        None => Err(Error::UnexpectedEndOfInput {
            stage: Stage::Header,
        }),
    }
}

/// Extracts the date and optional time from the info line
pub(crate) fn parse_info_line(line: &str) -> Result<(String, Option<String>), Error> {
    if line.len() < MIN_INFO_LINE_LEN {
        return Err(Error::MalformedHeader(format!(
            "short header: [{}] {line}",
            line.len()
        )));
    }
    let date = DATE_REGEX
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| Error::MalformedHeader("no date".into()))?;
    let time = TIME_REGEX
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned());
    Ok((date.to_owned(), time))
}

/// Best-effort integer parse of the leading digits, `0` on garbage
fn lenient_int(input: &str) -> i64 {
    let parsed: IResult<&str, (Option<char>, &str)> =
        preceded(multispace0, pair(opt(one_of("+-")), digit0))(input);
    let Ok((_, (sign, digits))) = parsed else {
        return 0;
    };
    let value = if digits.is_empty() {
        0
    } else {
        digits.parse::<i64>().unwrap_or(i64::MAX)
    };
    if sign == Some('-') {
        -value
    } else {
        value
    }
}

/// Parses a row or column count line
pub(crate) fn parse_dimension(line: &str, what: &str) -> Result<usize, Error> {
    let value = lenient_int(line);
    usize::try_from(value)
        .ok()
        .filter(|v| (1..=MAX_DIMENSION).contains(v))
        .ok_or_else(|| {
            Error::MalformedHeader(format!(
                "{what} count must be within 1..={MAX_DIMENSION}, got {value} from '{line}'"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_line_with_date_and_time() {
        let (date, time) =
            parse_info_line("11801A date: 23-MAY-97 time: 10:41:07 hardcopy").unwrap();
        assert_eq!(date, "23-MAY-97");
        assert_eq!(time.as_deref(), Some("10:41:07"));
    }

    #[test]
    fn time_is_optional() {
        let (date, time) = parse_info_line("screen dump date: 23-MAY-97").unwrap();
        assert_eq!(date, "23-MAY-97");
        assert_eq!(time, None);
    }

    #[test]
    fn info_line_needs_date() {
        assert!(matches!(
            parse_info_line("11801A time: 10:41:07 hardcopy"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_info_line("date: 23-MAY"),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn counts_parse_leniently() {
        assert_eq!(lenient_int("552"), 552);
        assert_eq!(lenient_int("  704 rows"), 704);
        assert_eq!(lenient_int("+12"), 12);
        assert_eq!(lenient_int("-3"), -3);
        assert_eq!(lenient_int("garbage"), 0);
        assert_eq!(lenient_int(""), 0);
    }

    #[test]
    fn dimensions_are_bounded() {
        assert_eq!(parse_dimension("552", "column").unwrap(), 552);
        assert!(matches!(
            parse_dimension("garbage", "column"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_dimension("-5", "row"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_dimension("99999", "row"),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn parses_scope_dates() {
        let header = CaptureHeader::builder()
            .date("23-MAY-97".to_owned())
            .columns(1)
            .rows(1)
            .build();
        assert_eq!(header.parsed_date(), NaiveDate::from_ymd_opt(1997, 5, 23));

        let header = CaptureHeader::builder()
            .date("someday".to_owned())
            .columns(1)
            .rows(1)
            .build();
        assert_eq!(header.parsed_date(), None);
    }
}
