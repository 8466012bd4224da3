//! Number-format classification and serial-date decoding.
//!
//! Excel number format codes are a mini-language. A code can have up to 4
//! sections separated by semicolons (`positive;negative;zero;text`) and may
//! include quoted literals, backslash-escaped characters, colors (`[Red]`),
//! conditions (`[>100]`), locale/currency codes (`[$-409]`), and the
//! elapsed-time forms `[h]`, `[m]`, `[s]`.
//!
//! This module answers one question about a code — does it denote a
//! date/time? — and converts serial date numbers into calendar components.

use serde::Serialize;

/// The workbook-level serial-date calendar system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSystem {
    /// Day 1 = 1899-12-31, with Excel's fictitious 1900-02-29 at serial 60.
    #[serde(rename = "1900")]
    Excel1900,
    /// Day 0 = 1904-01-01.
    #[serde(rename = "1904")]
    Excel1904,
}

/// Built-in number format codes (ids 0-49 are predefined by Excel).
/// See: ECMA-376 Part 1, Section 18.8.30
#[must_use]
pub const fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        // Currency formats (5-8)
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        // Accounting formats (41-44)
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

/// A date/time code resolved from a format section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateToken {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    ElapsedHours,
    ElapsedMinutes,
    ElapsedSeconds,
}

/// Check whether a format code denotes a date/time.
///
/// Only the first semicolon-separated section decides (Excel applies it to
/// positive, hence date-valued, content). Quoted literals, escaped
/// characters, and bracketed color/condition/locale sections never count;
/// the elapsed-time brackets `[h]`, `[m]`, `[s]` do.
#[must_use]
pub fn is_date_format(format_code: &str) -> bool {
    !date_tokens(first_section(format_code)).is_empty()
}

/// Extract the first unescaped-semicolon-separated section of a format code.
fn first_section(format_code: &str) -> &str {
    let bytes = format_code.as_bytes();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut i = 0;

    while let Some(&b) = bytes.get(i) {
        match b {
            b'"' if !in_brackets => in_quotes = !in_quotes,
            b'\\' if !in_quotes && !in_brackets => i += 1,
            b'[' if !in_quotes => in_brackets = true,
            b']' if !in_quotes => in_brackets = false,
            b';' if !in_quotes && !in_brackets => {
                return format_code.get(..i).unwrap_or(format_code);
            }
            _ => {}
        }
        i += 1;
    }

    format_code
}

/// Lex one format section into its date/time codes.
///
/// The meaning of `m` is context-sensitive: it denotes minutes when an
/// `h`/`hh` token appeared earlier in the section, or an `s`/`ss` token
/// follows later; otherwise it denotes month. Tracked as lexer state, not a
/// pattern shortcut, to match Excel's resolution rule.
fn date_tokens(section: &str) -> Vec<DateToken> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    // true between an h/hh token and the next s/ss token
    let mut in_time_context = false;

    while i < chars.len() {
        let Some(&c) = chars.get(i) else { break };
        let c_lower = c.to_ascii_lowercase();

        match c {
            '"' => {
                // Quoted literal run
                i += 1;
                while chars.get(i).is_some_and(|&q| q != '"') {
                    i += 1;
                }
                i += 1;
            }
            '\\' => {
                // Escaped single character
                i += 2;
            }
            '[' => {
                let close = (i + 1..chars.len()).find(|&j| chars.get(j) == Some(&']'));
                let Some(close) = close else {
                    // Unterminated bracket: nothing after it can be a code
                    break;
                };
                if let Some(token) = elapsed_token(chars.get(i + 1..close).unwrap_or(&[])) {
                    tokens.push(token);
                    if token == DateToken::ElapsedHours {
                        in_time_context = true;
                    } else if token == DateToken::ElapsedSeconds {
                        in_time_context = false;
                    }
                }
                i = close + 1;
            }
            '_' | '*' => {
                // Accounting alignment: skip the width/fill character
                i += 2;
            }
            _ if c_lower == 'a' => {
                // AM/PM and A/P markers; their letters are not date codes
                if matches_ignore_case(&chars, i, "am/pm") {
                    i += 5;
                } else if matches_ignore_case(&chars, i, "a/p") {
                    i += 3;
                } else {
                    i += 1;
                }
            }
            _ => {
                let mut count = 1;
                while chars
                    .get(i + count)
                    .is_some_and(|n| n.to_ascii_lowercase() == c_lower)
                {
                    count += 1;
                }

                match c_lower {
                    'y' => tokens.push(DateToken::Year),
                    'd' => tokens.push(DateToken::Day),
                    'h' => {
                        in_time_context = true;
                        tokens.push(DateToken::Hour);
                    }
                    's' => {
                        in_time_context = false;
                        tokens.push(DateToken::Second);
                    }
                    'm' => {
                        let is_minute =
                            in_time_context || is_followed_by_seconds(&chars, i + count);
                        tokens.push(if is_minute {
                            DateToken::Minute
                        } else {
                            DateToken::Month
                        });
                    }
                    _ => {}
                }
                i += count;
            }
        }
    }

    tokens
}

/// Recognize `[h]`, `[hh]`, `[m]`, `[mm]`, `[s]`, `[ss]` bracket contents.
fn elapsed_token(inner: &[char]) -> Option<DateToken> {
    let first = inner.first()?.to_ascii_lowercase();
    if !inner
        .iter()
        .all(|c| c.to_ascii_lowercase() == first)
    {
        return None;
    }
    match first {
        'h' => Some(DateToken::ElapsedHours),
        'm' => Some(DateToken::ElapsedMinutes),
        's' => Some(DateToken::ElapsedSeconds),
        _ => None,
    }
}

/// Check if an `m` run at `start` is followed by an `s` code before any other
/// date component, making it minutes rather than month.
fn is_followed_by_seconds(chars: &[char], start: usize) -> bool {
    let mut i = start;
    while let Some(&ch) = chars.get(i) {
        match ch.to_ascii_lowercase() {
            's' => return true,
            'h' | 'y' | 'd' | 'm' => return false,
            _ => i += 1,
        }
    }
    false
}

fn matches_ignore_case(chars: &[char], start: usize, pattern: &str) -> bool {
    pattern.chars().enumerate().all(|(offset, p)| {
        chars
            .get(start + offset)
            .is_some_and(|c| c.eq_ignore_ascii_case(&p))
    })
}

/// Convert a serial date to (year, month, day, hour, minute, second).
///
/// 1900 system: day 1 = 1899-12-31, and serial 60 maps to the fictitious
/// 1900-02-29 that Excel's own arithmetic contains — preserved, not
/// corrected. 1904 system: day 0 = 1904-01-01. The fractional part is a
/// time-of-day offset in days, rounded to the nearest second.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn serial_to_components(serial: f64, system: DateSystem) -> (i32, u32, u32, u32, u32, u32) {
    let mut days = serial.floor() as i64;
    let time_frac = serial.fract().abs();

    #[allow(clippy::cast_sign_loss)]
    let mut total_seconds = (time_frac * 86_400.0).round() as u32;
    if total_seconds >= 86_400 {
        // Rounding carried past midnight
        days += 1;
        total_seconds = 0;
    }
    let hour = total_seconds / 3600;
    let minute = (total_seconds % 3600) / 60;
    let second = total_seconds % 60;

    if matches!(system, DateSystem::Excel1900) && days == 60 {
        // The non-existent leap day Excel inherited from Lotus 1-2-3.
        return (1900, 2, 29, hour, minute, second);
    }

    // Julian Day Numbers: 1899-12-30 = 2415019, 1904-01-01 = 2416481.
    let jdn = match system {
        DateSystem::Excel1900 => days + 2_415_019,
        DateSystem::Excel1904 => days + 2_416_481,
    };

    let (year, month, day) = jdn_to_ymd(jdn);
    (year, month, day, hour, minute, second)
}

/// Convert a Julian Day Number to (year, month, day) in the proleptic
/// Gregorian calendar.
///
/// Algorithm from:
/// <https://en.wikipedia.org/wiki/Julian_day#Julian_or_Gregorian_calendar_from_Julian_day_number>
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn jdn_to_ymd(jdn: i64) -> (i32, u32, u32) {
    const Y: i64 = 4716;
    const J: i64 = 1401;
    const M: i64 = 2;
    const N: i64 = 12;
    const R: i64 = 4;
    const P: i64 = 1461;
    const V: i64 = 3;
    const U: i64 = 5;
    const S: i64 = 153;
    const W: i64 = 2;
    const B: i64 = 274_277;
    const C: i64 = -38;

    let f = jdn + J + (((4 * jdn + B) / 146_097) * 3) / 4 + C;
    let e = R * f + V;
    let g = (e % P) / R;
    let h = U * g + W;

    let day = (h % S) / U + 1;
    let month = ((h / S + M) % N) + 1;
    let year = (e / P) - Y + (N + M - month) / N;

    (year as i32, month as u32, day as u32)
}
