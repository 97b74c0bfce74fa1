//! Minimal RFC 4180 reader and writer.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("Unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),

    #[error("Unexpected character after closing quote on line {0}")]
    TrailingAfterQuote(usize),
}

/// Quotes a field when it contains a delimiter, quote, or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Appends one CRLF-terminated record.
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Parses `input` into records. Blank lines are skipped; quoted fields may
/// span lines.
pub fn parse(input: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut chars = input.trim_start_matches('\u{feff}').chars().peekable();
    let mut line = 1usize;
    let mut quote_line = 0usize;
    let mut in_quotes = false;
    let mut after_quote = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            ',' => {
                record.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                finish_record(&mut records, &mut record, &mut field);
                after_quote = false;
                line += 1;
            }
            '"' if field.is_empty() && !after_quote => {
                in_quotes = true;
                quote_line = line;
            }
            _ if after_quote => return Err(CsvError::TrailingAfterQuote(line)),
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote(quote_line));
    }
    finish_record(&mut records, &mut record, &mut field);
    Ok(records)
}

fn finish_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    record.push(std::mem::take(field));
    let fields = std::mem::take(record);
    if !(fields.len() == 1 && fields[0].trim().is_empty()) {
        records.push(fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn writer_terminates_with_crlf() {
        let mut out = String::new();
        write_record(&mut out, &["id", "title"]);
        write_record(&mut out, &["1", "Call, then email"]);
        assert_eq!(out, "id,title\r\n1,\"Call, then email\"\r\n");
    }

    #[test]
    fn parses_quoted_fields_and_blank_lines() {
        let input = "title,description\r\n\"Quarterly, review\",\"He said \"\"now\"\"\"\n\nsecond,\"multi\nline\"\n";
        let records = parse(input).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], vec!["Quarterly, review", "He said \"now\""]);
        assert_eq!(records[2], vec!["second", "multi\nline"]);
    }

    #[test]
    fn keeps_empty_trailing_fields() {
        assert_eq!(parse("a,,\n").unwrap(), vec![vec!["a", "", ""]]);
    }

    #[test]
    fn reports_malformed_quotes() {
        assert_eq!(parse("a\n\"open").unwrap_err(), CsvError::UnterminatedQuote(2));
        assert_eq!(parse("\"a\"b").unwrap_err(), CsvError::TrailingAfterQuote(1));
    }
}
