//! CSV import parsers for bank and payment-app exports
//!
//! Format is auto-detected from the header line. Malformed rows (unparsable
//! date or amount) are skipped and counted in [`ImportStats`] — a bad row
//! never aborts an import. Row ids are assigned in ingestion order and are
//! the pipeline's stable tie-break identity.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Supported CSV source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Chase,
    Bofa,
    CapitalOne,
    CashApp,
    /// Column roles guessed from header names
    Generic,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chase => "chase",
            Self::Bofa => "bofa",
            Self::CapitalOne => "capitalone",
            Self::CashApp => "cashapp",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one import operation
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub imported: usize,
    /// Malformed rows skipped (bad date or amount, failed Cash App rows)
    pub skipped: usize,
    /// Files that could not be parsed at all
    pub files_failed: usize,
}

/// Detect the source format from a CSV header line
///
/// Returns None when no known signature matches; callers fall back to the
/// generic column-guessing parser.
pub fn detect_format(header: &str) -> Option<SourceFormat> {
    let header = header.trim().trim_start_matches('\u{feff}');

    // Chase: "Transaction Date,Post Date,Description,Category,Type,Amount,..."
    if header.starts_with("Transaction Date,Post Date,Description") {
        return Some(SourceFormat::Chase);
    }

    // Capital One: named columns rather than positions
    if header.contains("Transaction Description") && header.contains("Transaction Amount") {
        return Some(SourceFormat::CapitalOne);
    }

    // Cash App: "Transaction ID,Transaction Type,...,Net Amount,...,Status,..."
    if header.contains("Net Amount") && header.contains("Transaction Type") {
        return Some(SourceFormat::CashApp);
    }

    // BofA: "Date,Description,Amount,Running Bal."
    if header.starts_with("Date,Description,Amount") {
        return Some(SourceFormat::Bofa);
    }

    None
}

/// Parse one CSV stream into transactions
///
/// `next_row_id` is the first id to assign; ids increment per parsed row so
/// ingestion order is preserved across files.
pub fn parse_csv<R: Read>(
    reader: R,
    format: SourceFormat,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    match format {
        SourceFormat::Chase => parse_chase(reader, account, source_file, next_row_id),
        SourceFormat::Bofa => parse_bofa(reader, account, source_file, next_row_id),
        SourceFormat::CapitalOne => parse_capitalone(reader, account, source_file, next_row_id),
        SourceFormat::CashApp => parse_cashapp(reader, account, source_file, next_row_id),
        SourceFormat::Generic => parse_generic(reader, account, source_file, next_row_id),
    }
}

/// Load every `*.csv` in a directory, account names taken from file stems
///
/// Files that fail to parse are skipped with a warning; the call only errors
/// when nothing could be loaded at all.
pub fn load_directory(dir: &Path) -> Result<(Vec<Transaction>, ImportStats)> {
    if !dir.is_dir() {
        return Err(Error::Import(format!(
            "Input directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csv"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::Import(format!(
            "No CSV files found in {}",
            dir.display()
        )));
    }

    let mut records = Vec::new();
    let mut stats = ImportStats::default();
    for path in &paths {
        let account = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_lowercase();
        let file_name = path.file_name().and_then(|s| s.to_str()).map(String::from);

        match load_file(path, &account, file_name.as_deref(), records.len() as u64) {
            Ok((mut file_records, file_stats)) => {
                info!(
                    "Loaded {}: {} transactions ({} rows skipped)",
                    path.display(),
                    file_records.len(),
                    file_stats.skipped
                );
                records.append(&mut file_records);
                stats.imported += file_stats.imported;
                stats.skipped += file_stats.skipped;
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                stats.files_failed += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(Error::Import(
            "No valid CSV files could be loaded".to_string(),
        ));
    }

    info!(
        "Total transactions loaded: {} ({} rows skipped, {} files failed)",
        records.len(),
        stats.skipped,
        stats.files_failed
    );
    Ok((records, stats))
}

fn load_file(
    path: &Path,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let text = std::fs::read_to_string(path)?;
    let header = text.lines().next().unwrap_or("");
    let format = detect_format(header).unwrap_or(SourceFormat::Generic);
    debug!("Detected {} format for {}", format, path.display());
    parse_csv(text.as_bytes(), format, account, source_file, next_row_id)
}

/// Build a header-name → column-index map, trimming whitespace and BOM
fn header_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_string(), i))
        .collect()
}

struct RowBuilder<'a> {
    account: &'a str,
    source_file: Option<&'a str>,
    next_row_id: u64,
    records: Vec<Transaction>,
    stats: ImportStats,
}

impl<'a> RowBuilder<'a> {
    fn new(account: &'a str, source_file: Option<&'a str>, next_row_id: u64) -> Self {
        Self {
            account,
            source_file,
            next_row_id,
            records: Vec::new(),
            stats: ImportStats::default(),
        }
    }

    fn push(&mut self, date: NaiveDate, description: &str, amount: f64, bank_category: Option<&str>) {
        let mut tx = Transaction::new(self.next_row_id, date, description, amount, self.account);
        tx.bank_category = bank_category
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        tx.source_file = self.source_file.map(String::from);
        self.next_row_id += 1;
        self.stats.imported += 1;
        self.records.push(tx);
    }

    fn skip(&mut self, reason: &str) {
        warn!("Skipping malformed row: {}", reason);
        self.stats.skipped += 1;
    }

    fn finish(self) -> (Vec<Transaction>, ImportStats) {
        (self.records, self.stats)
    }
}

/// Parse Chase CSV format
/// Format: Transaction Date,Post Date,Description,Category,Type,Amount,Memo
fn parse_chase<R: Read>(
    reader: R,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut builder = RowBuilder::new(account, source_file, next_row_id);
    for result in rdr.records() {
        let record = result?;
        let (Some(date_str), Some(description), Some(amount_str)) =
            (record.get(0), record.get(2), record.get(5))
        else {
            builder.skip("missing Chase columns");
            continue;
        };
        match (parse_date(date_str), parse_amount(amount_str)) {
            (Some(date), Some(amount)) => {
                builder.push(date, description.trim(), amount, record.get(3));
            }
            _ => builder.skip(&format!("bad date/amount: {} / {}", date_str, amount_str)),
        }
    }
    Ok(builder.finish())
}

/// Parse Bank of America CSV format
/// Format: Date,Description,Amount,Running Bal.
fn parse_bofa<R: Read>(
    reader: R,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut builder = RowBuilder::new(account, source_file, next_row_id);
    for result in rdr.records() {
        let record = result?;
        let (Some(date_str), Some(description), Some(amount_str)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            builder.skip("missing BofA columns");
            continue;
        };
        match (parse_date(date_str), parse_amount(amount_str)) {
            (Some(date), Some(amount)) => builder.push(date, description.trim(), amount, None),
            _ => builder.skip(&format!("bad date/amount: {} / {}", date_str, amount_str)),
        }
    }
    Ok(builder.finish())
}

/// Parse Capital One CSV format
///
/// Amounts are exported unsigned with a Transaction Type column ('Debit' or
/// 'Credit') indicating direction; debits are negated here.
fn parse_capitalone<R: Read>(
    reader: R,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = header_index(&headers);
    let (Some(&date_col), Some(&desc_col), Some(&type_col), Some(&amount_col)) = (
        idx.get("Transaction Date"),
        idx.get("Transaction Description"),
        idx.get("Transaction Type"),
        idx.get("Transaction Amount"),
    ) else {
        return Err(Error::Import("Missing Capital One columns".to_string()));
    };

    let mut builder = RowBuilder::new(account, source_file, next_row_id);
    for result in rdr.records() {
        let record = result?;
        let (Some(date_str), Some(description), Some(type_str), Some(amount_str)) = (
            record.get(date_col),
            record.get(desc_col),
            record.get(type_col),
            record.get(amount_col),
        ) else {
            builder.skip("missing Capital One columns");
            continue;
        };
        match (parse_date(date_str), parse_amount(amount_str)) {
            (Some(date), Some(amount)) => {
                let signed = if type_str.trim().eq_ignore_ascii_case("credit") {
                    amount
                } else {
                    -amount
                };
                builder.push(date, description.trim(), signed, None);
            }
            _ => builder.skip(&format!("bad date/amount: {} / {}", date_str, amount_str)),
        }
    }
    Ok(builder.finish())
}

/// Parse a Cash App activity export
///
/// Net Amount is already signed. Only COMPLETE rows are kept. Withdrawal
/// (cash-out to bank) and Deposits (add-cash) rows carry their transaction
/// type through `bank_category` so the categorizer can force Transfer.
fn parse_cashapp<R: Read>(
    reader: R,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = header_index(&headers);
    let (Some(&date_col), Some(&type_col), Some(&amount_col), Some(&status_col)) = (
        idx.get("Date"),
        idx.get("Transaction Type"),
        idx.get("Net Amount"),
        idx.get("Status"),
    ) else {
        return Err(Error::Import("Missing Cash App columns".to_string()));
    };
    let notes_col = idx.get("Notes").copied();
    let sender_col = idx.get("Name of sender/receiver").copied();

    let mut builder = RowBuilder::new(account, source_file, next_row_id);
    for result in rdr.records() {
        let record = result?;
        let status = record.get(status_col).unwrap_or("").trim();
        if !status.eq_ignore_ascii_case("complete") {
            builder.skip(&format!("Cash App status {}", status));
            continue;
        }

        let (Some(date_str), Some(type_str), Some(amount_str)) = (
            record.get(date_col),
            record.get(type_col),
            record.get(amount_col),
        ) else {
            builder.skip("missing Cash App columns");
            continue;
        };

        // Date field may carry a time component
        let date_only = date_str.split_whitespace().next().unwrap_or(date_str);
        match (parse_date(date_only), parse_amount(amount_str)) {
            (Some(date), Some(amount)) => {
                let txn_type = type_str.trim();
                let notes = notes_col
                    .and_then(|c| record.get(c))
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                let sender = sender_col
                    .and_then(|c| record.get(c))
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                let description = cashapp_description(txn_type, notes, sender);
                builder.push(date, &description, amount, Some(txn_type));
            }
            _ => builder.skip(&format!("bad date/amount: {} / {}", date_str, amount_str)),
        }
    }
    Ok(builder.finish())
}

/// Build a readable description from Cash App row fields
fn cashapp_description(txn_type: &str, notes: Option<&str>, sender: Option<&str>) -> String {
    match txn_type {
        "P2P" => {
            let parts: Vec<&str> = [notes, sender].into_iter().flatten().collect();
            if parts.is_empty() {
                "Cash App P2P".to_string()
            } else {
                parts.join(" - ")
            }
        }
        "Withdrawal" => "Cash App Cash Out".to_string(),
        "Deposits" => "Cash App Add Cash".to_string(),
        other => notes
            .map(String::from)
            .unwrap_or_else(|| format!("Cash App {}", other)),
    }
}

/// Parse an unknown CSV by guessing column roles from header names
fn parse_generic<R: Read>(
    reader: R,
    account: &str,
    source_file: Option<&str>,
    next_row_id: u64,
) -> Result<(Vec<Transaction>, ImportStats)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let find = |hints: &[&str]| -> Option<usize> {
        lower
            .iter()
            .position(|h| hints.iter().any(|hint| h.contains(hint)))
    };
    let date_col = find(&["date"]);
    let desc_col = find(&["desc", "memo", "name", "merchant", "payee"]);
    let amount_col = find(&["amount", "debit", "credit", "sum", "total"]);

    let (Some(date_col), Some(desc_col), Some(amount_col)) = (date_col, desc_col, amount_col)
    else {
        return Err(Error::Import(format!(
            "Cannot auto-detect columns from headers: {:?}. \
             Rename columns to include 'date', 'description'/'memo', and 'amount'",
            headers.iter().collect::<Vec<_>>()
        )));
    };

    let mut builder = RowBuilder::new(account, source_file, next_row_id);
    for result in rdr.records() {
        let record = result?;
        let (Some(date_str), Some(description), Some(amount_str)) = (
            record.get(date_col),
            record.get(desc_col),
            record.get(amount_col),
        ) else {
            builder.skip("missing columns");
            continue;
        };
        match (parse_date(date_str), parse_amount(amount_str)) {
            (Some(date), Some(amount)) => builder.push(date, description.trim(), amount, None),
            _ => builder.skip(&format!("bad date/amount: {} / {}", date_str, amount_str)),
        }
    }
    Ok(builder.finish())
}

/// Parse a date string in the common US export formats
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let formats = [
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%Y-%m-%d", // 2024-01-15
        "%m-%d-%Y", // 01-15-2024
        "%Y/%m/%d", // 2024/01/15
    ];
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount string, handling currency symbols, commas, and
/// parenthesized negatives
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("01/15/2024"), Some(expected));
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-123.45"), Some(-123.45));
        assert_eq!(parse_amount("(100.00)"), Some(-100.0));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_detect_chase() {
        let header = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo";
        assert_eq!(detect_format(header), Some(SourceFormat::Chase));
    }

    #[test]
    fn test_detect_bofa() {
        assert_eq!(
            detect_format("Date,Description,Amount,Running Bal."),
            Some(SourceFormat::Bofa)
        );
    }

    #[test]
    fn test_detect_capitalone() {
        let header =
            "Transaction Date,Transaction Description,Transaction Type,Transaction Amount";
        assert_eq!(detect_format(header), Some(SourceFormat::CapitalOne));
    }

    #[test]
    fn test_detect_cashapp() {
        let header =
            "Transaction ID,Transaction Type,Date,Net Amount,Status,Notes,Name of sender/receiver";
        assert_eq!(detect_format(header), Some(SourceFormat::CashApp));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_format("Some,Random,Headers"), None);
    }

    #[test]
    fn test_parse_chase() {
        let csv = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
                   01/15/2024,01/16/2024,NETFLIX.COM,Entertainment,Sale,-15.99,\n\
                   01/14/2024,01/15/2024,STARBUCKS,Food & Drink,Sale,-5.50,\n";
        let (records, stats) =
            parse_chase(csv.as_bytes(), "checking", Some("checking.csv"), 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(stats.imported, 2);
        assert_eq!(records[0].description, "NETFLIX.COM");
        assert_eq!(records[0].amount, -15.99);
        assert_eq!(records[0].bank_category.as_deref(), Some("Entertainment"));
        assert_eq!(records[0].row_id, 0);
        assert_eq!(records[1].row_id, 1);
    }

    #[test]
    fn test_malformed_rows_skipped_not_fatal() {
        let csv = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
                   not-a-date,01/16/2024,BROKEN,Misc,Sale,-1.00,\n\
                   01/15/2024,01/16/2024,FINE,Misc,Sale,oops,\n\
                   01/15/2024,01/16/2024,GOOD,Misc,Sale,-2.00,\n";
        let (records, stats) = parse_chase(csv.as_bytes(), "checking", None, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(records[0].description, "GOOD");
    }

    #[test]
    fn test_parse_capitalone_signs() {
        let csv = "Transaction Date,Transaction Description,Transaction Type,Transaction Amount\n\
                   01/10/2024,COFFEE SHOP,Debit,4.50\n\
                   01/11/2024,PAYROLL,Credit,1200.00\n";
        let (records, _) = parse_capitalone(csv.as_bytes(), "capitalone", None, 0).unwrap();
        assert_eq!(records[0].amount, -4.50);
        assert_eq!(records[1].amount, 1200.0);
    }

    #[test]
    fn test_parse_cashapp() {
        let csv = "Transaction ID,Transaction Type,Date,Net Amount,Status,Notes,Name of sender/receiver\n\
                   a1,P2P,2024-01-10 18:00:12,-20.00,COMPLETE,Dinner,Alex\n\
                   a2,Withdrawal,2024-01-12 09:00:00,-150.00,COMPLETE,,\n\
                   a3,P2P,2024-01-13 10:00:00,-5.00,FAILED,Oops,Sam\n";
        let (records, stats) = parse_cashapp(csv.as_bytes(), "cashapp", None, 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(records[0].description, "Dinner - Alex");
        assert_eq!(records[1].description, "Cash App Cash Out");
        assert_eq!(records[1].bank_category.as_deref(), Some("Withdrawal"));
    }

    #[test]
    fn test_parse_generic_guesses_columns() {
        let csv = "Posted Date,Payee Name,Total\n\
                   2024-02-01,ACME UTILITIES,-60.00\n";
        let (records, _) = parse_generic(csv.as_bytes(), "misc", None, 5).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "ACME UTILITIES");
        assert_eq!(records[0].amount, -60.0);
        assert_eq!(records[0].row_id, 5);
    }

    #[test]
    fn test_parse_generic_unrecognized_errors() {
        let csv = "Alpha,Beta,Gamma\n1,2,3\n";
        assert!(parse_generic(csv.as_bytes(), "misc", None, 0).is_err());
    }

    #[test]
    fn test_load_directory_assigns_accounts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("checking.csv"),
            "Date,Description,Amount,Running Bal.\n01/05/2024,KROGER,-42.00,958.00\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("savings.csv"),
            "Date,Description,Amount,Running Bal.\n01/06/2024,INTEREST,1.25,501.25\n",
        )
        .unwrap();

        let (records, stats) = load_directory(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(stats.imported, 2);
        assert_eq!(records[0].account, "checking");
        assert_eq!(records[1].account, "savings");
        assert_eq!(records[0].source_file.as_deref(), Some("checking.csv"));
        // Row ids are unique across files
        assert_ne!(records[0].row_id, records[1].row_id);
    }

    #[test]
    fn test_load_directory_empty_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_directory(dir.path()).is_err());
    }
}
