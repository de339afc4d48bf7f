//! Semicolon separated import/export of transactions.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::{
    core::errors::{FinanceError, Result},
    ledger::{NewTransaction, Transaction, DATE_FORMAT},
};

pub const CSV_HEADERS: [&str; 6] = [
    "Transaction ID",
    "Amount",
    "Category",
    "Type",
    "Description",
    "Date",
];

const REQUIRED_HEADERS: [&str; 4] = ["Amount", "Category", "Type", "Date"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: u8 = b';';

/// Rows accepted by [`parse_csv`] plus one message per rejected row.
#[derive(Debug, Default)]
pub struct CsvImport {
    pub transactions: Vec<Transaction>,
    pub errors: Vec<String>,
}

/// Outcome of an import that was applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
    /// Number of errors [`ImportReport::summary`] spells out.
    pub preview: usize,
}

impl ImportReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Human readable status listing at most `preview` row errors.
    pub fn summary(&self) -> String {
        let mut message = format!("Import finished. Added {} transactions.", self.imported);
        if self.errors.is_empty() {
            return message;
        }
        message.push_str("\nProblems found:");
        for error in self.errors.iter().take(self.preview) {
            message.push('\n');
            message.push_str(error);
        }
        if self.errors.len() > self.preview {
            message.push_str(&format!(
                "\n... and {} more errors (see log).",
                self.errors.len() - self.preview
            ));
        }
        message
    }
}

/// Writes transactions in the export layout, without a byte-order mark.
pub fn write_csv<'a, W, I>(writer: W, transactions: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(writer);
    writer.write_record(CSV_HEADERS)?;
    let mut written = 0usize;
    for txn in transactions {
        writer.write_record([
            txn.id.clone(),
            txn.amount.to_string(),
            txn.category.clone(),
            txn.kind.label().to_string(),
            txn.description.clone(),
            txn.date.format(DATE_FORMAT).to_string(),
        ])?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Exports to `path` as UTF-8 with a byte-order mark. An empty export is refused.
pub fn export_csv<'a, I>(path: &Path, transactions: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut rows = transactions.into_iter().peekable();
    if rows.peek().is_none() {
        return Err(FinanceError::validation("no transactions to export"));
    }
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;
    let written = write_csv(&mut file, rows)?;
    file.flush()?;
    Ok(written)
}

/// Parses an import file row by row.
///
/// Missing required columns reject the whole file; any problem within a row only
/// skips that row and records a message naming its line.
pub fn parse_csv<R: Read>(reader: R) -> Result<CsvImport> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(FinanceError::validation("import file is empty")),
    };
    let columns = HeaderMap::from_record(&header)?;

    let mut import = CsvImport::default();
    for (index, result) in records.enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err
                    .position()
                    .map(|pos| pos.line())
                    .unwrap_or(fallback_line);
                import.errors.push(format!("line {}: {}", line, err));
                continue;
            }
        };
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(fallback_line);
        match columns.parse_row(&record) {
            Ok(txn) => import.transactions.push(txn),
            Err(message) => import.errors.push(format!("line {}: {}", line, message)),
        }
    }
    Ok(import)
}

struct HeaderMap {
    positions: HashMap<String, usize>,
    widest: usize,
}

impl HeaderMap {
    fn from_record(header: &StringRecord) -> Result<Self> {
        let positions: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), idx))
            .collect();
        let missing: Vec<&str> = REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|name| !positions.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(FinanceError::validation(format!(
                "required columns missing: {}",
                missing.join(", ")
            )));
        }
        let widest = positions.values().copied().max().unwrap_or(0);
        Ok(Self { positions, widest })
    }

    fn field<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.positions
            .get(name)
            .and_then(|idx| record.get(*idx))
            .map(str::trim)
            .unwrap_or("")
    }

    fn parse_row(&self, record: &StringRecord) -> std::result::Result<Transaction, String> {
        if record.len() <= self.widest {
            return Err("not enough columns".into());
        }
        let amount = self.field(record, "Amount");
        let category = self.field(record, "Category");
        let kind = self.field(record, "Type");
        let date = self.field(record, "Date");
        if [amount, category, kind, date].iter().any(|value| value.is_empty()) {
            return Err("missing required fields".into());
        }
        let description = self.field(record, "Description");
        let draft = NewTransaction::parse(amount, category, kind, description, date)
            .map_err(|err| err.to_string())?
            .with_id(self.field(record, "Transaction ID"));
        Ok(draft.into_transaction())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::ledger::TransactionKind;

    #[test]
    fn parses_rows_and_collects_errors() {
        let input = "Amount;Category;Type;Date\n\
                     10,5;Food;Expense;2024-01-02\n\
                     abc;Food;Expense;2024-01-03\n\
                     5;Food\n\
                     7;;Expense;2024-01-04\n\
                     100;Work;Income;2024-01-05\n";
        let import = parse_csv(input.as_bytes()).expect("parse");
        assert_eq!(import.transactions.len(), 2);
        assert_eq!(import.transactions[0].amount, 10.5);
        assert_eq!(import.transactions[1].kind, TransactionKind::Income);
        assert_eq!(import.errors.len(), 3);
        assert!(import.errors[0].starts_with("line 3:"), "{:?}", import.errors);
        assert!(import.errors[1].contains("not enough columns"));
        assert!(import.errors[2].contains("missing required"));
    }

    #[test]
    fn missing_required_header_rejects_file() {
        let err = parse_csv("Amount;Category;Date\n1;A;2024-01-01\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Type"));
    }

    #[test]
    fn header_with_bom_and_padding_keeps_ids() {
        let input = "\u{feff}Transaction ID; Amount; Category; Type; Description; Date\n\
                     keep-me; 3; Misc; Expense; note; 2024-02-01\n";
        let import = parse_csv(input.as_bytes()).expect("parse");
        assert!(import.errors.is_empty(), "{:?}", import.errors);
        let txn = &import.transactions[0];
        assert_eq!(txn.id, "keep-me");
        assert_eq!(txn.description, "note");
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn summary_caps_listed_errors() {
        let report = ImportReport {
            imported: 3,
            errors: (2..=9).map(|line| format!("line {}: bad", line)).collect(),
            preview: 5,
        };
        let summary = report.summary();
        assert!(summary.starts_with("Import finished. Added 3 transactions."));
        assert!(summary.contains("line 6: bad"));
        assert!(!summary.contains("line 7: bad"));
        assert!(summary.contains("and 3 more errors"));

        let clean = ImportReport {
            imported: 1,
            errors: Vec::new(),
            preview: 5,
        };
        assert_eq!(clean.summary(), "Import finished. Added 1 transactions.");
    }

    #[test]
    fn written_rows_read_back() {
        let txn = Transaction::new(
            19.99,
            "Books",
            TransactionKind::Expense,
            "novel; paperback",
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        );
        let mut buffer = Vec::new();
        write_csv(&mut buffer, [&txn]).expect("write");
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Transaction ID;Amount;Category;Type;Description;Date\n"));

        let import = parse_csv(text.as_bytes()).expect("parse");
        assert_eq!(import.transactions, vec![txn]);
    }
}
