use billsync_core::RawBillRecord;
use csv::StringRecord;
use std::io::Read;

use crate::error::{IngestError, RowFault};

pub const REQUIRED_COLUMNS: [&str; 3] = ["Amount", "Vendor Name", "Date"];

/// Positions of the required columns within the uploaded header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub amount: usize,
    pub vendor_name: usize,
    pub date: usize,
}

impl ColumnLayout {
    /// Locates the required columns, ignoring case, surrounding whitespace and
    /// order. Extra columns are allowed; the first duplicate wins.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let position = |column: &str| {
            let wanted = column.to_lowercase();
            normalized.iter().position(|h| *h == wanted)
        };

        let found = REQUIRED_COLUMNS.map(position);
        match found {
            [Some(amount), Some(vendor_name), Some(date)] => Ok(ColumnLayout {
                amount,
                vendor_name,
                date,
            }),
            _ => Err(IngestError::SchemaValidation {
                missing: REQUIRED_COLUMNS
                    .iter()
                    .zip(found)
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(column, _)| *column)
                    .collect(),
            }),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Lazy, single-pass sequence of parsed bills. Yields nothing further once an
/// error has been returned.
pub struct BillRows<R> {
    records: csv::StringRecordsIntoIter<R>,
    layout: ColumnLayout,
    failed: bool,
}

impl<R: Read> Iterator for BillRows<R> {
    type Item = Result<RawBillRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let item = match self.records.next()? {
            Ok(record) => parse_row(&record, &self.layout),
            Err(e) => Err(malformed(e)),
        };
        self.failed = item.is_err();
        Some(item)
    }
}

/// Validates the header row and returns an iterator over the data rows.
/// No data row is read when the header is rejected.
pub fn read_bills<R: Read>(data: R) -> Result<BillRows<R>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers().map_err(malformed)?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    Ok(BillRows {
        records: reader.into_records(),
        layout,
        failed: false,
    })
}

/// Parses a whole upload into raw bills. Any bad row fails the batch.
pub fn parse_and_validate(data: &[u8]) -> Result<Vec<RawBillRecord>, IngestError> {
    read_bills(data)?.collect()
}

fn parse_row(record: &StringRecord, layout: &ColumnLayout) -> Result<RawBillRecord, IngestError> {
    let fail = |reason: RowFault| IngestError::RowParsing {
        line: record.position().map(|p| p.line()),
        row: record.iter().collect::<Vec<_>>().join(","),
        reason,
    };
    let field = |idx: usize, column: &'static str| {
        record
            .get(idx)
            .ok_or_else(|| fail(RowFault::MissingField(column)))
    };

    let amount: f64 = field(layout.amount, "Amount")?
        .trim()
        .parse()
        .map_err(|e| fail(RowFault::InvalidAmount(e)))?;
    if !amount.is_finite() {
        return Err(fail(RowFault::NonFiniteAmount));
    }

    Ok(RawBillRecord {
        amount,
        vendor_name: field(layout.vendor_name, "Vendor Name")?.to_string(),
        date: field(layout.date, "Date")?.to_string(),
    })
}

fn malformed(e: csv::Error) -> IngestError {
    IngestError::RowParsing {
        line: e.position().map(|p| p.line()),
        row: String::new(),
        reason: RowFault::Malformed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> StringRecord {
        StringRecord::from(cols.to_vec())
    }

    fn missing(result: Result<ColumnLayout, IngestError>) -> Vec<&'static str> {
        match result {
            Err(IngestError::SchemaValidation { missing }) => missing,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    // ── ColumnLayout ──────────────────────────────────────────────────────────

    #[test]
    fn layout_exact_headers() {
        let layout = ColumnLayout::from_headers(&headers(&["Amount", "Vendor Name", "Date"])).unwrap();
        assert_eq!(
            layout,
            ColumnLayout {
                amount: 0,
                vendor_name: 1,
                date: 2
            }
        );
    }

    #[test]
    fn layout_ignores_case_whitespace_and_order() {
        let layout =
            ColumnLayout::from_headers(&headers(&["  date", "VENDOR NAME ", "aMoUnT"])).unwrap();
        assert_eq!(layout.amount, 2);
        assert_eq!(layout.vendor_name, 1);
        assert_eq!(layout.date, 0);
    }

    #[test]
    fn layout_accepts_extra_columns() {
        let layout =
            ColumnLayout::from_headers(&headers(&["Notes", "Amount", "Category", "Vendor Name", "Date"]))
                .unwrap();
        assert_eq!(layout.amount, 1);
        assert_eq!(layout.vendor_name, 3);
        assert_eq!(layout.date, 4);
    }

    #[test]
    fn layout_first_duplicate_wins() {
        let layout =
            ColumnLayout::from_headers(&headers(&["Amount", "Vendor Name", "Date", "amount"])).unwrap();
        assert_eq!(layout.amount, 0);
    }

    #[test]
    fn layout_strips_byte_order_mark() {
        let layout =
            ColumnLayout::from_headers(&headers(&["\u{feff}Amount", "Vendor Name", "Date"])).unwrap();
        assert_eq!(layout.amount, 0);
    }

    #[test]
    fn layout_missing_date_rejected_in_any_casing() {
        assert_eq!(missing(ColumnLayout::from_headers(&headers(&["Amount", "Vendor Name"]))), vec!["Date"]);
        assert_eq!(
            missing(ColumnLayout::from_headers(&headers(&["VENDOR NAME", "amount", "Memo"]))),
            vec!["Date"]
        );
    }

    #[test]
    fn layout_reports_every_missing_column() {
        assert_eq!(
            missing(ColumnLayout::from_headers(&headers(&["Total"]))),
            vec!["Amount", "Vendor Name", "Date"]
        );
    }

    // ── read_bills / parse_and_validate ───────────────────────────────────────

    #[test]
    fn parse_basic_upload() {
        let data = b"Amount,Vendor Name,Date\n100,Acme,2024-01-01\n25.5, Corner Shop ,01/15/2024\n";
        let bills = parse_and_validate(data).unwrap();
        assert_eq!(
            bills,
            vec![
                RawBillRecord::new(100.0, "Acme", "2024-01-01"),
                RawBillRecord::new(25.5, " Corner Shop ", "01/15/2024"),
            ]
        );
    }

    #[test]
    fn parse_reordered_columns_with_extras() {
        let data = b"date,memo,vendor name,AMOUNT\n2024-02-02,lunch,Bob,50\n";
        let bills = parse_and_validate(data).unwrap();
        assert_eq!(bills, vec![RawBillRecord::new(50.0, "Bob", "2024-02-02")]);
    }

    #[test]
    fn parse_quoted_vendor_with_comma() {
        let data = b"Amount,Vendor Name,Date\n10,\"Acme, Inc.\",2024-01-01\n";
        let bills = parse_and_validate(data).unwrap();
        assert_eq!(bills[0].vendor_name, "Acme, Inc.");
    }

    #[test]
    fn parse_amount_whitespace_and_sign() {
        let data = b"Amount,Vendor Name,Date\n -12.75 ,Refund,2024-01-01\n";
        let bills = parse_and_validate(data).unwrap();
        assert_eq!(bills[0].amount, -12.75);
    }

    #[test]
    fn header_only_is_empty_batch() {
        let bills = parse_and_validate(b"Amount,Vendor Name,Date\n").unwrap();
        assert!(bills.is_empty());
    }

    #[test]
    fn empty_input_fails_schema() {
        let err = parse_and_validate(b"").unwrap_err();
        assert!(matches!(err, IngestError::SchemaValidation { ref missing } if missing.len() == 3));
    }

    #[test]
    fn bad_header_rejected_before_rows() {
        // The data row is garbage; the header error must win.
        let data = b"Amount,Vendor Name\nnot-a-number,Acme\n";
        let err = parse_and_validate(data).unwrap_err();
        assert!(matches!(err, IngestError::SchemaValidation { ref missing } if missing == &vec!["Date"]));
    }

    #[test]
    fn invalid_amount_fails_with_row_context() {
        let data = b"Amount,Vendor Name,Date\n10,Acme,2024-01-01\nabc,Bob,2024-01-02\n";
        match parse_and_validate(data).unwrap_err() {
            IngestError::RowParsing { line, row, reason } => {
                assert_eq!(line, Some(3));
                assert_eq!(row, "abc,Bob,2024-01-02");
                assert!(matches!(reason, RowFault::InvalidAmount(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_amount_is_invalid() {
        let data = b"Amount,Vendor Name,Date\n,Acme,2024-01-01\n";
        assert!(matches!(
            parse_and_validate(data),
            Err(IngestError::RowParsing {
                reason: RowFault::InvalidAmount(_),
                ..
            })
        ));
    }

    #[test]
    fn non_finite_amount_rejected() {
        let data = b"Amount,Vendor Name,Date\nNaN,Acme,2024-01-01\n";
        assert!(matches!(
            parse_and_validate(data),
            Err(IngestError::RowParsing {
                reason: RowFault::NonFiniteAmount,
                ..
            })
        ));
    }

    #[test]
    fn short_row_reports_missing_field() {
        let data = b"Amount,Vendor Name,Date\n10,Acme\n";
        assert!(matches!(
            parse_and_validate(data),
            Err(IngestError::RowParsing {
                reason: RowFault::MissingField("Date"),
                ..
            })
        ));
    }

    #[test]
    fn rows_stop_after_first_error() {
        let data = b"Amount,Vendor Name,Date\nx,Acme,2024-01-01\n5,Bob,2024-01-02\n";
        let mut rows = read_bills(&data[..]).unwrap();
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }

    #[test]
    fn rows_are_pulled_lazily() {
        let data = b"Amount,Vendor Name,Date\n1,A,2024-01-01\n2,B,2024-01-02\n";
        let mut rows = read_bills(&data[..]).unwrap();
        assert_eq!(rows.next().unwrap().unwrap().amount, 1.0);
        assert_eq!(rows.next().unwrap().unwrap().amount, 2.0);
        assert!(rows.next().is_none());
    }
}
