use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::display_date;

/// Store-assigned identifier. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillId(pub String);

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BillId {
    fn from(s: &str) -> Self {
        BillId(s.to_string())
    }
}

/// A bill as read from an uploaded CSV row. The date is kept verbatim and
/// only parsed once the record is matched against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBillRecord {
    pub amount: f64,
    pub vendor_name: String,
    pub date: String,
}

impl RawBillRecord {
    pub fn new(amount: f64, vendor_name: &str, date: &str) -> Self {
        RawBillRecord {
            amount,
            vendor_name: vendor_name.to_string(),
            date: date.to_string(),
        }
    }
}

/// Insert payload for a bill that has no match in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub amount: f64,
    pub vendor_name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBill {
    pub id: BillId,
    pub amount: f64,
    pub vendor_name: String,
    pub date: DateTime<Utc>,
}

impl PersistedBill {
    pub fn from_new(id: BillId, bill: NewBill) -> Self {
        PersistedBill {
            id,
            amount: bill.amount,
            vendor_name: bill.vendor_name,
            date: bill.date,
        }
    }

    /// Display form with the timestamp rendered as `YYYY-MM-DD` (UTC).
    pub fn to_view(&self) -> BillView {
        BillView {
            id: self.id.clone(),
            amount: self.amount,
            vendor_name: self.vendor_name.clone(),
            date: display_date(&self.date),
        }
    }
}

/// What API clients see for a stored bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    pub id: BillId,
    pub amount: f64,
    pub vendor_name: String,
    pub date: String,
}

/// Normalizes a list of stored bills for display, preserving order.
pub fn simplify_dates(bills: &[PersistedBill]) -> Vec<BillView> {
    bills.iter().map(PersistedBill::to_view).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bill(id: &str, amount: f64, vendor: &str) -> PersistedBill {
        PersistedBill {
            id: BillId::from(id),
            amount,
            vendor_name: vendor.to_string(),
            date: Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn to_view_keeps_fields_and_formats_date() {
        let view = bill("x", 50.0, "Bob").to_view();
        assert_eq!(view.id, BillId::from("x"));
        assert_eq!(view.amount, 50.0);
        assert_eq!(view.vendor_name, "Bob");
        assert_eq!(view.date, "2024-02-02");
    }

    #[test]
    fn view_serializes_camel_case() {
        let json = serde_json::to_value(bill("x", 12.5, "Acme").to_view()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "x",
                "amount": 12.5,
                "vendorName": "Acme",
                "date": "2024-02-02",
            })
        );
    }

    #[test]
    fn simplify_dates_preserves_order() {
        let views = simplify_dates(&[bill("a", 1.0, "A"), bill("b", 2.0, "B")]);
        let ids: Vec<_> = views.iter().map(|v| v.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn from_new_carries_payload() {
        let new = NewBill {
            amount: 9.99,
            vendor_name: "  Corner Shop ".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        let stored = PersistedBill::from_new(BillId::from("id-1"), new.clone());
        assert_eq!(stored.vendor_name, new.vendor_name);
        assert_eq!(stored.date, new.date);
    }
}
