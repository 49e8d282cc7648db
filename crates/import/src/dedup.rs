use billsync_core::RawBillRecord;

use crate::util::vendor_names_similar;

/// Same amount, byte-identical date text, and similar vendor names.
pub fn is_fuzzy_duplicate(a: &RawBillRecord, b: &RawBillRecord) -> bool {
    a.amount == b.amount && a.date == b.date && vendor_names_similar(&a.vendor_name, &b.vendor_name)
}

/// Drops every record that is a fuzzy duplicate of one already kept, so the
/// first occurrence wins and the relative order of survivors is preserved.
///
/// Each candidate is compared only against the records kept so far. Because
/// similarity is not transitive, a chain such as `ab`, `abc`, `abcd` keeps
/// `ab` and `abcd`: the middle record is dropped as a duplicate of `ab`, and
/// `abcd` is two edits from the only kept name.
pub fn remove_batch_duplicates(bills: Vec<RawBillRecord>) -> Vec<RawBillRecord> {
    let mut unique: Vec<RawBillRecord> = Vec::with_capacity(bills.len());

    for bill in bills {
        if !unique.iter().any(|kept| is_fuzzy_duplicate(&bill, kept)) {
            unique.push(bill);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(amount: f64, vendor: &str, date: &str) -> RawBillRecord {
        RawBillRecord::new(amount, vendor, date)
    }

    #[test]
    fn exact_duplicates_collapse() {
        let out = remove_batch_duplicates(vec![
            bill(100.0, "Acme", "2024-01-01"),
            bill(100.0, "Acme", "2024-01-01"),
        ]);
        assert_eq!(out, vec![bill(100.0, "Acme", "2024-01-01")]);
    }

    #[test]
    fn near_duplicates_collapse_to_first() {
        let out = remove_batch_duplicates(vec![
            bill(100.0, "Acme Inc", "2024-01-01"),
            bill(100.0, "Acme Inc.", "2024-01-01"),
        ]);
        assert_eq!(out, vec![bill(100.0, "Acme Inc", "2024-01-01")]);
    }

    #[test]
    fn distant_vendor_names_kept() {
        let out = remove_batch_duplicates(vec![
            bill(100.0, "Acme", "2024-01-01"),
            bill(100.0, "Acme Co", "2024-01-01"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn different_amount_or_date_text_kept() {
        let out = remove_batch_duplicates(vec![
            bill(100.0, "Acme", "2024-01-01"),
            bill(100.5, "Acme", "2024-01-01"),
            // Same calendar day, different text: not compared after parsing.
            bill(100.0, "Acme", "01/01/2024"),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn order_of_first_occurrences_preserved() {
        let out = remove_batch_duplicates(vec![
            bill(1.0, "B", "2024-01-01"),
            bill(2.0, "A", "2024-01-01"),
            bill(1.0, "b", "2024-01-01"),
            bill(3.0, "C", "2024-01-01"),
            bill(2.0, "a", "2024-01-01"),
        ]);
        let vendors: Vec<_> = out.iter().map(|b| b.vendor_name.as_str()).collect();
        assert_eq!(vendors, vec!["B", "A", "C"]);
    }

    #[test]
    fn non_transitive_chain_compares_against_kept_only() {
        let out = remove_batch_duplicates(vec![
            bill(5.0, "ab", "2024-01-01"),
            bill(5.0, "abc", "2024-01-01"),
            bill(5.0, "abcd", "2024-01-01"),
        ]);
        let vendors: Vec<_> = out.iter().map(|b| b.vendor_name.as_str()).collect();
        assert_eq!(vendors, vec!["ab", "abcd"]);
    }

    #[test]
    fn idempotent() {
        let input = vec![
            bill(100.0, "Acme Inc", "2024-01-01"),
            bill(100.0, "acme inc.", "2024-01-01"),
            bill(100.0, "Acme Co", "2024-01-01"),
            bill(7.0, "ab", "2024-01-02"),
            bill(7.0, "abc", "2024-01-02"),
            bill(7.0, "abcd", "2024-01-02"),
            bill(7.0, "abcde", "2024-01-02"),
        ];
        let once = remove_batch_duplicates(input);
        let twice = remove_batch_duplicates(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_batch() {
        assert!(remove_batch_duplicates(Vec::new()).is_empty());
    }
}
