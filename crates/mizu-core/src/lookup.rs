//! Type-indexed lookup over a result log.

use crate::types::ResultLog;

/// Identifier of the first `Created` record whose declared type is exactly `declared_type`.
///
/// Matching is plain string equality, generic parameters included, so
/// `TransferPolicy<P::Nft>` and `TransferPolicyCap<P::Nft>` never shadow each other.
/// When a submission creates several objects of the same type the earliest one wins.
pub fn find_one_by_type<'a>(log: &'a ResultLog, declared_type: &str) -> Option<&'a str> {
    log.iter()
        .find(|r| r.is_created() && r.declared_type() == Some(declared_type))
        .and_then(|r| r.identifier())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeRecord;

    #[test]
    fn mutated_records_never_match() {
        let log = ResultLog::from_records(vec![
            ChangeRecord::mutated(Some("pkg::a::Widget".into())),
            ChangeRecord::created("pkg::a::Widget", "0x2"),
        ]);
        assert_eq!(find_one_by_type(&log, "pkg::a::Widget"), Some("0x2"));
    }

    #[test]
    fn empty_log() {
        assert_eq!(find_one_by_type(&ResultLog::default(), "pkg::a::Widget"), None);
    }
}
