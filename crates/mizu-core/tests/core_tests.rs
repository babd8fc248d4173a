//! Tests for mizu-core: result logs, type-indexed lookup, store keys, errors

use mizu_core::*;

// ===========================================================================
// Type-indexed lookup
// ===========================================================================

#[test]
fn lookup_returns_first_match_not_last() {
    let log = ResultLog::from_records(vec![
        ChangeRecord::created("pkg::a::X", "0xA"),
        ChangeRecord::created("pkg::a::Y", "0xB"),
        ChangeRecord::created("pkg::a::X", "0xC"),
    ]);
    for _ in 0..10 {
        assert_eq!(find_one_by_type(&log, "pkg::a::X"), Some("0xA"));
    }
    assert_eq!(log.find_one_by_type("pkg::a::Y"), Some("0xB"));
}

#[test]
fn lookup_absent_type() {
    let log = ResultLog::from_records(vec![
        ChangeRecord::created("pkg::a::X", "0xA"),
        ChangeRecord::created("pkg::a::Y", "0xB"),
    ]);
    assert_eq!(find_one_by_type(&log, "pkg::a::Z"), None);
}

#[test]
fn lookup_widget_scenario() {
    let log = ResultLog::from_records(vec![
        ChangeRecord::created("pkg::a::Widget", "0x1"),
        ChangeRecord::created("pkg::a::WidgetCap", "0x2"),
    ]);
    assert_eq!(find_one_by_type(&log, "pkg::a::Widget"), Some("0x1"));
    assert_eq!(find_one_by_type(&log, "pkg::a::WidgetCap"), Some("0x2"));
    assert_eq!(find_one_by_type(&log, "pkg::a::Gadget"), None);
}

#[test]
fn lookup_is_exact_no_prefix_match() {
    let log = ResultLog::from_records(vec![ChangeRecord::created("pkg::a::WidgetCap", "0x2")]);
    assert_eq!(find_one_by_type(&log, "pkg::a::Widget"), None);
    assert_eq!(find_one_by_type(&log, "pkg::a::"), None);
}

#[test]
fn lookup_disambiguates_generic_instantiations() {
    let policy = "0x2::transfer_policy::TransferPolicy<0xp::mizu_nft::MizuNFT>";
    let cap = "0x2::transfer_policy::TransferPolicyCap<0xp::mizu_nft::MizuNFT>";
    let log = ResultLog::from_records(vec![
        ChangeRecord::created(cap, "0xcap"),
        ChangeRecord::created(policy, "0xpolicy"),
        ChangeRecord::created(
            "0x2::transfer_policy::TransferPolicy<0xp::other::Thing>",
            "0xother",
        ),
    ]);
    assert_eq!(find_one_by_type(&log, policy), Some("0xpolicy"));
    assert_eq!(find_one_by_type(&log, cap), Some("0xcap"));
}

#[test]
fn lookup_ignores_non_created_kinds() {
    let log = ResultLog::from_records(vec![
        ChangeRecord::mutated(Some("0x2::coin::Coin<0x2::sui::SUI>".into())),
        ChangeRecord::other(Some("0x2::coin::Coin<0x2::sui::SUI>".into())),
        ChangeRecord::published(),
    ]);
    assert_eq!(find_one_by_type(&log, "0x2::coin::Coin<0x2::sui::SUI>"), None);
}

// ===========================================================================
// ResultLog
// ===========================================================================

#[test]
fn result_log_serializes_lowercase_kinds() {
    let log = ResultLog::builder()
        .digest("D1")
        .published("0xpkg")
        .created("0xpkg::mint::Mint", "0x9")
        .build();
    let json = serde_json::to_value(&log).unwrap();
    assert_eq!(json["digest"], "D1");
    assert_eq!(json["records"][0]["kind"], "published");
    assert_eq!(json["records"][1]["kind"], "created");
    assert_eq!(json["records"][1]["identifier"], "0x9");
    assert_eq!(json["published"][0], "0xpkg");
}

#[test]
fn result_log_without_publish_has_no_package() {
    let log = ResultLog::from_records(vec![ChangeRecord::created("a::b::C", "0x1")]);
    assert!(log.published_package().is_none());
    assert!(log.digest().is_none());
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn missing_key_display_names_the_key() {
    let key = StoreKey::parse("mint.mint_cap").unwrap();
    let err = Error::MissingKey(key);
    assert_eq!(err.to_string(), "missing key: mint.mint_cap");
    assert!(err.is_missing_key());
}

#[test]
fn invalid_key_error_carries_reason() {
    let err = StoreKey::parse("a..b").unwrap_err();
    assert!(err.to_string().contains("a..b"));
    assert!(err.to_string().contains("empty segment"));
}

#[test]
fn scalar_untagged_serde() {
    let n: Scalar = serde_json::from_str("25").unwrap();
    assert_eq!(n.as_u64(), Some(25));
    let s: Scalar = serde_json::from_str(r#""0xabc""#).unwrap();
    assert_eq!(s.as_str(), Some("0xabc"));
    assert_eq!(serde_json::to_string(&Scalar::from("0x1")).unwrap(), r#""0x1""#);
}
