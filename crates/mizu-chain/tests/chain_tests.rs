//! Tests for mizu-chain: response decoding, signing, typed calls, mock submitter

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mizu_chain::keypair::{transaction_digest, ED25519_FLAG};
use mizu_chain::rpc::TransactionBlockResponse;
use mizu_chain::*;
use mizu_core::ChangeKind;
use ring::signature::{UnparsedPublicKey, ED25519};
use serde_json::json;

fn response(value: serde_json::Value) -> TransactionBlockResponse {
    serde_json::from_value(value).unwrap()
}

// ===========================================================================
// Response decoding
// ===========================================================================

#[test]
fn object_changes_become_result_log_in_order() {
    let resp = response(json!({
        "digest": "9XyZ",
        "effects": {"status": {"status": "success"}},
        "objectChanges": [
            {"type": "mutated", "sender": "0xa", "objectType": "0x2::coin::Coin<0x2::sui::SUI>",
             "objectId": "0xgas", "version": "4", "digest": "d1"},
            {"type": "published", "packageId": "0xpkg", "version": "1", "digest": "d2",
             "modules": ["mint", "water_cooler"]},
            {"type": "created", "sender": "0xa", "owner": {"AddressOwner": "0xa"},
             "objectType": "0xpkg::cooler_factory::FactoryOwnerCap", "objectId": "0xcap",
             "version": "1", "digest": "d3"},
            {"type": "created", "sender": "0xa", "owner": {"Shared": {"initial_shared_version": 1}},
             "objectType": "0xpkg::cooler_factory::CoolerFactory", "objectId": "0xfac",
             "version": "1", "digest": "d4"}
        ],
        "balanceChanges": [
            {"owner": {"AddressOwner": "0xa"}, "coinType": "0x2::sui::SUI", "amount": "-41238800"}
        ]
    }));
    assert_eq!(resp.sui_delta(), -41_238_800);

    let log = resp.into_result_log().unwrap();
    assert_eq!(log.digest(), Some("9XyZ"));
    assert_eq!(log.len(), 4);
    assert_eq!(log.records()[0].kind(), ChangeKind::Mutated);
    assert_eq!(log.published_package(), Some("0xpkg"));
    assert_eq!(
        log.find_one_by_type("0xpkg::cooler_factory::CoolerFactory"),
        Some("0xfac")
    );
    assert_eq!(
        log.find_one_by_type("0xpkg::cooler_factory::FactoryOwnerCap"),
        Some("0xcap")
    );
}

#[test]
fn failed_status_is_rejection() {
    let resp = response(json!({
        "digest": "bad",
        "effects": {"status": {"status": "failure", "error": "MoveAbort(mint, 3)"}},
        "objectChanges": []
    }));
    let err = resp.into_result_log().unwrap_err();
    assert!(err.is_rejection());
    assert!(err.to_string().contains("MoveAbort"));
}

#[test]
fn absent_object_changes_is_missing_log() {
    let resp = response(json!({
        "digest": "d",
        "effects": {"status": {"status": "success"}}
    }));
    assert!(matches!(resp.into_result_log(), Err(SubmitError::MissingLog)));
}

// ===========================================================================
// Signing
// ===========================================================================

#[test]
fn signature_layout_and_verification() {
    let kp = Keypair::from_seed(&[42u8; 32]).unwrap();
    let tx = b"transaction-data-bytes";
    let serialized = STANDARD.decode(kp.sign_transaction(tx)).unwrap();

    assert_eq!(serialized.len(), 97);
    assert_eq!(serialized[0], ED25519_FLAG);
    assert_eq!(&serialized[65..], kp.public_key());

    let verifier = UnparsedPublicKey::new(&ED25519, kp.public_key());
    verifier
        .verify(&transaction_digest(tx), &serialized[1..65])
        .unwrap();
    assert!(verifier.verify(tx, &serialized[1..65]).is_err());
}

#[test]
fn address_is_hex_of_32_bytes() {
    let kp = Keypair::from_seed(&[42u8; 32]).unwrap();
    let addr = kp.address();
    assert!(addr.starts_with("0x"));
    assert_eq!(addr.len(), 66);
    assert!(addr[2..].chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(addr, Keypair::from_seed(&[43u8; 32]).unwrap().address());
}

// ===========================================================================
// Typed calls
// ===========================================================================

const BUY_WATER_COOLER: FunctionSig = FunctionSig::new(
    "cooler_factory",
    "buy_water_cooler",
    &[
        Param::Object,
        Param::Object,
        Param::String,
        Param::String,
        Param::String,
        Param::U64,
        Param::Address,
    ],
);

#[test]
fn dropped_argument_caught_before_submission() {
    let full = || {
        vec![
            CallArg::object("0xfac"),
            CallArg::object("0xc0"),
            CallArg::string("Cooler"),
            CallArg::string("desc"),
            CallArg::string("https://img"),
            CallArg::U64(150),
            CallArg::address("0xa"),
        ]
    };
    let call = BUY_WATER_COOLER.call("0xaa", full()).unwrap();
    assert_eq!(call.target(), "0xaa::cooler_factory::buy_water_cooler");
    assert_eq!(call.arguments().len(), 7);

    let mut dropped = full();
    dropped.remove(4);
    let err = BUY_WATER_COOLER.call("0xaa", dropped).unwrap_err();
    assert!(matches!(
        err,
        PayloadError::Arity {
            expected: 7,
            got: 6,
            ..
        }
    ));
}

#[test]
fn argument_of_wrong_kind_caught_before_submission() {
    let mut args = vec![
        CallArg::object("0xfac"),
        CallArg::object("0xc0"),
        CallArg::string("Cooler"),
        CallArg::string("desc"),
        CallArg::string("https://img"),
        CallArg::string("150"),
        CallArg::address("0xa"),
    ];
    let err = BUY_WATER_COOLER.call("0xaa", args.clone()).unwrap_err();
    assert!(matches!(
        err,
        PayloadError::ArgumentKind {
            index: 5,
            expected: Param::U64,
            got: Param::String,
            ..
        }
    ));

    args[5] = CallArg::U64(150);
    assert!(matches!(
        BUY_WATER_COOLER.call("0xpkg", args),
        Err(PayloadError::InvalidAddress(ref a)) if a == "0xpkg"
    ));
}

#[test]
fn batch_describes_each_call() {
    const STATUS: FunctionSig =
        FunctionSig::new("mint", "set_mint_status", &[Param::Object, Param::Object, Param::U8]);
    let a = STATUS
        .call("0x1", vec![CallArg::object("0xa"), CallArg::object("0xb"), CallArg::U8(1)])
        .unwrap();
    let req = CallRequest::batch(vec![a.clone(), a]).unwrap();
    assert_eq!(req.describe(), "batch [mint::set_mint_status, mint::set_mint_status]");
    assert!(CallRequest::batch(vec![]).is_err());
}

#[test]
fn call_request_serializes_with_kind() {
    let req = CallRequest::pay_sui(100_000_000).unwrap();
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["kind"], "pay_sui");
    assert_eq!(v["amounts"], json!([100_000_000u64]));
    assert!(CallRequest::pay_sui(0).is_err());
}

// ===========================================================================
// MockSubmitter
// ===========================================================================

#[tokio::test]
async fn mock_hang_can_be_timed_out() {
    let mock = MockSubmitter::constant(MockBehavior::Hang);
    let kp = Keypair::from_seed(&[1u8; 32]).unwrap();
    let req = CallRequest::pay_sui(1).unwrap();
    let out = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        mock.submit(&req, &kp),
    )
    .await;
    assert!(out.is_err());
    assert_eq!(mock.call_count().await, 1);
}
