//! Entry functions of the Mizu package, one signature per call.
//!
//! Every payload in `flows` goes through these, so an argument list that
//! drifts from the contract fails before anything is submitted.

use mizu_chain::{FunctionSig, Param};

/// Sui framework package.
pub const SUI_FRAMEWORK: &str = "0x2";

pub const BUY_WATER_COOLER: FunctionSig = FunctionSig::new(
    "cooler_factory",
    "buy_water_cooler",
    &[
        Param::Object,  // factory
        Param::Object,  // payment coin
        Param::String,  // name
        Param::String,  // description
        Param::String,  // image url
        Param::String,  // placeholder image url
        Param::U64,     // supply
        Param::Address, // treasury
    ],
);

pub const INITIALIZE_WATER_COOLER: FunctionSig = FunctionSig::new(
    "water_cooler",
    "initialize_water_cooler",
    &[Param::Object, Param::Object, Param::Object, Param::Object],
);

pub const SET_MINT_PRICE: FunctionSig =
    FunctionSig::new("mint", "set_mint_price", &[Param::Object, Param::Object, Param::U64]);

pub const SET_MINT_STATUS: FunctionSig =
    FunctionSig::new("mint", "set_mint_status", &[Param::Object, Param::Object, Param::U8]);

pub const SET_MINT_PHASE: FunctionSig =
    FunctionSig::new("mint", "set_mint_phase", &[Param::Object, Param::Object, Param::U8]);

pub const PUBLIC_MINT: FunctionSig =
    FunctionSig::new("mint", "public_mint", &[Param::Object, Param::Object, Param::Object]);

pub const CREATE_WL_TICKET: FunctionSig =
    FunctionSig::new("mint", "create_wl_ticket", &[Param::Object, Param::Object]);

pub const ADD_TO_MINT_WAREHOUSE: FunctionSig = FunctionSig::new(
    "mint",
    "add_to_mint_warehouse",
    &[Param::Object, Param::Object, Param::ObjectVec, Param::Object],
);

pub const CLAIM_MINT: FunctionSig = FunctionSig::new(
    "mint",
    "claim_mint",
    &[Param::Object, Param::Object, Param::Object, Param::Object, Param::Object],
);

pub const REVEAL_MINT: FunctionSig = FunctionSig::new(
    "mint",
    "reveal_mint",
    &[Param::Object, Param::Object, Param::Object, Param::Object, Param::String],
);

/// `0x2::kiosk::default`: shares a new kiosk, sends the owner cap to the sender.
pub const KIOSK_DEFAULT: FunctionSig = FunctionSig::new("kiosk", "default", &[]);
