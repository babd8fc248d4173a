//! Concrete flows against the Mizu contracts.
//!
//! Each flow is a pipeline whose stage keys match the deployment snapshots
//! (`deployed_objects.json` for the admin, `user_objects.json` for the user).
//! User flows read `packageId` and the deployment ids through the admin layer.

use crate::config::MizuConfig;
use crate::contract::*;
use crate::package::CompiledPackage;
use mizu_chain::{CallArg, CallRequest, PayloadError};
use mizu_pipeline::{BuildError, Pipeline, PipelineBuilder, StageInputs, StageSpec, StageSpecBuilder};

/// Type of a fresh coin split off the gas coin.
pub const SUI_COIN: &str = "0x2::coin::Coin<0x2::sui::SUI>";

/// Which configured actor signs a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

#[derive(Clone, Copy, Debug)]
pub struct FlowInfo {
    pub name: &'static str,
    pub role: Role,
    pub summary: &'static str,
    /// Needs compiled bytecode before it can run.
    pub publishes: bool,
    /// Keys no flow writes; they are set by hand with `mizu store set`.
    pub seed_keys: &'static [&'static str],
}

impl FlowInfo {
    /// How to seed `key` for `actor`, if this flow expects it to be set by hand.
    pub fn seed_hint(&self, actor: &str, key: &str) -> Option<String> {
        self.seed_keys
            .contains(&key)
            .then(|| format!("hint: '{}' is not written by any flow; seed it with `mizu store set {} {} 0x...`", key, actor, key))
    }
}

pub const FLOWS: &[FlowInfo] = &[
    FlowInfo {
        name: "deploy",
        role: Role::Admin,
        summary: "publish the package and record the factory, policy and publisher",
        publishes: true,
        seed_keys: &[],
    },
    FlowInfo {
        name: "cooler",
        role: Role::User,
        summary: "pay, buy a water cooler and initialise it",
        publishes: false,
        seed_keys: &[],
    },
    FlowInfo {
        name: "public-mint",
        role: Role::User,
        summary: "open the public phase and mint",
        publishes: false,
        seed_keys: &[],
    },
    FlowInfo {
        name: "whitelist",
        role: Role::User,
        summary: "open the whitelist phase and create a ticket",
        publishes: false,
        seed_keys: &[],
    },
    FlowInfo {
        name: "warehouse",
        role: Role::User,
        summary: "move the cooler's NFT into the mint warehouse",
        publishes: false,
        seed_keys: &[],
    },
    FlowInfo {
        name: "claim",
        role: Role::User,
        summary: "create a kiosk and claim the mint into it",
        publishes: false,
        seed_keys: &[],
    },
    FlowInfo {
        name: "reveal",
        role: Role::User,
        summary: "reveal a mint with its attributes and image",
        publishes: false,
        seed_keys: &["attributes", "image"],
    },
];

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("unknown flow '{0}' (try `mizu flows`)")]
    Unknown(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

pub fn find_flow(name: &str) -> Option<&'static FlowInfo> {
    FLOWS.iter().find(|f| f.name == name)
}

/// Build the named flow. `package` is only used by flows that publish; without
/// it their payload fails, which a dry run reports instead of submitting.
pub fn build_flow(
    name: &str,
    config: &MizuConfig,
    package: Option<CompiledPackage>,
) -> Result<Pipeline, FlowError> {
    let builder = PipelineBuilder::new(name);
    let builder = match name {
        "deploy" => builder.stage(publish(package)),
        "cooler" => builder
            .stage(pay("pay_cooler_fee", "payment.cooler_fee", config.collection.cooler_price))
            .stage(buy_water_cooler(config))
            .stage(init_water_cooler()),
        "public-mint" => builder
            .stage(set_mint_settings(config, config.mint.public_phase))
            .stage(pay("pay_mint_price", "payment.mint_price", config.mint.price))
            .stage(public_mint()),
        "whitelist" => builder
            .stage(set_mint_settings(config, config.mint.whitelist_phase))
            .stage(create_wl_ticket()),
        "warehouse" => builder.stage(add_to_mint_warehouse()),
        "claim" => builder.stage(create_kiosk()).stage(claim_mint()),
        "reveal" => builder.stage(reveal_mint(config)),
        other => return Err(FlowError::Unknown(other.to_string())),
    };
    Ok(builder.build()?)
}

/// Object arguments for `keys`, in order.
fn objects(inputs: &StageInputs, keys: &[&str]) -> Result<Vec<CallArg>, PayloadError> {
    keys.iter().map(|k| inputs.id(k).map(CallArg::object)).collect()
}

fn publish(package: Option<CompiledPackage>) -> StageSpecBuilder {
    StageSpec::builder("publish")
        .write_published("packageId")
        .write_created("cooler_factory.CoolerFactory", "{packageId}::cooler_factory::CoolerFactory")
        .write_created("cooler_factory.FactoryOwnerCap", "{packageId}::cooler_factory::FactoryOwnerCap")
        .write_created(
            "water_cooler.policy",
            "0x2::transfer_policy::TransferPolicy<{packageId}::mizu_nft::MizuNFT>",
        )
        .write_created(
            "water_cooler.policy_cap",
            "0x2::transfer_policy::TransferPolicyCap<{packageId}::mizu_nft::MizuNFT>",
        )
        .write_created("water_cooler.water_cooler_publisher", "0x2::package::Publisher")
        .payload(move |_: &StageInputs| -> Result<CallRequest, PayloadError> {
            match &package {
                Some(p) => CallRequest::publish(p.modules.clone(), p.dependencies.clone()),
                None => Err(PayloadError::MissingInput("compiled package".into())),
            }
        })
}

/// Split `amount` MIST off the gas coin into a new coin stored at `key`.
fn pay(stage: &str, key: &str, amount: u64) -> StageSpecBuilder {
    StageSpec::builder(stage)
        .write_created(key, SUI_COIN)
        .payload(move |_: &StageInputs| CallRequest::pay_sui(amount))
}

fn buy_water_cooler(config: &MizuConfig) -> StageSpecBuilder {
    let collection = config.collection.clone();
    StageSpec::builder("buy_water_cooler")
        .reads(&["packageId", "cooler_factory.CoolerFactory", "payment.cooler_fee"])
        .write_created("water_cooler", "{packageId}::water_cooler::WaterCooler")
        .write_created("water_cooler_cap", "{packageId}::water_cooler::WaterCoolerAdminCap")
        .write_created("MintSettings", "{packageId}::mint::MintSettings")
        .write_created("MintWarehouse", "{packageId}::mint::MintWarehouse")
        .write_created("MintAdminCap", "{packageId}::mint::MintAdminCap")
        .write_created("collection", "{packageId}::collection::Collection")
        .write_created("registry", "{packageId}::registry::Registry")
        .payload(move |inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let mut args = objects(inputs, &["cooler_factory.CoolerFactory", "payment.cooler_fee"])?;
            args.extend([
                CallArg::string(&collection.name),
                CallArg::string(&collection.description),
                CallArg::string(&collection.image_url),
                CallArg::string(&collection.placeholder_image_url),
                CallArg::U64(collection.supply),
                CallArg::address(&collection.treasury),
            ]);
            Ok(BUY_WATER_COOLER.call(&inputs.id("packageId")?, args)?.into())
        })
}

fn init_water_cooler() -> StageSpecBuilder {
    StageSpec::builder("init_water_cooler")
        .reads(&["packageId", "water_cooler_cap", "water_cooler", "registry", "collection"])
        .write_created("mizu_kiosk", "0x2::kiosk::Kiosk")
        .write_created("mizu_nft", "{packageId}::mizu_nft::MizuNFT")
        .payload(|inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let args = objects(inputs, &["water_cooler_cap", "water_cooler", "registry", "collection"])?;
            Ok(INITIALIZE_WATER_COOLER.call(&inputs.id("packageId")?, args)?.into())
        })
}

/// Price, status and phase in one transaction.
fn set_mint_settings(config: &MizuConfig, phase: u8) -> StageSpecBuilder {
    let mint = config.mint.clone();
    StageSpec::builder("set_mint_settings")
        .reads(&["packageId", "MintAdminCap", "MintSettings"])
        .payload(move |inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let package = inputs.id("packageId")?;
            let with = |value: CallArg| -> Result<Vec<CallArg>, PayloadError> {
                let mut args = objects(inputs, &["MintAdminCap", "MintSettings"])?;
                args.push(value);
                Ok(args)
            };
            CallRequest::batch(vec![
                SET_MINT_PRICE.call(&package, with(CallArg::U64(mint.price))?)?,
                SET_MINT_STATUS.call(&package, with(CallArg::U8(mint.status))?)?,
                SET_MINT_PHASE.call(&package, with(CallArg::U8(phase))?)?,
            ])
        })
}

fn public_mint() -> StageSpecBuilder {
    StageSpec::builder("public_mint")
        .reads(&["packageId", "MintWarehouse", "MintSettings", "payment.mint_price"])
        .write_created("mint", "{packageId}::mint::Mint")
        .write_created("mint_cap", "{packageId}::mint::MintCap")
        .write_created("attributes_cap", "{packageId}::attributes::CreateAttributesCap")
        .write_created("image_cap", "{packageId}::image::CreateImageCap")
        .payload(|inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let args = objects(inputs, &["MintWarehouse", "MintSettings", "payment.mint_price"])?;
            Ok(PUBLIC_MINT.call(&inputs.id("packageId")?, args)?.into())
        })
}

fn create_wl_ticket() -> StageSpecBuilder {
    StageSpec::builder("create_wl_ticket")
        .reads(&["packageId", "MintAdminCap", "MintWarehouse"])
        .write_created("WhitelistTicket", "{packageId}::mint::WhitelistTicket")
        .payload(|inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let args = objects(inputs, &["MintAdminCap", "MintWarehouse"])?;
            Ok(CREATE_WL_TICKET.call(&inputs.id("packageId")?, args)?.into())
        })
}

fn add_to_mint_warehouse() -> StageSpecBuilder {
    StageSpec::builder("add_to_mint_warehouse")
        .reads(&["packageId", "MintAdminCap", "water_cooler", "mizu_nft", "MintWarehouse"])
        .payload(|inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let args = vec![
                CallArg::object(inputs.id("MintAdminCap")?),
                CallArg::object(inputs.id("water_cooler")?),
                CallArg::ObjectVec(vec![inputs.id("mizu_nft")?]),
                CallArg::object(inputs.id("MintWarehouse")?),
            ];
            Ok(ADD_TO_MINT_WAREHOUSE.call(&inputs.id("packageId")?, args)?.into())
        })
}

fn create_kiosk() -> StageSpecBuilder {
    StageSpec::builder("create_kiosk")
        .write_created("kiosk.id", "0x2::kiosk::Kiosk")
        .write_created("kiosk.owner_cap", "0x2::kiosk::KioskOwnerCap")
        .payload(|_: &StageInputs| -> Result<CallRequest, PayloadError> {
            Ok(KIOSK_DEFAULT.call(SUI_FRAMEWORK, Vec::new())?.into())
        })
}

fn claim_mint() -> StageSpecBuilder {
    StageSpec::builder("claim_mint")
        .reads(&[
            "packageId",
            "water_cooler",
            "mint",
            "kiosk.id",
            "kiosk.owner_cap",
            "water_cooler.policy",
        ])
        .payload(|inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let args = objects(
                inputs,
                &["water_cooler", "mint", "kiosk.id", "kiosk.owner_cap", "water_cooler.policy"],
            )?;
            Ok(CLAIM_MINT.call(&inputs.id("packageId")?, args)?.into())
        })
}

fn reveal_mint(config: &MizuConfig) -> StageSpecBuilder {
    let key = config.mint.reveal_key.clone();
    StageSpec::builder("reveal_mint")
        .reads(&["packageId", "mint_cap", "mint", "attributes", "image"])
        .payload(move |inputs: &StageInputs| -> Result<CallRequest, PayloadError> {
            let mut args = objects(inputs, &["mint_cap", "mint", "attributes", "image"])?;
            args.push(CallArg::string(&key));
            Ok(REVEAL_MINT.call(&inputs.id("packageId")?, args)?.into())
        })
}
