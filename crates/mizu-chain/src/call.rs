//! Typed call requests
//!
//! Every Move entry function the pipelines call is described by a `FunctionSig`.
//! `FunctionSig::call` is the only way to get a `MoveCall`, and it rejects argument
//! lists that do not match the declared parameters, so a drifted builder fails
//! before anything reaches the network.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{target}: expected {expected} arguments, got {got}")]
    Arity {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error("{target}: argument {index} must be {expected}, got {got}")]
    ArgumentKind {
        target: String,
        index: usize,
        expected: Param,
        got: Param,
    },

    #[error("{target}: expected {expected} type arguments, got {got}")]
    TypeArity {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// Declared kind of one Move parameter.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    /// Any object passed by id (owned, shared or immutable).
    Object,
    /// `vector<T>` of objects passed by id.
    ObjectVec,
    /// `0x1::string::String`
    String,
    /// `vector<0x1::string::String>`
    StringVec,
    U8,
    U64,
    Address,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::ObjectVec => write!(f, "vector<object>"),
            Self::String => write!(f, "string"),
            Self::StringVec => write!(f, "vector<string>"),
            Self::U8 => write!(f, "u8"),
            Self::U64 => write!(f, "u64"),
            Self::Address => write!(f, "address"),
        }
    }
}

/// One argument value.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CallArg {
    Object(String),
    ObjectVec(Vec<String>),
    String(String),
    StringVec(Vec<String>),
    U8(u8),
    U64(u64),
    Address(String),
}

impl CallArg {
    pub fn object(id: impl Into<String>) -> Self {
        Self::Object(id.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn address(a: impl Into<String>) -> Self {
        Self::Address(a.into())
    }

    pub fn param(&self) -> Param {
        match self {
            Self::Object(_) => Param::Object,
            Self::ObjectVec(_) => Param::ObjectVec,
            Self::String(_) => Param::String,
            Self::StringVec(_) => Param::StringVec,
            Self::U8(_) => Param::U8,
            Self::U64(_) => Param::U64,
            Self::Address(_) => Param::Address,
        }
    }

    /// Sui JSON argument form. u64 goes as a decimal string to stay exact.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Object(id) | Self::Address(id) | Self::String(id) => json!(id),
            Self::ObjectVec(ids) | Self::StringVec(ids) => json!(ids),
            Self::U8(n) => json!(n),
            Self::U64(n) => json!(n.to_string()),
        }
    }

    fn validate(&self) -> Result<(), PayloadError> {
        match self {
            Self::Object(id) | Self::Address(id) => check_address(id),
            Self::ObjectVec(ids) => ids.iter().try_for_each(|id| check_address(id)),
            _ => Ok(()),
        }
    }
}

/// Declared shape of a Move entry function.
#[derive(Clone, Copy, Debug)]
pub struct FunctionSig {
    pub module: &'static str,
    pub function: &'static str,
    pub type_params: usize,
    pub params: &'static [Param],
}

impl FunctionSig {
    pub const fn new(module: &'static str, function: &'static str, params: &'static [Param]) -> Self {
        Self {
            module,
            function,
            type_params: 0,
            params,
        }
    }

    pub fn target(&self, package: &str) -> String {
        format!("{}::{}::{}", package, self.module, self.function)
    }

    pub fn call(&self, package: &str, args: Vec<CallArg>) -> Result<MoveCall, PayloadError> {
        self.call_generic(package, Vec::new(), args)
    }

    pub fn call_generic(
        &self,
        package: &str,
        type_arguments: Vec<String>,
        args: Vec<CallArg>,
    ) -> Result<MoveCall, PayloadError> {
        check_address(package)?;
        let target = self.target(package);
        if type_arguments.len() != self.type_params {
            return Err(PayloadError::TypeArity {
                target,
                expected: self.type_params,
                got: type_arguments.len(),
            });
        }
        if args.len() != self.params.len() {
            return Err(PayloadError::Arity {
                target,
                expected: self.params.len(),
                got: args.len(),
            });
        }
        for (index, (arg, expected)) in args.iter().zip(self.params.iter()).enumerate() {
            if arg.param() != *expected {
                return Err(PayloadError::ArgumentKind {
                    target,
                    index,
                    expected: *expected,
                    got: arg.param(),
                });
            }
            arg.validate()?;
        }
        Ok(MoveCall {
            package: package.to_string(),
            module: self.module.to_string(),
            function: self.function.to_string(),
            type_arguments,
            arguments: args,
        })
    }
}

/// A validated Move call.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct MoveCall {
    package: String,
    module: String,
    function: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    type_arguments: Vec<String>,
    arguments: Vec<CallArg>,
}

impl MoveCall {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn type_arguments(&self) -> &[String] {
        &self.type_arguments
    }

    pub fn arguments(&self) -> &[CallArg] {
        &self.arguments
    }

    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }

    pub fn arguments_json(&self) -> Vec<Value> {
        self.arguments.iter().map(CallArg::to_json).collect()
    }
}

/// Everything a stage can ask the ledger to do in one transaction.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallRequest {
    /// Publish compiled modules; the upgrade cap goes to the sender.
    Publish {
        modules: Vec<String>,
        dependencies: Vec<String>,
    },
    MoveCall(MoveCall),
    /// Several calls executed atomically in one transaction.
    Batch { calls: Vec<MoveCall> },
    /// Split SUI into new coins (to the sender unless a recipient is given).
    PaySui {
        amounts: Vec<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
    },
}

impl CallRequest {
    pub fn publish(modules: Vec<String>, dependencies: Vec<String>) -> Result<Self, PayloadError> {
        if modules.is_empty() {
            return Err(PayloadError::Invalid("publish needs at least one module".into()));
        }
        Ok(Self::Publish {
            modules,
            dependencies,
        })
    }

    pub fn batch(calls: Vec<MoveCall>) -> Result<Self, PayloadError> {
        if calls.is_empty() {
            return Err(PayloadError::Invalid("empty batch".into()));
        }
        Ok(Self::Batch { calls })
    }

    pub fn pay_sui(amount: u64) -> Result<Self, PayloadError> {
        if amount == 0 {
            return Err(PayloadError::Invalid("payment amount must be positive".into()));
        }
        Ok(Self::PaySui {
            amounts: vec![amount],
            recipient: None,
        })
    }

    /// One-line summary for logs and dry runs.
    pub fn describe(&self) -> String {
        match self {
            Self::Publish { modules, .. } => format!("publish {} modules", modules.len()),
            Self::MoveCall(call) => format!("call {}", call.target()),
            Self::Batch { calls } => format!(
                "batch [{}]",
                calls
                    .iter()
                    .map(|c| format!("{}::{}", c.module(), c.function()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::PaySui { amounts, .. } => format!(
                "pay_sui {}",
                amounts
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

impl From<MoveCall> for CallRequest {
    fn from(call: MoveCall) -> Self {
        Self::MoveCall(call)
    }
}

/// `0x` followed by 1..=64 hex digits.
pub fn check_address(s: &str) -> Result<(), PayloadError> {
    let hex = s
        .strip_prefix("0x")
        .ok_or_else(|| PayloadError::InvalidAddress(s.to_string()))?;
    if hex.is_empty() || hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PayloadError::InvalidAddress(s.to_string()));
    }
    Ok(())
}
