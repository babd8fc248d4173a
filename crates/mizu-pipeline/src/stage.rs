//! Stage: read, build, submit, extract, commit.
//!
//! A stage checks every read before it builds a request, and commits its writes
//! as one batch only after every expected entity has been found in the log. A
//! failure at any step leaves the store exactly as it was.

use crate::context::SessionContext;
use crate::error::{BuildError, StageError};
use crate::template::TypeTemplate;
use mizu_chain::{CallRequest, PayloadError};
use mizu_core::{Error, ResultLog, Scalar, StoreKey, StoreValue};
use mizu_store::StateStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Expected-type label used when a stage wants the published package id.
pub const PUBLISHED_PACKAGE: &str = "<published package>";

/// Builds the request for one stage from its resolved reads.
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, inputs: &StageInputs) -> Result<CallRequest, PayloadError>;
}

impl<F> PayloadBuilder for F
where
    F: Fn(&StageInputs) -> Result<CallRequest, PayloadError> + Send + Sync,
{
    fn build(&self, inputs: &StageInputs) -> Result<CallRequest, PayloadError> {
        self(inputs)
    }
}

/// What a stage pulls out of its result log for one write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extract {
    /// First created object of this type.
    Created(TypeTemplate),
    /// Id of the package published by the transaction.
    PublishedPackage,
}

impl Extract {
    /// Placeholder-free label for logs; templates render against `vars`.
    fn expected(&self, vars: &BTreeMap<String, String>) -> Result<String, String> {
        match self {
            Self::Created(t) => t.render(vars),
            Self::PublishedPackage => Ok(PUBLISHED_PACKAGE.to_string()),
        }
    }

    fn lookup<'a>(&self, expected: &str, log: &'a ResultLog) -> Option<&'a str> {
        match self {
            Self::Created(_) => log.find_one_by_type(expected),
            Self::PublishedPackage => log.published_package(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteSpec {
    pub key: StoreKey,
    pub extract: Extract,
}

/// Resolved reads handed to a payload builder.
#[derive(Clone, Debug)]
pub struct StageInputs {
    stage: String,
    sender: String,
    values: BTreeMap<String, StoreValue>,
}

impl StageInputs {
    pub fn new(stage: &str, sender: &str, values: BTreeMap<String, StoreValue>) -> Self {
        Self {
            stage: stage.to_string(),
            sender: sender.to_string(),
            values,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Address of the signing actor.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn get(&self, key: &str) -> Result<&StoreValue, PayloadError> {
        self.values
            .get(key)
            .ok_or_else(|| PayloadError::MissingInput(format!("{} (not declared as a read of '{}')", key, self.stage)))
    }

    pub fn scalar(&self, key: &str) -> Result<&Scalar, PayloadError> {
        self.get(key)?
            .as_scalar()
            .ok_or_else(|| PayloadError::Invalid(format!("'{}' is a record, expected a scalar", key)))
    }

    /// A string value such as an object id.
    pub fn id(&self, key: &str) -> Result<String, PayloadError> {
        match self.scalar(key)? {
            Scalar::Text(s) => Ok(s.clone()),
            Scalar::Number(n) => Err(PayloadError::Invalid(format!("'{}' is the number {}, expected an id", key, n))),
        }
    }

    pub fn u64(&self, key: &str) -> Result<u64, PayloadError> {
        let scalar = self.scalar(key)?;
        scalar
            .as_u64()
            .ok_or_else(|| PayloadError::Invalid(format!("'{}' = {} is not a u64", key, scalar)))
    }

    /// Every scalar read, rendered as text, for type templates.
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_scalar().map(|s| (k.clone(), s.to_string())))
            .collect()
    }
}

/// Everything a successful stage produced.
#[derive(Clone, Debug)]
pub struct StageOutcome {
    pub request: CallRequest,
    pub log: ResultLog,
    pub writes: BTreeMap<StoreKey, Scalar>,
}

/// One unit of work. Built before the pipeline starts; holds no run state.
#[derive(Clone)]
pub struct StageSpec {
    name: String,
    reads: Vec<StoreKey>,
    writes: Vec<WriteSpec>,
    payload: Arc<dyn PayloadBuilder>,
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish()
    }
}

impl StageSpec {
    pub fn builder(name: &str) -> StageSpecBuilder {
        StageSpecBuilder {
            name: name.to_string(),
            reads: Vec::new(),
            writes: Vec::new(),
            payload: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reads(&self) -> &[StoreKey] {
        &self.reads
    }

    pub fn writes(&self) -> &[WriteSpec] {
        &self.writes
    }

    /// True when every write key already has a value in `store`.
    pub fn is_satisfied(&self, store: &StateStore) -> bool {
        !self.writes.is_empty() && self.writes.iter().all(|w| store.contains(&w.key))
    }

    /// Read every declared key. The first one that is missing, or that holds a
    /// record instead of a single value, fails the stage.
    pub fn resolve(&self, store: &StateStore, sender: &str) -> Result<StageInputs, StageError> {
        let mut values = BTreeMap::new();
        for key in &self.reads {
            let value = store.read_scalar(key).map_err(|e| match e {
                Error::MissingKey(key) => StageError::UnresolvedDependency {
                    stage: self.name.clone(),
                    key,
                    found_record: false,
                },
                Error::WrongShape { key, .. } => StageError::UnresolvedDependency {
                    stage: self.name.clone(),
                    key,
                    found_record: true,
                },
                other => StageError::Store {
                    stage: self.name.clone(),
                    source: other,
                },
            })?;
            values.insert(key.as_str().to_string(), StoreValue::Scalar(value));
        }
        Ok(StageInputs::new(&self.name, sender, values))
    }

    /// Render every expected type that depends only on reads. Types that use
    /// writes of this stage are rendered during `extract`.
    pub fn check_expected_types(&self, inputs: &StageInputs) -> Result<(), StageError> {
        let vars = inputs.vars();
        for write in &self.writes {
            if let Extract::Created(template) = &write.extract {
                if template.placeholders().iter().all(|p| self.reads.contains(p)) {
                    template.render(&vars).map_err(|missing| StageError::Payload {
                        stage: self.name.clone(),
                        source: PayloadError::MissingInput(missing),
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn build_request(&self, inputs: &StageInputs) -> Result<CallRequest, StageError> {
        self.payload.build(inputs).map_err(|source| StageError::Payload {
            stage: self.name.clone(),
            source,
        })
    }

    /// Find every write in `log`. All must resolve or none are returned.
    /// Templates render against the reads plus the writes resolved before them.
    pub fn extract(
        &self,
        inputs: &StageInputs,
        log: &ResultLog,
    ) -> Result<BTreeMap<StoreKey, Scalar>, StageError> {
        let mut vars = inputs.vars();
        let mut batch = BTreeMap::new();
        for write in &self.writes {
            let expected = write.extract.expected(&vars).map_err(|missing| StageError::Payload {
                stage: self.name.clone(),
                source: PayloadError::MissingInput(missing),
            })?;
            let id = write
                .extract
                .lookup(&expected, log)
                .ok_or_else(|| StageError::ExpectedEntityNotFound {
                    stage: self.name.clone(),
                    key: write.key.clone(),
                    expected_type: expected.clone(),
                })?;
            debug!(stage = self.name.as_str(), key = %write.key, id, "extracted {}", expected);
            vars.insert(write.key.to_string(), id.to_string());
            batch.insert(write.key.clone(), Scalar::from(id));
        }
        Ok(batch)
    }

    /// Run the stage once against `store`.
    pub async fn run(
        &self,
        store: &mut StateStore,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome, StageError> {
        let inputs = self.resolve(store, ctx.address())?;
        self.check_expected_types(&inputs)?;
        let request = self.build_request(&inputs)?;

        info!(stage = self.name.as_str(), actor = ctx.actor(), "submitting {}", request.describe());
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(StageError::Cancelled { stage: self.name.clone() });
            }
            result = ctx.submitter().submit(&request, ctx.signer()) => result,
        };
        let log = submitted.map_err(|source| StageError::SubmissionFailed {
            stage: self.name.clone(),
            source,
        })?;

        let writes = self.extract(&inputs, &log)?;
        store
            .commit(writes.clone())
            .await
            .map_err(|source| StageError::Store {
                stage: self.name.clone(),
                source,
            })?;

        info!(
            stage = self.name.as_str(),
            digest = log.digest().unwrap_or("-"),
            writes = writes.len(),
            "stage committed"
        );
        Ok(StageOutcome {
            request,
            log,
            writes,
        })
    }
}

/// Declarative stage definition. Keys and templates are checked by `build`.
pub struct StageSpecBuilder {
    name: String,
    reads: Vec<String>,
    writes: Vec<(String, Option<String>)>,
    payload: Option<Arc<dyn PayloadBuilder>>,
}

impl StageSpecBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(mut self, key: &str) -> Self {
        self.reads.push(key.to_string());
        self
    }

    pub fn reads(mut self, keys: &[&str]) -> Self {
        self.reads.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Store the first created object whose type matches `type_template`.
    pub fn write_created(mut self, key: &str, type_template: &str) -> Self {
        self.writes.push((key.to_string(), Some(type_template.to_string())));
        self
    }

    /// Store the id of the published package.
    pub fn write_published(mut self, key: &str) -> Self {
        self.writes.push((key.to_string(), None));
        self
    }

    pub fn payload<P: PayloadBuilder + 'static>(mut self, payload: P) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn build(self) -> Result<StageSpec, BuildError> {
        let stage = self.name;
        let parse_key = |raw: &str| {
            StoreKey::parse(raw).map_err(|source| BuildError::InvalidKey {
                stage: stage.clone(),
                source,
            })
        };

        let mut reads: Vec<StoreKey> = Vec::new();
        for raw in &self.reads {
            let key = parse_key(raw)?;
            if !reads.contains(&key) {
                reads.push(key);
            }
        }

        let mut writes: Vec<WriteSpec> = Vec::new();
        for (raw, template) in &self.writes {
            let key = parse_key(raw)?;
            if writes.iter().any(|w| w.key.overlaps(&key) || w.key == key) {
                return Err(BuildError::DuplicateWriter {
                    key: key.to_string(),
                    first: stage.clone(),
                    second: stage.clone(),
                });
            }
            let extract = match template {
                None => Extract::PublishedPackage,
                Some(raw_template) => {
                    let template = TypeTemplate::parse(raw_template).map_err(|reason| {
                        BuildError::InvalidTemplate {
                            stage: stage.clone(),
                            template: raw_template.clone(),
                            reason,
                        }
                    })?;
                    let undeclared = template
                        .placeholders()
                        .iter()
                        .find(|p| !reads.contains(p) && !writes.iter().any(|w| &w.key == *p));
                    if let Some(p) = undeclared {
                        return Err(BuildError::UndeclaredPlaceholder {
                            stage: stage.clone(),
                            placeholder: p.to_string(),
                        });
                    }
                    Extract::Created(template)
                }
            };
            writes.push(WriteSpec { key, extract });
        }

        let payload = self
            .payload
            .ok_or_else(|| BuildError::MissingPayload(stage.clone()))?;

        Ok(StageSpec {
            name: stage,
            reads,
            writes,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &StageInputs) -> Result<CallRequest, PayloadError> {
        CallRequest::pay_sui(1)
    }

    #[test]
    fn builder_rejects_placeholder_outside_reads() {
        let err = StageSpec::builder("buy_water_cooler")
            .read("cooler_factory.CoolerFactory")
            .write_created("water_cooler", "{packageId}::water_cooler::WaterCooler")
            .payload(noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::UndeclaredPlaceholder { ref placeholder, .. } if placeholder == "packageId"));
    }

    #[test]
    fn builder_rejects_bad_keys_and_missing_payload() {
        assert!(matches!(
            StageSpec::builder("s").read("a..b").payload(noop).build(),
            Err(BuildError::InvalidKey { .. })
        ));
        assert!(matches!(
            StageSpec::builder("s").read("a").build(),
            Err(BuildError::MissingPayload(_))
        ));
    }

    #[test]
    fn builder_rejects_overlapping_writes_in_one_stage() {
        let err = StageSpec::builder("s")
            .write_created("mint", "0x2::a::A")
            .write_created("mint.mint_cap", "0x2::a::B")
            .payload(noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateWriter { .. }));
    }

    #[test]
    fn expected_types_checked_from_reads_only() {
        let stage = StageSpec::builder("publish_and_tag")
            .read("registry")
            .write_published("packageId")
            .write_created("tag", "{packageId}::tag::Tag")
            .write_created("entry", "{registry}::entry::Entry")
            .payload(noop)
            .build()
            .unwrap();

        // `{packageId}` comes from this stage's own write and is left to extract.
        let mut values = BTreeMap::new();
        values.insert("registry".to_string(), StoreValue::from(Scalar::from("0xe9")));
        assert!(stage.check_expected_types(&StageInputs::new("publish_and_tag", "0xa", values)).is_ok());

        let err = stage
            .check_expected_types(&StageInputs::new("publish_and_tag", "0xa", BTreeMap::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::Payload { source: PayloadError::MissingInput(ref m), .. } if m == "registry"
        ));
    }

    #[test]
    fn inputs_typed_accessors() {
        let mut values = BTreeMap::new();
        values.insert("packageId".to_string(), StoreValue::from(Scalar::from("0xp")));
        values.insert("collection.supply".to_string(), StoreValue::from(Scalar::from(150u64)));
        let inputs = StageInputs::new("s", "0xa", values);

        assert_eq!(inputs.id("packageId").unwrap(), "0xp");
        assert_eq!(inputs.u64("collection.supply").unwrap(), 150);
        assert!(inputs.id("collection.supply").is_err());
        assert!(matches!(inputs.id("kiosk.id"), Err(PayloadError::MissingInput(_))));
        assert_eq!(inputs.vars()["packageId"], "0xp");
    }
}
