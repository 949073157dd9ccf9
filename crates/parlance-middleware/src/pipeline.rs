// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered middleware pipeline with a pipeline-level failure policy.
//!
//! All options are validated when the pipeline is built; `process_all`
//! touches only validated configs. Every step processes the *original*
//! user input -- steps augment independently, they do not chain.

use std::sync::Arc;

use strum::{Display, EnumString};
use tracing::warn;

use parlance_core::ParlanceError;

use crate::{
    GeneralOptions, Middleware, MiddlewareConfig, MiddlewareContext, MiddlewareDescriptor,
    MiddlewareRegistry,
};

/// What a step failure does to the turn. A configuration decision surfaced
/// to the orchestrator, not hidden inside middlewares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort processing; the whole turn fails.
    #[default]
    #[strum(serialize = "fail")]
    FailTurn,
    /// Log the failure and keep the remaining steps' contributions.
    #[strum(serialize = "skip")]
    SkipAndContinue,
}

#[derive(Debug)]
struct PipelineStep {
    middleware: Arc<dyn Middleware>,
    config: MiddlewareConfig,
}

/// A bot's validated middleware set.
#[derive(Debug)]
pub struct MiddlewarePipeline {
    steps: Vec<PipelineStep>,
    policy: FailurePolicy,
}

impl MiddlewarePipeline {
    /// Resolves and validates every descriptor against the registry.
    ///
    /// Fails with [`ParlanceError::UnknownMiddleware`] for names outside
    /// the registry and [`ParlanceError::Validation`] for bad options.
    pub fn build(
        registry: &MiddlewareRegistry,
        general: &GeneralOptions,
        descriptors: &[MiddlewareDescriptor],
        policy: FailurePolicy,
    ) -> Result<Self, ParlanceError> {
        let mut steps = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let middleware = registry.get(&descriptor.name)?;
            let config = middleware.validate_options(general, &descriptor.options)?;
            steps.push(PipelineStep { middleware, config });
        }
        Ok(Self { steps, policy })
    }

    /// Pipeline with no steps; `process_all` yields no augmentations.
    pub fn empty() -> Self {
        Self {
            steps: Vec::new(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step against the same base input, collecting non-empty
    /// augmented context blocks in configuration order.
    pub async fn process_all(
        &self,
        ctx: &MiddlewareContext,
        input: &str,
    ) -> Result<Vec<String>, ParlanceError> {
        let mut augments = Vec::new();
        for step in &self.steps {
            match step.middleware.process(ctx, &step.config, input).await {
                Ok(block) => {
                    if !block.is_empty() {
                        augments.push(block);
                    }
                }
                Err(ParlanceError::Cancelled) => return Err(ParlanceError::Cancelled),
                Err(err) => match self.policy {
                    FailurePolicy::FailTurn => {
                        return Err(step_error(step.middleware.name(), err));
                    }
                    FailurePolicy::SkipAndContinue => {
                        warn!(
                            middleware = step.middleware.name(),
                            conversation_id = %ctx.conversation_id,
                            error = %err,
                            "middleware failed, skipping its contribution"
                        );
                    }
                },
            }
        }
        Ok(augments)
    }
}

fn step_error(name: &str, err: ParlanceError) -> ParlanceError {
    match err {
        err @ ParlanceError::Middleware { .. } => err,
        other => ParlanceError::Middleware {
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::SearchOptions;

    /// Test middleware returning a fixed block or a fixed failure. Reuses
    /// the search options carrier since the config enum is closed.
    struct StubMiddleware {
        name: &'static str,
        output: Result<String, String>,
    }

    #[async_trait]
    impl Middleware for StubMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn validate_options(
            &self,
            general: &GeneralOptions,
            _raw: &serde_json::Map<String, serde_json::Value>,
        ) -> Result<MiddlewareConfig, ParlanceError> {
            Ok(MiddlewareConfig::Search(SearchOptions {
                general: general.clone(),
                limit: 1,
            }))
        }

        async fn process(
            &self,
            _ctx: &MiddlewareContext,
            _config: &MiddlewareConfig,
            input: &str,
        ) -> Result<String, ParlanceError> {
            match &self.output {
                Ok(text) => Ok(format!("{text}:{input}")),
                Err(message) => Err(ParlanceError::Middleware {
                    name: self.name.to_string(),
                    message: message.clone(),
                }),
            }
        }
    }

    fn registry_with(stubs: Vec<StubMiddleware>) -> MiddlewareRegistry {
        let mut registry = MiddlewareRegistry::new();
        for stub in stubs {
            registry.register(Arc::new(stub));
        }
        registry
    }

    fn descriptors(names: &[&str]) -> Vec<MiddlewareDescriptor> {
        names
            .iter()
            .map(|name| MiddlewareDescriptor {
                name: (*name).to_string(),
                options: serde_json::Map::new(),
            })
            .collect()
    }

    fn ctx() -> MiddlewareContext {
        MiddlewareContext {
            conversation_id: "conv-1".to_string(),
            user_identity: "user-1".to_string(),
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn build_rejects_unknown_names() {
        let registry = registry_with(vec![]);
        let err = MiddlewarePipeline::build(
            &registry,
            &GeneralOptions::default(),
            &descriptors(&["search"]),
            FailurePolicy::FailTurn,
        )
        .unwrap_err();
        assert!(matches!(err, ParlanceError::UnknownMiddleware(_)));
    }

    #[tokio::test]
    async fn steps_augment_from_the_same_base_input() {
        let registry = registry_with(vec![
            StubMiddleware { name: "first", output: Ok("a".to_string()) },
            StubMiddleware { name: "second", output: Ok("b".to_string()) },
        ]);
        let pipeline = MiddlewarePipeline::build(
            &registry,
            &GeneralOptions::default(),
            &descriptors(&["first", "second"]),
            FailurePolicy::FailTurn,
        )
        .unwrap();

        let augments = pipeline.process_all(&ctx(), "question").await.unwrap();
        // Both saw the original input, not each other's output.
        assert_eq!(augments, vec!["a:question", "b:question"]);
    }

    #[tokio::test]
    async fn fail_policy_aborts_on_first_failure() {
        let registry = registry_with(vec![
            StubMiddleware { name: "broken", output: Err("boom".to_string()) },
            StubMiddleware { name: "after", output: Ok("x".to_string()) },
        ]);
        let pipeline = MiddlewarePipeline::build(
            &registry,
            &GeneralOptions::default(),
            &descriptors(&["broken", "after"]),
            FailurePolicy::FailTurn,
        )
        .unwrap();

        let err = pipeline.process_all(&ctx(), "question").await.unwrap_err();
        assert!(matches!(err, ParlanceError::Middleware { name, .. } if name == "broken"));
    }

    #[tokio::test]
    async fn skip_policy_keeps_remaining_contributions() {
        let registry = registry_with(vec![
            StubMiddleware { name: "broken", output: Err("boom".to_string()) },
            StubMiddleware { name: "after", output: Ok("x".to_string()) },
        ]);
        let pipeline = MiddlewarePipeline::build(
            &registry,
            &GeneralOptions::default(),
            &descriptors(&["broken", "after"]),
            FailurePolicy::SkipAndContinue,
        )
        .unwrap();

        let augments = pipeline.process_all(&ctx(), "question").await.unwrap();
        assert_eq!(augments, vec!["x:question"]);
    }

    #[tokio::test]
    async fn empty_pipeline_yields_no_augmentations() {
        let pipeline = MiddlewarePipeline::empty();
        assert!(pipeline.is_empty());
        let augments = pipeline.process_all(&ctx(), "question").await.unwrap();
        assert!(augments.is_empty());
    }

    #[test]
    fn failure_policy_parses_from_config_strings() {
        use std::str::FromStr;
        assert_eq!(FailurePolicy::from_str("fail").unwrap(), FailurePolicy::FailTurn);
        assert_eq!(FailurePolicy::from_str("skip").unwrap(), FailurePolicy::SkipAndContinue);
        assert!(FailurePolicy::from_str("explode").is_err());
    }
}
