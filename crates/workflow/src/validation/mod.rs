//! Sequential validation pipeline run before an order is created or finalized.
//!
//! The chain is an ordered list of stages. Each stage reads the order, may
//! set flags on the shared [`ProcessingContext`], and passes or fails. The
//! first failing stage ends the run; later stages never see the order.

mod business_rules;
mod inventory;
mod structural;

pub use business_rules::BusinessRulesStage;
pub use inventory::InventoryStage;
pub use structural::StructuralStage;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::Order;
use futures_util::FutureExt;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::services::{CustomerRepository, ProductRepository};

/// The kinds of stage the chain knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageKind {
    Structural,
    Inventory,
    BusinessRules,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Structural => "structural_validation",
            StageKind::Inventory => "inventory_check",
            StageKind::BusinessRules => "business_rules",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the chain is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessingAction {
    Create,
    Finalize,
    Validate,
}

impl std::fmt::Display for ProcessingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessingAction::Create => "create",
            ProcessingAction::Finalize => "finalize",
            ProcessingAction::Validate => "validate",
        };
        write!(f, "{name}")
    }
}

/// Facts discovered by one stage for the benefit of later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContextFlags {
    /// The customer's birth month is the current month.
    pub is_birthday_month: bool,
}

/// One line of the processing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    /// `None` for lines written by the chain itself.
    pub stage: Option<StageKind>,
    pub message: String,
}

/// Per-run scratch space shared by the stages.
#[derive(Debug)]
pub struct ProcessingContext<'a> {
    pub order: &'a Order,
    pub action: ProcessingAction,
    pub flags: ContextFlags,
    log: Vec<LogEntry>,
}

impl<'a> ProcessingContext<'a> {
    pub fn new(order: &'a Order, action: ProcessingAction) -> Self {
        Self {
            order,
            action,
            flags: ContextFlags::default(),
            log: Vec::new(),
        }
    }

    /// Appends a line to the log.
    pub fn log(&mut self, stage: Option<StageKind>, message: impl Into<String>) {
        self.log.push(LogEntry {
            at: Utc::now(),
            stage,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }
}

/// Verdict of a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageOutcome {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl StageOutcome {
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Fails with `failure_message` if any error was collected.
    fn from_findings(
        errors: Vec<String>,
        warnings: Vec<String>,
        success_message: &str,
        failure_message: &str,
    ) -> Self {
        let outcome = if errors.is_empty() {
            Self::passed(success_message)
        } else {
            Self::failed(failure_message, errors)
        };
        outcome.with_warnings(warnings)
    }
}

/// A single step of the chain.
#[async_trait]
pub trait ValidationStage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Inspects the order. `Err` is an internal fault, not a rejection.
    async fn check(&self, ctx: &mut ProcessingContext<'_>) -> Result<StageOutcome, WorkflowError>;
}

/// Outcome of a whole chain run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    /// Warnings of every stage that ran, in stage order.
    pub warnings: Vec<String>,
    /// The stage that rejected the order, if any.
    pub failed_stage: Option<StageKind>,
    pub flags: ContextFlags,
    pub log: Vec<LogEntry>,
}

impl ProcessingResult {
    /// Converts a failed run into a workflow error.
    pub fn into_error(self) -> WorkflowError {
        WorkflowError::Validation {
            message: self.message,
            errors: self.errors,
        }
    }
}

/// Ordered list of validation stages.
pub struct ValidationChain {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationChain {
    /// Structural check, then inventory, then business rules.
    pub fn standard(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stages: vec![
                Box::new(StructuralStage),
                Box::new(InventoryStage::new(products.clone())),
                Box::new(BusinessRulesStage::new(customers, products, clock)),
            ],
        }
    }

    /// Builds a chain from caller-supplied stages, run in the given order.
    pub fn custom(stages: Vec<Box<dyn ValidationStage>>) -> Result<Self, WorkflowError> {
        if stages.is_empty() {
            return Err(WorkflowError::Internal(
                "A validation chain needs at least one stage".to_string(),
            ));
        }
        Ok(Self { stages })
    }

    /// Stage kinds in run order.
    pub fn stages(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Runs every stage in order until one fails.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn run(&self, order: &Order, action: ProcessingAction) -> ProcessingResult {
        let mut ctx = ProcessingContext::new(order, action);
        ctx.log(None, format!("Processing order {} for {action}", order.id()));

        let mut warnings = Vec::new();
        let mut message = String::new();

        for stage in &self.stages {
            let kind = stage.kind();
            let outcome = AssertUnwindSafe(stage.check(&mut ctx)).catch_unwind().await;

            let fault = match outcome {
                Ok(Ok(outcome)) if outcome.success => {
                    ctx.log(Some(kind), format!("{kind} passed: {}", outcome.message));
                    warnings.extend(outcome.warnings);
                    message = outcome.message;
                    continue;
                }
                Ok(Ok(outcome)) => {
                    ctx.log(Some(kind), format!("{kind} failed: {}", outcome.message));
                    ctx.log(None, format!("Processing failed: {}", outcome.message));
                    metrics::counter!("validation_failures_total", "stage" => kind.as_str())
                        .increment(1);
                    tracing::warn!(stage = %kind, errors = ?outcome.errors, "order rejected");

                    warnings.extend(outcome.warnings);
                    return ProcessingResult {
                        success: false,
                        message: outcome.message,
                        errors: outcome.errors,
                        warnings,
                        failed_stage: Some(kind),
                        flags: ctx.flags,
                        log: ctx.log,
                    };
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => format!("{kind} panicked"),
            };

            ctx.log(Some(kind), format!("Error during processing: {fault}"));
            metrics::counter!("validation_failures_total", "stage" => kind.as_str()).increment(1);
            tracing::error!(stage = %kind, error = %fault, "validation stage faulted");

            return ProcessingResult {
                success: false,
                message: format!("Internal error during processing: {fault}"),
                errors: vec![fault],
                warnings,
                failed_stage: Some(kind),
                flags: ctx.flags,
                log: ctx.log,
            };
        }

        ctx.log(None, "Processing completed");
        tracing::debug!(warnings = warnings.len(), "order passed validation");

        ProcessingResult {
            success: true,
            message,
            errors: Vec::new(),
            warnings,
            failed_stage: None,
            flags: ctx.flags,
            log: ctx.log,
        }
    }
}

impl std::fmt::Debug for ValidationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationChain")
            .field("stages", &self.stages())
            .finish()
    }
}
