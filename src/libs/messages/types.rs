#[derive(Debug, Clone)]
pub enum Message {
    // === PLAN MESSAGES ===
    PlanCreated(usize),                // step count
    PlanEmpty,
    PlanWritten(String),               // path
    PlanLoaded(String),                // path
    PlanSourceHash(String),            // hash
    PlanContainsDangerous(usize),      // dangerous step count
    SaferAlternativesHeader,
    SnapshotWritten(String),           // path

    // === DIFF MESSAGES ===
    DiffEmpty,
    DiffSummary {
        added: usize,
        removed: usize,
        modified: usize,
    },

    // === PARSE / VALIDATE MESSAGES ===
    SchemaParsed {
        tables: usize,
        files: usize,
    },
    SchemaValid(String),               // path
    ParseWarning(String),              // rendered warning

    // === INTROSPECTION MESSAGES ===
    IntrospectedSchema {
        dialect: String,
        tables: usize,
    },
    SchemaHash(String),                // hash
    SchemaExported(String),            // path

    // === APPLY MESSAGES ===
    ApplyStarting(usize),              // executable step count
    ApplyStep {
        index: usize,
        total: usize,
        description: String,
    },
    ApplySucceeded(usize),             // steps applied
    ApplyFailed(String),               // detail
    ApplySkippedCommentStep(String),   // description
    ShadowRehearsalStarting,
    ShadowRehearsalPassed,
    ShadowSkipped,
    ShadowSkipDiscouraged,
    SourceHashVerified,
    ConfirmDangerousApply(usize),      // dangerous step count
    ApplyAborted,

    // === ROLLBACK MESSAGES ===
    RollbackGenerated(usize),          // step count
    RollbackWritten(String),           // path

    // === PHASE MESSAGES ===
    PhasePlanCreated {
        operation: String,
        total_phases: u32,
    },
    PhaseStatus {
        operation: String,
        current: u32,
        total: u32,
    },
    PhaseStarting {
        number: u32,
        name: String,
    },
    PhaseCompleted(u32),
    PhaseRequiresCodeDeploy(Vec<String>),
    PhaseVerification(Vec<String>),
    PhaseAllComplete,
    PhaseRolledBack(u32),
    PhaseStateMismatch,
    PhaseNoState,

    // === CONFIGURATION MESSAGES ===
    ConfigLoaded,
    DatabaseUrlMissing,

    // === GENERIC MESSAGES ===
    Cancelled,
    OperationTimedOut(u64),            // seconds
}
