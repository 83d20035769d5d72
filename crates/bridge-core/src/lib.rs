pub mod canonical;
pub mod context;
pub mod job;
pub mod mapper;
pub mod mappers;
pub mod service;
pub mod transformer;
pub mod types;
pub mod workflow;

pub use canonical::{
    dangling_step_ids, is_dense_order, normalize_step_order, Attachment, Automation,
    CanonicalEntity, CustomField, Link, StepResult, Tag, TestCase, TestCycle, TestExecution,
    TestStep, TestSuite, User,
};
pub use context::TransformationContext;
pub use job::{JobSpec, MigrationJob};
pub use mapper::{Mapper, MapperError, MapperRegistry};
pub use service::TransformationService;
pub use transformer::{TransformError, Transformer, Translation};
pub use types::{
    EntityType, ExecutionStatus, FieldType, Id, JobStatus, Priority, StepStatus, TestCaseStatus,
    TranslationStatus, WorkflowState,
};
pub use workflow::{Workflow, WorkflowError, WorkflowStep, WORKFLOW_TYPE_MIGRATION};
