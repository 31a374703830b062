//! REST surface shared by modules: the typed operation builder, RFC 9457
//! problem details and the catch-all handler error boundary.

pub mod error;
pub mod operation_builder;
pub mod problem;

pub use error::{server_error_problem, ApiError, ApiResult};
pub use operation_builder::{
    ensure_schema, state, Missing, OpenApiRegistry, OperationBuilder, OperationSpec,
    ParamSpec, Present, ResponseSpec, SchemaCollection,
};
pub use problem::{Problem, ProblemResponse, APPLICATION_PROBLEM_JSON};
