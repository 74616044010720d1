pub mod dispatcher;
pub mod state;

pub use dispatcher::PipelineDispatcher;
pub use state::{PipelineContext, ProcessorConfig, ProcessorState};
