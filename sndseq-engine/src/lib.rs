pub mod dispatcher;
pub mod encoder;
pub mod engine;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use engine::{Outcome, SeqDispatch};
pub use registry::{Operation, OperationDescriptor, Registry};
