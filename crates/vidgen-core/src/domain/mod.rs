//! Domain - ドメインモデル（ids, message, status, report, errors）

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod state;

pub use errors::TransitionError;
pub use ids::{Id, IdMarker, MessageId, MessageKind, TaskId};
pub use message::Message;
pub use outcome::StatusReport;
pub use state::{Sender, VideoStatus};
