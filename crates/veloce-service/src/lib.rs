mod generator;
mod http;
mod local;
mod mock;
mod session;
mod traits;

pub use generator::{HttpGenerator, OfflineGenerator};
pub use http::HttpStore;
pub use local::LocalStore;
pub use mock::MockGenerator;
pub use session::{ChecklistEvent, ChecklistSession, SessionConfig};
pub use traits::{BreakdownGenerator, BreakdownRequest, ServiceError, SubTaskStore};
