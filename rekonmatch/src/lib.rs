pub mod config;
pub mod dataset;
pub mod errors;
pub mod metrics;
pub mod numeric;
pub mod query;
pub mod results;
pub mod session;
pub mod workspace;

pub use config::QueryConfig;
pub use dataset::{CellValue, Dataset, Row, Side};
pub use errors::{QueryError, QueryResult};
pub use query::{run_query, QueryOptions, QuerySpec, SearchCriterion, SearchOperator};
pub use results::{QueryOutput, ResultRow, RowKind};
pub use session::{MoveDirection, Session, StoredDataset};
pub use workspace::Workspace;
