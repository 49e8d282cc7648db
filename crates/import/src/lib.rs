pub mod csv;
pub mod dedup;
pub mod error;
pub mod reconcile;
pub(crate) mod util;

pub use self::csv::{parse_and_validate, read_bills, BillRows, ColumnLayout, REQUIRED_COLUMNS};
pub use dedup::{is_fuzzy_duplicate, remove_batch_duplicates};
pub use error::{IngestError, RowFault};
pub use reconcile::{MatchOutcome, Reconciler};
pub use util::{levenshtein_distance, vendor_names_similar, MAX_VENDOR_EDIT_DISTANCE};
