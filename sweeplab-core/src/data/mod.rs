//! Dataset acquisition: the DatasetProvider contract and the stock providers.

pub mod canonicalize;
pub mod csv_file;
pub mod provider;
pub mod synthetic;

pub use canonicalize::{build_series, normalize, NormalizeStats};
pub use csv_file::CsvProvider;
pub use provider::{DataError, DatasetProvider, StaticProvider};
pub use synthetic::SyntheticProvider;
