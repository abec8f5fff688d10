pub mod bucket;
pub mod bucket_path;
pub mod encoding;
pub mod error;
pub mod hash;

pub use bucket::Bucket;
pub use bucket_path::BucketPath;
pub use error::{HashkvError, HashkvResult};
pub use hash::bucket_id_for_key;
