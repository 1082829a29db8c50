// Storage adapters
// LanceDB holds one vector record per chunk; SQLite holds the matching
// metadata record. The two are linked by a shared vector id and nothing
// else -- there is no transaction spanning both stores.

pub mod metadata;
pub mod vector;

pub use metadata::MetadataStore;
pub use vector::{VectorHit, VectorPayload, VectorRecord, VectorStore};
