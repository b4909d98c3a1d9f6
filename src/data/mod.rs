pub mod columnar;
pub mod delimited;
pub mod facets;
pub mod loader;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod table;
pub mod validate;
