//! Identity mapping: lot number and free text to table/department/product.

pub mod freetext;
pub mod lot_resolver;
pub mod process_mapper;
pub mod projection;

pub use freetext::{FreetextMapper, FreetextMapping};
pub use lot_resolver::LotResolver;
pub use process_mapper::ProcessMapper;
pub use projection::{ColumnProjection, ColumnProjector};
