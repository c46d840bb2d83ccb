/*!
# Table-Test Rules

Transformation rules for Go table-driven tests.
*/

pub mod slice_to_map;

// Re-export commonly used rules
pub use slice_to_map::SliceToMapConverter;
