//! Annotation records that pair boxes with object labels.
//!
//! Only Pascal VOC XML is supported. Boxes are exchanged with the transform
//! layer as an ordered list that is positionally paired with the record's
//! objects.

mod voc;

pub use voc::{AnnotationError, VocAnnotation, VocObject, VocSize, VocSource};
