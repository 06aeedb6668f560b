//! Pascal VOC XML annotation records.
//!
//! The record layout follows what common labelling tools write:
//!
//! ```text
//! <annotation>
//!     <folder>..</folder> <filename>..</filename> <path>..</path>
//!     <source><database>..</database></source>
//!     <size><width>..</width><height>..</height><depth>..</depth></size>
//!     <segmented>0</segmented>
//!     <object>
//!         <name>..</name> <pose>..</pose> <truncated>0</truncated> <difficult>0</difficult>
//!         <bndbox><xmin>..</xmin><ymin>..</ymin><xmax>..</xmax><ymax>..</ymax></bndbox>
//!     </object>
//! </annotation>
//! ```
//!
//! A parsed record keeps its source document. Writing it back rewrites the
//! text of the modelled elements in place and copies everything else
//! (attributes, comments, tool-specific elements such as `<occluded>` or
//! CVAT `<attributes>`) through unchanged.

use std::path::Path;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::se::Serializer;
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::decode::DecodedImage;

/// Errors for reading and writing annotation records.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// I/O error during file reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The XML is malformed or does not match the record layout.
    #[error("XML error: {0}")]
    Xml(String),

    /// The number of boxes differs from the number of objects.
    #[error("Expected {expected} boxes (one per object), got {actual}")]
    BoxCountMismatch { expected: usize, actual: usize },
}

fn xml_error(e: impl std::fmt::Display) -> AnnotationError {
    AnnotationError::Xml(e.to_string())
}

/// One Pascal VOC annotation record.
///
/// Records compare equal when their modelled fields are equal; the retained
/// source document does not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "annotation")]
pub struct VocAnnotation {
    /// Image folder, relative to the image root.
    #[serde(default)]
    pub folder: String,
    /// Image file name inside `folder`.
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VocSource>,
    pub size: VocSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmented: Option<u8>,
    /// Annotated objects, in document order.
    #[serde(rename = "object", default)]
    pub objects: Vec<VocObject>,
    #[serde(skip)]
    document: Option<SourceDocument>,
}

/// The XML a record was parsed from.
#[derive(Debug, Clone)]
struct SourceDocument {
    xml: String,
    /// Number of `<object>` children of the root.
    objects: usize,
}

impl PartialEq for VocAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.folder == other.folder
            && self.filename == other.filename
            && self.path == other.path
            && self.source == other.source
            && self.size == other.size
            && self.segmented == other.segmented
            && self.objects == other.objects
    }
}

impl Eq for VocAnnotation {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocSource {
    #[serde(default)]
    pub database: String,
}

/// Image dimensions as recorded in the annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocSize {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

fn default_depth() -> u32 {
    3
}

/// A labelled object with its box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficult: Option<u8>,
    pub bndbox: BoundingBox,
}

impl VocAnnotation {
    /// Parse a record from XML text.
    ///
    /// `<object>` elements may be interleaved with other children of the
    /// root.
    pub fn from_xml_str(xml: &str) -> Result<Self, AnnotationError> {
        let mut record: Self = quick_xml::de::from_str(xml).map_err(xml_error)?;
        record.document = Some(SourceDocument {
            xml: xml.to_string(),
            objects: record.objects.len(),
        });
        Ok(record)
    }

    /// Serialize to XML.
    ///
    /// A parsed record is written by patching its source document, so
    /// unmodelled content survives. Records built in code, or whose object
    /// list no longer matches the source, are serialized from scratch with
    /// an indented `<annotation>` root.
    pub fn to_xml_string(&self) -> Result<String, AnnotationError> {
        match &self.document {
            Some(doc) if doc.objects == self.objects.len() => self.patch_document(&doc.xml),
            _ => self.serialize_fresh(),
        }
    }

    fn serialize_fresh(&self) -> Result<String, AnnotationError> {
        let mut buffer = String::new();
        let mut ser = Serializer::with_root(&mut buffer, Some("annotation")).map_err(xml_error)?;
        ser.indent(' ', 4);

        self.serialize(ser).map_err(xml_error)?;

        buffer.push('\n');
        Ok(buffer)
    }

    /// Copy `xml` event by event, replacing the text of modelled elements.
    ///
    /// A `<path>` missing from the source is appended to the root.
    fn patch_document(&self, xml: &str) -> Result<String, AnnotationError> {
        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::with_capacity(xml.len()));

        // Element names from the root down to the current element.
        let mut stack: Vec<String> = Vec::new();
        let mut object: Option<usize> = None;
        let mut objects_seen = 0;
        let mut path_seen = false;
        // Inside a leaf whose text was already replaced.
        let mut replaced = false;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => {
                    let name = element_name(&start);
                    if stack.len() == 1 {
                        path_seen |= name == "path";
                        if name == "object" {
                            object = Some(objects_seen);
                            objects_seen += 1;
                        }
                    }
                    stack.push(name);

                    writer.write_event(Event::Start(start)).map_err(xml_error)?;
                    replaced = match self.modelled_text(&stack, object) {
                        Some(text) => {
                            writer
                                .write_event(Event::Text(BytesText::new(&text)))
                                .map_err(xml_error)?;
                            true
                        }
                        None => false,
                    };
                }
                Event::Empty(empty) => {
                    let name = element_name(&empty);
                    if stack.len() == 1 {
                        path_seen |= name == "path";
                        if name == "object" {
                            objects_seen += 1;
                        }
                    }
                    stack.push(name);

                    match self.modelled_text(&stack, object) {
                        Some(text) => {
                            let end = empty.to_end().into_owned();
                            writer.write_event(Event::Start(empty)).map_err(xml_error)?;
                            writer
                                .write_event(Event::Text(BytesText::new(&text)))
                                .map_err(xml_error)?;
                            writer.write_event(Event::End(end)).map_err(xml_error)?;
                        }
                        None => writer.write_event(Event::Empty(empty)).map_err(xml_error)?,
                    }
                    stack.pop();
                }
                Event::End(end) => {
                    if stack.len() == 1 && !path_seen {
                        if let Some(path) = &self.path {
                            writer
                                .create_element("path")
                                .write_text_content(BytesText::new(path))
                                .map_err(xml_error)?;
                        }
                    }
                    stack.pop();
                    if stack.len() == 1 {
                        object = None;
                    }
                    replaced = false;
                    writer.write_event(Event::End(end)).map_err(xml_error)?;
                }
                Event::Text(_) | Event::CData(_) if replaced => {}
                Event::Eof => break,
                event => writer.write_event(event).map_err(xml_error)?,
            }
        }

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    /// Current value of the element at `path`, if it is a modelled leaf.
    fn modelled_text(&self, path: &[String], object: Option<usize>) -> Option<String> {
        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        match path.as_slice() {
            [_, "folder"] => Some(self.folder.clone()),
            [_, "filename"] => Some(self.filename.clone()),
            [_, "path"] => self.path.clone(),
            [_, "source", "database"] => self.source.as_ref().map(|s| s.database.clone()),
            [_, "size", "width"] => Some(self.size.width.to_string()),
            [_, "size", "height"] => Some(self.size.height.to_string()),
            [_, "size", "depth"] => Some(self.size.depth.to_string()),
            [_, "segmented"] => self.segmented.map(|v| v.to_string()),
            [_, "object", field @ ..] => {
                let o = self.objects.get(object?)?;
                match field {
                    ["name"] => Some(o.name.clone()),
                    ["pose"] => o.pose.clone(),
                    ["truncated"] => o.truncated.map(|v| v.to_string()),
                    ["difficult"] => o.difficult.map(|v| v.to_string()),
                    ["bndbox", "xmin"] => Some(o.bndbox.xmin.to_string()),
                    ["bndbox", "ymin"] => Some(o.bndbox.ymin.to_string()),
                    ["bndbox", "xmax"] => Some(o.bndbox.xmax.to_string()),
                    ["bndbox", "ymax"] => Some(o.bndbox.ymax.to_string()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Read a record from a file.
    pub fn read_from(path: &Path) -> Result<Self, AnnotationError> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_xml_str(&xml)
    }

    /// Write the record to a file, replacing any existing content.
    pub fn write_to(&self, path: &Path) -> Result<(), AnnotationError> {
        std::fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }

    /// Object boxes in document order.
    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.objects.iter().map(|o| o.bndbox).collect()
    }

    /// Object labels in document order.
    pub fn labels(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.name.as_str()).collect()
    }

    /// Build the record for a transformed copy of the image.
    ///
    /// Sets the file name, the `folder/filename` path and the size of
    /// `image`, and replaces object boxes positionally. With `label`, every
    /// object is renamed to it. Depth and all other fields are kept.
    pub fn with_variant(
        &self,
        filename: &str,
        image: &DecodedImage,
        boxes: &[BoundingBox],
        label: Option<&str>,
    ) -> Result<Self, AnnotationError> {
        if boxes.len() != self.objects.len() {
            return Err(AnnotationError::BoxCountMismatch {
                expected: self.objects.len(),
                actual: boxes.len(),
            });
        }

        let mut record = self.clone();
        record.filename = filename.to_string();
        record.path = Some(
            Path::new(&self.folder)
                .join(filename)
                .to_string_lossy()
                .into_owned(),
        );
        record.size.width = image.width;
        record.size.height = image.height;

        for (object, bbox) in record.objects.iter_mut().zip(boxes) {
            object.bndbox = *bbox;
            if let Some(label) = label {
                object.name = label.to_string();
            }
        }

        Ok(record)
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELIMG_XML: &str = r#"<annotation verified="no">
	<folder>cats</folder>
	<filename>1_0.jpg</filename>
	<path>/data/cats/1_0.jpg</path>
	<source>
		<database>Unknown</database>
	</source>
	<size>
		<width>100</width>
		<height>200</height>
		<depth>3</depth>
	</size>
	<segmented>0</segmented>
	<object>
		<name>cat</name>
		<pose>Unspecified</pose>
		<truncated>0</truncated>
		<difficult>0</difficult>
		<bndbox>
			<xmin>10</xmin>
			<ymin>10</ymin>
			<xmax>50</xmax>
			<ymax>50</ymax>
		</bndbox>
	</object>
	<object>
		<name>dog</name>
		<pose>Unspecified</pose>
		<truncated>1</truncated>
		<difficult>0</difficult>
		<bndbox>
			<xmin>0</xmin>
			<ymin>60</ymin>
			<xmax>100</xmax>
			<ymax>200</ymax>
		</bndbox>
	</object>
</annotation>
"#;

    const MINIMAL_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
    <folder>f</folder>
    <filename>a.png</filename>
    <size><width>4</width><height>3</height></size>
</annotation>"#;

    #[test]
    fn test_parse_labelimg_record() {
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();

        assert_eq!(record.folder, "cats");
        assert_eq!(record.filename, "1_0.jpg");
        assert_eq!(record.path.as_deref(), Some("/data/cats/1_0.jpg"));
        assert_eq!(record.size, VocSize { width: 100, height: 200, depth: 3 });
        assert_eq!(record.segmented, Some(0));
        assert_eq!(record.labels(), vec!["cat", "dog"]);
        assert_eq!(
            record.boxes(),
            vec![BoundingBox::new(10, 10, 50, 50), BoundingBox::new(0, 60, 100, 200)]
        );
        assert_eq!(record.objects[1].truncated, Some(1));
    }

    #[test]
    fn test_parse_minimal_record() {
        let record = VocAnnotation::from_xml_str(MINIMAL_XML).unwrap();

        assert_eq!(record.size.depth, 3);
        assert!(record.objects.is_empty());
        assert!(record.path.is_none());
        assert!(record.source.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_size() {
        let xml = "<annotation><folder>f</folder><filename>a.png</filename></annotation>";
        assert!(matches!(
            VocAnnotation::from_xml_str(xml),
            Err(AnnotationError::Xml(_))
        ));
    }

    #[test]
    fn test_parse_rejects_fractional_coordinates() {
        let xml = LABELIMG_XML.replace("<xmin>10</xmin>", "<xmin>10.5</xmin>");
        assert!(VocAnnotation::from_xml_str(&xml).is_err());
    }

    #[test]
    fn test_xml_round_trip() {
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();
        let xml = record.to_xml_string().unwrap();

        assert!(xml.starts_with("<annotation verified=\"no\">"));
        assert!(xml.contains("<xmin>10</xmin>"));
        assert_eq!(VocAnnotation::from_xml_str(&xml).unwrap(), record);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let record = VocAnnotation::from_xml_str(MINIMAL_XML).unwrap();
        let xml = record.to_xml_string().unwrap();

        assert!(!xml.contains("<path>"));
        assert!(!xml.contains("<segmented>"));
        assert!(!xml.contains("<object>"));
    }

    #[test]
    fn test_records_built_in_code_serialize_fresh() {
        let mut record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();
        record.objects.truncate(1);
        let xml = record.to_xml_string().unwrap();

        assert!(xml.starts_with("<annotation>"));
        assert!(!xml.contains("verified"));
        assert_eq!(VocAnnotation::from_xml_str(&xml).unwrap(), record);
    }

    #[test]
    fn test_with_variant_keeps_unmodelled_content() {
        let xml = r#"<annotation verified="yes">
    <!-- exported by cvat -->
    <folder>cats</folder>
    <filename>1_0.jpg</filename>
    <owner><name>lab</name></owner>
    <size><width>100</width><height>200</height><depth>3</depth></size>
    <object>
        <name>cat</name>
        <occluded>1</occluded>
        <bndbox><xmin>10</xmin><ymin>10</ymin><xmax>50</xmax><ymax>50</ymax></bndbox>
        <attributes>
            <attribute><name>rotation</name><value>0.0</value></attribute>
        </attributes>
    </object>
</annotation>"#;
        let record = VocAnnotation::from_xml_str(xml).unwrap();
        let image = DecodedImage::filled(200, 100, 3, 0);

        let out = record
            .with_variant("1_0_1.jpg", &image, &[BoundingBox::new(10, 50, 50, 90)], Some("label_1"))
            .unwrap()
            .to_xml_string()
            .unwrap();

        assert!(out.contains(r#"<annotation verified="yes">"#));
        assert!(out.contains("<!-- exported by cvat -->"));
        assert!(out.contains("<owner><name>lab</name></owner>"));
        assert!(out.contains("<occluded>1</occluded>"));
        assert!(out.contains("<attribute><name>rotation</name><value>0.0</value></attribute>"));
        assert!(out.contains("<name>label_1</name>"));
        assert!(out.contains("<filename>1_0_1.jpg</filename>"));
        assert!(out.contains("<width>200</width><height>100</height>"));
        assert!(out.contains("<xmin>10</xmin><ymin>50</ymin><xmax>50</xmax><ymax>90</ymax>"));

        let reread = VocAnnotation::from_xml_str(&out).unwrap();
        assert_eq!(reread.boxes(), vec![BoundingBox::new(10, 50, 50, 90)]);
        assert_eq!(reread.path.as_deref(), Some("cats/1_0_1.jpg"));
    }

    #[test]
    fn test_interleaved_objects() {
        let xml = r#"<annotation>
    <folder>f</folder>
    <filename>a.png</filename>
    <object><name>first</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>
    <size><width>10</width><height>10</height></size>
    <object><name>second</name><bndbox><xmin>5</xmin><ymin>6</ymin><xmax>7</xmax><ymax>8</ymax></bndbox></object>
</annotation>"#;
        let record = VocAnnotation::from_xml_str(xml).unwrap();
        assert_eq!(record.labels(), vec!["first", "second"]);
        assert_eq!(
            record.boxes(),
            vec![BoundingBox::new(1, 2, 3, 4), BoundingBox::new(5, 6, 7, 8)]
        );

        let boxes = [BoundingBox::new(0, 0, 1, 1), BoundingBox::new(2, 2, 9, 9)];
        let image = DecodedImage::filled(10, 10, 3, 0);
        let out = record
            .with_variant("a_0.png", &image, &boxes, None)
            .unwrap()
            .to_xml_string()
            .unwrap();

        let reread = VocAnnotation::from_xml_str(&out).unwrap();
        assert_eq!(reread.labels(), vec!["first", "second"]);
        assert_eq!(reread.boxes(), boxes.to_vec());
    }

    #[test]
    fn test_with_variant_updates_record() {
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();
        let image = DecodedImage::filled(200, 100, 3, 0);
        let boxes = [BoundingBox::new(10, 50, 50, 90), BoundingBox::new(60, 0, 200, 100)];

        let updated = record
            .with_variant("1_0_1.jpg", &image, &boxes, Some("label_1"))
            .unwrap();

        assert_eq!(updated.filename, "1_0_1.jpg");
        assert_eq!(updated.path.as_deref(), Some("cats/1_0_1.jpg"));
        assert_eq!((updated.size.width, updated.size.height), (200, 100));
        assert_eq!(updated.boxes(), boxes.to_vec());
        assert_eq!(updated.labels(), vec!["label_1", "label_1"]);
        assert_eq!(updated.objects[1].truncated, Some(1));
        // Source record is untouched.
        assert_eq!(record.labels(), vec!["cat", "dog"]);
    }

    #[test]
    fn test_with_variant_keeps_labels() {
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();
        let image = DecodedImage::filled(100, 200, 3, 0);
        let updated = record
            .with_variant("x.jpg", &image, &record.boxes(), None)
            .unwrap();
        assert_eq!(updated.labels(), vec!["cat", "dog"]);
    }

    #[test]
    fn test_with_variant_box_count_mismatch() {
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();
        let image = DecodedImage::filled(1, 1, 3, 0);
        let err = record.with_variant("x.jpg", &image, &[], None).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::BoxCountMismatch {
                expected: 2,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xml");
        let record = VocAnnotation::from_xml_str(LABELIMG_XML).unwrap();

        record.write_to(&path).unwrap();
        assert_eq!(VocAnnotation::read_from(&path).unwrap(), record);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = VocAnnotation::read_from(&dir.path().join("none.xml"));
        assert!(matches!(result, Err(AnnotationError::Io(_))));
    }
}
