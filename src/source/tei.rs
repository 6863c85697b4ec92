//! TEI-XML loader for genealogy datasets.
//!
//! Expected shape (namespace prefixes are ignored):
//!
//! ```text
//! <listPerson>
//!   <person xml:id="CFIB00169">
//!     <persName><forename>Anna</forename><surname>Huber</surname></persName>
//!     <sex value="W"/>
//!     <birth when="1750-03-02"/>
//!     <persName type="father" corresp="#CFIB00245"/>
//!     <persName type="partner" corresp="#CFIB00762">...</persName>
//!   </person>
//! </listPerson>
//! ```

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::MemorySource;
use crate::error::{FamtreeError, Result};
use crate::model::{Gender, PersonRecord, RelationKind, RelationRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Forename,
    Surname,
    Role,
    Sex,
    Birth,
    Death,
}

/// A `<person>` currently open in the document; `None` when it has no id.
struct OpenPerson {
    record: Option<PersonRecord>,
    depth: usize,
}

/// Parse one TEI document into person records, in document order.
pub fn parse_document(content: &str, origin: &str) -> Result<Vec<PersonRecord>> {
    let mut reader = Reader::from_str(content);

    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut open: Vec<OpenPerson> = Vec::new();
    let mut depth = 0usize;
    // Depth of a relation persName whose children must not be read as own names
    let mut relation_name_depth: Option<usize> = None;
    let mut capture: Option<(Field, usize, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = local_name(&e);
                if name == "person" {
                    open.push(OpenPerson {
                        record: attr(&e, b"id").map(|id| start_record(id, &e)),
                        depth,
                    });
                } else if let Some(record) = current_record(&mut open) {
                    if relation_name_depth.is_none() {
                        if let Some(field) = handle_element(record, &name, &e, false) {
                            capture = Some((field, depth, String::new()));
                        }
                        if name == "persName" && is_relation_name(&e) {
                            relation_name_depth = Some(depth);
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if name == "person" {
                    if let Some(id) = attr(&e, b"id") {
                        records.push(start_record(id, &e));
                    }
                } else if let Some(record) = current_record(&mut open) {
                    handle_element(record, &name, &e, relation_name_depth.is_some());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, _, ref mut text)) = capture {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some((_, _, ref mut text)) = capture {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else {
                        let name = String::from_utf8_lossy(e.as_ref());
                        match resolve_predefined_entity(&name) {
                            Some(value) => text.push_str(value),
                            None => log::debug!("Unknown entity &{}; in {}", name, origin),
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                if let Some((field, at, text)) = capture.take() {
                    if at == depth {
                        if let Some(record) = current_record(&mut open) {
                            commit(record, field, text.trim());
                        }
                    } else {
                        capture = Some((field, at, text));
                    }
                }
                if relation_name_depth == Some(depth) {
                    relation_name_depth = None;
                }
                if open.last().map(|p| p.depth) == Some(depth) {
                    if let Some(person) = open.pop() {
                        if let Some(record) = person.record {
                            records.push(record);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FamtreeError::Xml(format!(
                    "XML parse error in {} at byte {}: {}",
                    origin,
                    reader.buffer_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    log::debug!("Parsed {} person records from {}", records.len(), origin);
    Ok(records)
}

fn start_record(id: String, e: &BytesStart) -> PersonRecord {
    let mut record = PersonRecord::new(id);
    if let Some(sex) = attr(e, b"sex") {
        record.gender = Gender::parse(&sex);
    }
    record
}

fn current_record(open: &mut [OpenPerson]) -> Option<&mut PersonRecord> {
    open.last_mut().and_then(|p| p.record.as_mut())
}

/// Apply attributes of an element inside a person; returns the field whose
/// text content should be captured, if any.
fn handle_element(
    record: &mut PersonRecord,
    name: &str,
    e: &BytesStart,
    in_relation_name: bool,
) -> Option<Field> {
    if in_relation_name {
        return None;
    }
    match name {
        "persName" => {
            if let Some(kind) = attr(e, b"type").and_then(|t| RelationKind::parse(&t)) {
                for target in attr(e, b"corresp").iter().flat_map(|c| parse_refs(c)) {
                    let rel = RelationRef::new(kind, target);
                    if !record.relations.contains(&rel) {
                        record.relations.push(rel);
                    }
                }
            }
            None
        }
        "forename" => Some(Field::Forename),
        "surname" => Some(Field::Surname),
        "roleName" => Some(Field::Role),
        "sex" => match attr(e, b"value") {
            Some(value) => {
                record.gender = Gender::parse(&value);
                None
            }
            None => Some(Field::Sex),
        },
        "birth" => match attr(e, b"when") {
            Some(when) => {
                commit(record, Field::Birth, &when);
                None
            }
            None => Some(Field::Birth),
        },
        "death" => match attr(e, b"when") {
            Some(when) => {
                commit(record, Field::Death, &when);
                None
            }
            None => Some(Field::Death),
        },
        _ => None,
    }
}

fn commit(record: &mut PersonRecord, field: Field, value: &str) {
    if value.is_empty() {
        return;
    }
    let slot = match field {
        Field::Forename => &mut record.forename,
        Field::Surname => &mut record.surname,
        Field::Role => &mut record.role,
        Field::Birth => &mut record.date_of_birth,
        Field::Death => &mut record.date_of_death,
        Field::Sex => {
            record.gender = Gender::parse(value);
            return;
        }
    };
    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

fn is_relation_name(e: &BytesStart) -> bool {
    attr(e, b"type")
        .and_then(|t| RelationKind::parse(&t))
        .is_some()
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a `corresp` value into person ids: `"#A file.xml#B"` -> `["A", "B"]`.
fn parse_refs(corresp: &str) -> Vec<String> {
    corresp
        .split_whitespace()
        .map(|r| r.rsplit('#').next().unwrap_or(r).trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Discover all `.xml` files below `root`, sorted by path.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("xml"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    log::info!("Discovered {} TEI files in {}", files.len(), root.display());
    Ok(files)
}

/// Load a TEI file, or every TEI file below a directory, into one source.
pub fn load_path(path: &Path) -> Result<MemorySource> {
    let files = if path.is_dir() {
        discover_files(path)?
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        return Err(FamtreeError::InvalidInput(format!(
            "dataset path does not exist: {}",
            path.display()
        )));
    };

    let mut source = MemorySource::new();
    for file in &files {
        let content = std::fs::read_to_string(file)?;
        for record in parse_document(&content, &file.display().to_string())? {
            source.insert(record);
        }
    }

    log::info!("Loaded {} person records from {}", source.len(), path.display());
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RecordSource;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text><body>
    <listPerson>
      <person xml:id="P1">
        <persName>
          <forename>Anna</forename>
          <surname>Huber</surname>
          <roleName>Bäuerin</roleName>
        </persName>
        <sex value="W"/>
        <birth when="1750-03-02"/>
        <death>1801</death>
        <persName type="partner" corresp="#P2">
          <forename>Josef</forename>
        </persName>
      </person>
      <person xml:id="P2" sex="M">
        <persName><forename>Josef</forename><surname>Huber</surname></persName>
      </person>
      <person xml:id="P3">
        <persName><forename>Maria</forename></persName>
        <persName type="mother" corresp="#P1"/>
        <persName type="father" corresp="data.xml#P2"/>
      </person>
      <person>
        <persName><forename>Nobody</forename></persName>
      </person>
    </listPerson>
  </body></text>
</TEI>
"##;

    #[test]
    fn test_parse_document_records() {
        let records = parse_document(SAMPLE, "sample.xml").unwrap();
        assert_eq!(records.len(), 3);

        let anna = &records[0];
        assert_eq!(anna.id, "P1");
        assert_eq!(anna.forename.as_deref(), Some("Anna"));
        assert_eq!(anna.surname.as_deref(), Some("Huber"));
        assert_eq!(anna.role.as_deref(), Some("Bäuerin"));
        assert_eq!(anna.gender, Gender::W);
        assert_eq!(anna.date_of_birth.as_deref(), Some("1750-03-02"));
        assert_eq!(anna.date_of_death.as_deref(), Some("1801"));
        assert_eq!(anna.relations, vec![RelationRef::new(RelationKind::Partner, "P2")]);

        let josef = &records[1];
        assert_eq!(josef.gender, Gender::M);
        assert!(josef.relations.is_empty());
    }

    #[test]
    fn test_relation_names_do_not_overwrite_own_name() {
        let records = parse_document(SAMPLE, "sample.xml").unwrap();
        let anna = records.iter().find(|r| r.id == "P1").unwrap();
        // The partner persName holds "Josef" but must not leak into Anna's names
        assert_eq!(anna.forename.as_deref(), Some("Anna"));
    }

    #[test]
    fn test_corresp_prefix_stripped() {
        let records = parse_document(SAMPLE, "sample.xml").unwrap();
        let maria = records.iter().find(|r| r.id == "P3").unwrap();
        assert!(maria.relations.contains(&RelationRef::new(RelationKind::Mother, "P1")));
        assert!(maria.relations.contains(&RelationRef::new(RelationKind::Father, "P2")));
        assert_eq!(maria.gender, Gender::Unknown);
        assert!(maria.date_of_birth.is_none());
    }

    #[test]
    fn test_entity_references_in_names() {
        let doc = r##"<listPerson>
  <person xml:id="A">
    <persName><forename>J&#246;rg</forename><surname>M&amp;ller</surname></persName>
    <death>&lt;1801</death>
  </person>
</listPerson>"##;
        let records = parse_document(doc, "entities.xml").unwrap();
        assert_eq!(records[0].forename.as_deref(), Some("Jörg"));
        assert_eq!(records[0].surname.as_deref(), Some("M&ller"));
        assert_eq!(records[0].date_of_death.as_deref(), Some("<1801"));
    }

    #[test]
    fn test_parse_refs_multiple() {
        assert_eq!(parse_refs("#A  #B"), vec!["A", "B"]);
        assert_eq!(parse_refs("other.xml#C"), vec!["C"]);
        assert!(parse_refs("  ").is_empty());
    }

    #[test]
    fn test_parse_document_malformed() {
        let result = parse_document("<listPerson><person xml:id=\"A\"></listPerson>", "bad.xml");
        assert!(matches!(result, Err(FamtreeError::Xml(_))));
    }

    #[test]
    fn test_load_path_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(
            root.join("a.xml"),
            r##"<listPerson><person xml:id="A"><sex value="M"/></person></listPerson>"##,
        )
        .unwrap();
        fs::write(
            root.join("nested/b.xml"),
            r##"<listPerson><person xml:id="B"><persName type="father" corresp="#A"/></person></listPerson>"##,
        )
        .unwrap();
        fs::write(root.join("notes.txt"), "not xml").unwrap();

        let source = load_path(root).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(
            source.backward_relations("A"),
            vec![RelationRef::new(RelationKind::Father, "B")]
        );
    }

    #[test]
    fn test_load_path_missing() {
        let result = load_path(Path::new("/nonexistent/famtree/data"));
        assert!(matches!(result, Err(FamtreeError::InvalidInput(_))));
    }
}
