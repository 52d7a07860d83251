//! Parsing of `listDatastreams` responses.
//!
//! Elements are matched on their local name so that the `apim:`/`apia:`
//! prefixes (or their absence) used by different repository versions do not
//! matter.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regen_ocr_core::{DatastreamDescriptor, OCR_DSID, ObjectDatastreamSet, RawProfile};
use tracing::warn;

use crate::error::FedoraError;

/// Profile child elements this tool reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileField {
    Label,
    VersionId,
    State,
    Mime,
    Size,
    ControlGroup,
    Location,
    CreateDate,
}

impl ProfileField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"dsLabel" => Some(Self::Label),
            b"dsVersionID" => Some(Self::VersionId),
            b"dsState" => Some(Self::State),
            b"dsMIME" => Some(Self::Mime),
            b"dsSize" => Some(Self::Size),
            b"dsControlGroup" => Some(Self::ControlGroup),
            b"dsLocation" => Some(Self::Location),
            b"dsCreateDate" => Some(Self::CreateDate),
            _ => None,
        }
    }

    fn slot(self, raw: &mut RawProfile) -> &mut Option<String> {
        match self {
            Self::Label => &mut raw.label,
            Self::VersionId => &mut raw.version_id,
            Self::State => &mut raw.state,
            Self::Mime => &mut raw.mime_type,
            Self::Size => &mut raw.size,
            Self::ControlGroup => &mut raw.control_group,
            Self::Location => &mut raw.location,
            Self::CreateDate => &mut raw.created,
        }
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, FedoraError> {
    match element.try_get_attribute(name).map_err(FedoraError::xml)? {
        Some(attr) => Ok(Some(
            attr.unescape_value().map_err(FedoraError::xml)?.into_owned(),
        )),
        None => Ok(None),
    }
}

fn required_attribute(element: &BytesStart<'_>, name: &str) -> Result<String, FedoraError> {
    attribute(element, name)?.ok_or_else(|| {
        FedoraError::Xml(format!(
            "<{}> without '{name}' attribute",
            String::from_utf8_lossy(element.local_name().as_ref())
        ))
    })
}

fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

/// Parse a listing fetched without profiles.
pub fn parse_listing(xml: &str) -> Result<ObjectDatastreamSet, FedoraError> {
    let mut reader = reader(xml);
    let mut set = ObjectDatastreamSet::new();

    loop {
        match reader.read_event().map_err(FedoraError::xml)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"datastream" => {
                let id = required_attribute(&e, "dsid")?;
                let label = attribute(&e, "label")?.unwrap_or_default();
                let mime_type = attribute(&e, "mimeType")?.unwrap_or_default();
                set.insert(DatastreamDescriptor::listed(id, label, mime_type));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(set)
}

/// Parse a listing fetched with `profiles=true`.
///
/// A profile with an unreadable value is skipped, unless it is the `OCR`
/// profile, which fails the whole listing.
pub fn parse_profiles(xml: &str) -> Result<ObjectDatastreamSet, FedoraError> {
    let mut reader = reader(xml);
    let mut set = ObjectDatastreamSet::new();
    let mut current: Option<RawProfile> = None;
    let mut field: Option<ProfileField> = None;

    loop {
        match reader.read_event().map_err(FedoraError::xml)? {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == b"datastreamProfile" {
                    current = Some(RawProfile::new(required_attribute(&e, "dsID")?));
                    field = None;
                } else if current.is_some() {
                    field = ProfileField::from_local_name(name.as_ref());
                }
            }
            Event::Text(text) => {
                if let (Some(raw), Some(f)) = (current.as_mut(), field) {
                    let value = text.unescape().map_err(FedoraError::xml)?;
                    f.slot(raw).get_or_insert_with(String::new).push_str(&value);
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"datastreamProfile" {
                    if let Some(raw) = current.take() {
                        insert_profile(&mut set, raw)?;
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(raw) = current {
        return Err(FedoraError::Xml(format!(
            "datastream profile '{}' is not closed",
            raw.id
        )));
    }

    Ok(set)
}

fn insert_profile(set: &mut ObjectDatastreamSet, raw: RawProfile) -> Result<(), FedoraError> {
    let dsid = raw.id.clone();
    match DatastreamDescriptor::from_profile(raw) {
        Ok(descriptor) => {
            set.insert(descriptor);
            Ok(())
        }
        Err(e) if dsid != OCR_DSID => {
            warn!(%dsid, error = %e, "skipping unreadable datastream profile");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};
    use regen_ocr_core::DatastreamState;

    use super::*;

    const LISTING: &str = include_str!("../fixtures/list_datastreams.xml");
    const PROFILES: &str = include_str!("../fixtures/list_datastreams_profile.xml");

    #[test]
    fn parses_lightweight_listing() {
        let set = parse_listing(LISTING).unwrap();
        assert_eq!(set.len(), 5);

        let ocr = set.ocr().expect("OCR entry");
        assert_eq!(ocr.label(), "OCR & text");
        assert_eq!(ocr.mime_type(), "text/plain");
        assert!(ocr.profile().is_none());

        let ids: Vec<_> = set.iter().map(DatastreamDescriptor::id).collect();
        assert_eq!(ids, ["DC", "RELS-EXT", "OBJ", "MODS", "OCR"]);
    }

    #[test]
    fn parses_profile_listing() {
        let set = parse_profiles(PROFILES).unwrap();
        assert_eq!(set.len(), 4);

        let ocr = set.ocr().and_then(DatastreamDescriptor::profile).unwrap();
        assert_eq!(ocr.label, "OCR Datastream");
        assert_eq!(ocr.version, Some(2));
        assert_eq!(ocr.state, Some(DatastreamState::Active));
        assert_eq!(ocr.mime_type, "text/plain");
        assert_eq!(ocr.size, Some(4096));
        assert_eq!(ocr.control_group, "M");
        assert_eq!(ocr.location, "test:pid+OCR+OCR.2");
        let created = ocr.created.unwrap();
        assert_eq!(
            created.with_nanosecond(0).unwrap(),
            Utc.with_ymd_and_hms(2009, 6, 30, 8, 15, 42).unwrap()
        );
        assert_eq!(created.nanosecond(), 123_000_000);
    }

    #[test]
    fn empty_elements_become_empty_fields() {
        let set = parse_profiles(PROFILES).unwrap();
        let tn = set.get("TN").and_then(DatastreamDescriptor::profile).unwrap();
        assert_eq!(tn.location, "");
        assert_eq!(tn.state, Some(DatastreamState::Inactive));
        assert_eq!(tn.size, Some(0));
        assert_eq!(
            tn.created,
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn unprefixed_profile_elements_are_accepted() {
        let xml = r#"<objectDatastreams>
            <datastreamProfile dsID="OCR">
              <dsLabel>OCR</dsLabel>
              <dsVersionID>OCR.0</dsVersionID>
              <dsCreateDate>2015-02-03T04:05:06.789Z</dsCreateDate>
              <dsState>A</dsState>
              <dsMIME>text/plain</dsMIME>
              <dsControlGroup>M</dsControlGroup>
              <dsSize>1</dsSize>
              <dsLocation>x</dsLocation>
            </datastreamProfile>
          </objectDatastreams>"#;
        let set = parse_profiles(xml).unwrap();
        assert_eq!(set.ocr().and_then(DatastreamDescriptor::version), Some(0));
    }

    #[test]
    fn empty_listing_parses_to_empty_set() {
        let xml = r#"<objectDatastreams pid="test:none"></objectDatastreams>"#;
        assert!(parse_listing(xml).unwrap().is_empty());
        assert!(parse_profiles(xml).unwrap().is_empty());
    }

    #[test]
    fn bad_ocr_profile_value_is_an_error() {
        let xml = r#"<objectDatastreams>
            <datastreamProfile dsID="OCR">
              <dsVersionID>OCR.0</dsVersionID>
              <dsCreateDate>yesterday</dsCreateDate>
              <dsState>A</dsState>
              <dsMIME>text/plain</dsMIME>
              <dsSize>1</dsSize>
            </datastreamProfile>
          </objectDatastreams>"#;
        assert!(matches!(
            parse_profiles(xml),
            Err(FedoraError::Profile(_))
        ));
    }

    #[test]
    fn blank_elements_on_other_datastreams_do_not_hide_ocr() {
        let xml = r#"<objectDatastreams xmlns:apim="urn:m">
            <datastreamProfile dsID="RELS-EXT">
              <apim:dsVersionID>RELS-EXT.0</apim:dsVersionID>
              <apim:dsCreateDate></apim:dsCreateDate>
              <apim:dsState>A</apim:dsState>
              <apim:dsMIME></apim:dsMIME>
              <apim:dsSize></apim:dsSize>
            </datastreamProfile>
            <datastreamProfile dsID="MODS">
              <apim:dsSize>lots</apim:dsSize>
            </datastreamProfile>
            <datastreamProfile dsID="OCR">
              <apim:dsVersionID>OCR.1</apim:dsVersionID>
              <apim:dsCreateDate>2009-06-30T08:15:42.123Z</apim:dsCreateDate>
              <apim:dsState>A</apim:dsState>
              <apim:dsMIME>text/plain</apim:dsMIME>
              <apim:dsSize>12</apim:dsSize>
            </datastreamProfile>
          </objectDatastreams>"#;
        let set = parse_profiles(xml).unwrap();

        let ids: Vec<_> = set.iter().map(DatastreamDescriptor::id).collect();
        assert_eq!(ids, ["RELS-EXT", "OCR"]);
        let rels = set.get("RELS-EXT").unwrap();
        assert_eq!(rels.mime_type(), "");
        assert!(rels.created().is_none());
        assert!(set.ocr().and_then(DatastreamDescriptor::created).is_some());
    }

    #[test]
    fn blank_ocr_creation_date_is_unknown() {
        let xml = r#"<objectDatastreams>
            <datastreamProfile dsID="OCR">
              <dsVersionID>OCR.0</dsVersionID>
              <dsCreateDate></dsCreateDate>
              <dsMIME>text/plain</dsMIME>
            </datastreamProfile>
          </objectDatastreams>"#;
        let set = parse_profiles(xml).unwrap();
        let ocr = set.ocr().unwrap();
        assert!(ocr.profile().is_some());
        assert!(ocr.created().is_none());
    }

    #[test]
    fn missing_dsid_is_an_error() {
        let xml = r#"<objectDatastreams><datastream label="x" mimeType="text/plain"/></objectDatastreams>"#;
        assert!(matches!(parse_listing(xml), Err(FedoraError::Xml(_))));
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = "<objectDatastreams><datastreamProfile dsID=\"OCR\"></objectDatastreams>";
        assert!(parse_profiles(xml).is_err());
    }
}
