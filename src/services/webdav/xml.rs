use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use std::str;

use crate::errors::RemoteError;
use crate::models::{EntryKind, RemoteEntry};

#[derive(Debug, Default)]
struct MultistatusResponse {
    href: String,
    displayname: String,
    content_length: Option<i64>,
    last_modified: Option<String>,
    etag: Option<String>,
    is_collection: bool,
    status_ok: bool,
}

/// Parses a PROPFIND multistatus body into remote entries, directories
/// included. Hrefs are URL-decoded; entry paths keep the server prefix, the
/// caller strips it.
pub fn parse_multistatus(xml_text: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
    let mut reader = Reader::from_str(xml_text);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<MultistatusResponse> = None;
    let mut current_element = String::new();
    let mut in_response = false;
    let mut in_propstat = false;
    let mut in_resourcetype = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e)?;

                match name.as_str() {
                    "response" => {
                        in_response = true;
                        current = Some(MultistatusResponse::default());
                    }
                    "propstat" => {
                        in_propstat = true;
                    }
                    "resourcetype" => {
                        in_resourcetype = true;
                    }
                    _ => {
                        current_element = name;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                // Self-closing elements carry no text; the only one that
                // matters is <collection/> inside <resourcetype>.
                let name = local_name(&e)?;
                if name == "collection" && in_resourcetype {
                    if let Some(ref mut resp) = current {
                        resp.is_collection = true;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| parse_error(format!("invalid text node: {}", e)))?
                    .to_string();

                if in_response && !text.trim().is_empty() {
                    if let Some(ref mut resp) = current {
                        match current_element.as_str() {
                            "href" => resp.href = text.trim().to_string(),
                            "displayname" => resp.displayname = text.trim().to_string(),
                            "getcontentlength" => resp.content_length = text.trim().parse().ok(),
                            "getlastmodified" => resp.last_modified = Some(text.trim().to_string()),
                            "getetag" => resp.etag = Some(text.trim().to_string()),
                            "status" if in_propstat => {
                                if text.contains("200") {
                                    resp.status_ok = true;
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name_from_end(&e)?;

                match name.as_str() {
                    "response" => {
                        if let Some(resp) = current.take() {
                            if resp.status_ok && !resp.href.is_empty() {
                                entries.push(into_entry(resp));
                            }
                        }
                        in_response = false;
                    }
                    "propstat" => {
                        in_propstat = false;
                    }
                    "resourcetype" => {
                        in_resourcetype = false;
                    }
                    _ => {}
                }

                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(format!("XML parsing error: {}", e))),
            _ => {}
        }

        buf.clear();
    }

    Ok(entries)
}

fn into_entry(resp: MultistatusResponse) -> RemoteEntry {
    let decoded_href = urlencoding::decode(&resp.href)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| resp.href.clone());

    let path = decoded_href.trim_end_matches('/').to_string();

    let name = if resp.displayname.is_empty() {
        path.rsplit('/').next().unwrap_or("").to_string()
    } else {
        resp.displayname.clone()
    };

    RemoteEntry {
        path,
        name,
        kind: if resp.is_collection {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        last_modified: resp.last_modified.as_deref().and_then(parse_http_date),
        size: resp.content_length.unwrap_or(0),
        etag: resp.etag,
    }
}

fn local_name(e: &BytesStart) -> Result<String, RemoteError> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| parse_error(format!("invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

fn local_name_from_end(e: &BytesEnd) -> Result<String, RemoteError> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| parse_error(format!("invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn parse_error(details: String) -> RemoteError {
    RemoteError::Protocol {
        path: String::new(),
        details,
    }
}
