//! The catalogue of content-type interpretations a body can be viewed as.
//!
//! A [`ContentType`] is an *interpretation*, not a MIME type: the same bytes may be
//! legitimately viewed as `json`, `text` or `raw` hex. The fixed MIME mapping in
//! [`compatible_types`] decides which interpretations a declared header vouches for.

use mime::Mime;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// An interpretation of a body that can be offered to the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Text,
    Json,
    Xml,
    Html,
    Css,
    #[serde(rename = "javascript")]
    JavaScript,
    Markdown,
    Yaml,
    Image,
    Raw,
    Base64,
    Form,
    EventStream,
    Protobuf,
    GrpcProto,
}

impl ContentType {
    pub const ALL: [ContentType; 15] = [
        ContentType::Text,
        ContentType::Json,
        ContentType::Xml,
        ContentType::Html,
        ContentType::Css,
        ContentType::JavaScript,
        ContentType::Markdown,
        ContentType::Yaml,
        ContentType::Image,
        ContentType::Raw,
        ContentType::Base64,
        ContentType::Form,
        ContentType::EventStream,
        ContentType::Protobuf,
        ContentType::GrpcProto,
    ];

    /// The stable tag, also used as the editor language key.
    pub fn tag(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Json => "json",
            ContentType::Xml => "xml",
            ContentType::Html => "html",
            ContentType::Css => "css",
            ContentType::JavaScript => "javascript",
            ContentType::Markdown => "markdown",
            ContentType::Yaml => "yaml",
            ContentType::Image => "image",
            ContentType::Raw => "raw",
            ContentType::Base64 => "base64",
            ContentType::Form => "form",
            ContentType::EventStream => "event-stream",
            ContentType::Protobuf => "protobuf",
            ContentType::GrpcProto => "grpc-proto",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ContentType::Text => "Text",
            ContentType::Json => "JSON",
            ContentType::Xml => "XML",
            ContentType::Html => "HTML",
            ContentType::Css => "CSS",
            ContentType::JavaScript => "JavaScript",
            ContentType::Markdown => "Markdown",
            ContentType::Yaml => "YAML",
            ContentType::Image => "Image",
            ContentType::Raw => "Hexadecimal",
            ContentType::Base64 => "Base64",
            ContentType::Form => "URL-Encoded",
            ContentType::EventStream => "Event stream",
            ContentType::Protobuf => "Protobuf",
            ContentType::GrpcProto => "gRPC",
        }
    }

    /// Returns true if the interpretation renders the body as (lossless) text.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            ContentType::Text
                | ContentType::Json
                | ContentType::Xml
                | ContentType::Html
                | ContentType::Css
                | ContentType::JavaScript
                | ContentType::Markdown
                | ContentType::Yaml
                | ContentType::EventStream
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The narrower set of interpretations that survive an edit round-trip.
///
/// Rendered interpretations such as `image` or decoded `base64` are viewable but
/// cannot be turned back into the same bytes by editing text, so they are absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditableContentType {
    #[default]
    Text,
    Json,
    Xml,
    Html,
    Css,
    #[serde(rename = "javascript")]
    JavaScript,
}

impl EditableContentType {
    pub const ALL: [EditableContentType; 6] = [
        EditableContentType::Text,
        EditableContentType::Json,
        EditableContentType::Xml,
        EditableContentType::Html,
        EditableContentType::Css,
        EditableContentType::JavaScript,
    ];

    /// Derives the default editable interpretation from a raw `content-type` header value.
    ///
    /// Anything absent, unparseable or without an editable counterpart edits as text.
    pub fn from_header(header: Option<&str>) -> Self {
        header
            .and_then(parse_mime)
            .and_then(|mime| compatible_types(&mime).into_iter().find_map(|ct| EditableContentType::try_from(ct).ok()))
            .unwrap_or_default()
    }

    pub fn tag(self) -> &'static str {
        ContentType::from(self).tag()
    }
}

impl From<EditableContentType> for ContentType {
    fn from(value: EditableContentType) -> Self {
        match value {
            EditableContentType::Text => ContentType::Text,
            EditableContentType::Json => ContentType::Json,
            EditableContentType::Xml => ContentType::Xml,
            EditableContentType::Html => ContentType::Html,
            EditableContentType::Css => ContentType::Css,
            EditableContentType::JavaScript => ContentType::JavaScript,
        }
    }
}

impl TryFrom<ContentType> for EditableContentType {
    type Error = ContentType;

    fn try_from(value: ContentType) -> Result<Self, Self::Error> {
        match value {
            ContentType::Text => Ok(EditableContentType::Text),
            ContentType::Json => Ok(EditableContentType::Json),
            ContentType::Xml => Ok(EditableContentType::Xml),
            ContentType::Html => Ok(EditableContentType::Html),
            ContentType::Css => Ok(EditableContentType::Css),
            ContentType::JavaScript => Ok(EditableContentType::JavaScript),
            other => Err(other),
        }
    }
}

impl fmt::Display for EditableContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parses a raw header value into a [`Mime`], logging and discarding garbage.
pub fn parse_mime(header: &str) -> Option<Mime> {
    match header.trim().parse::<Mime>() {
        Ok(mime) => Some(mime),
        Err(e) => {
            debug!(header, cause = %e, "ignore unparseable content-type");
            None
        }
    }
}

/// The fixed mapping from a declared MIME type to the interpretations it vouches for.
///
/// Parameters such as `charset` are ignored. The result is ordered most-specific first
/// and may be empty for types we know nothing about.
pub fn compatible_types(mime: &Mime) -> Vec<ContentType> {
    let essence = mime.essence_str().to_ascii_lowercase();
    let (top, sub) = essence.split_once('/').unwrap_or((essence.as_str(), ""));

    let mut types = Vec::with_capacity(2);
    match (top, sub) {
        ("application", "json" | "x-json") => push_unique(&mut types, ContentType::Json),
        ("application" | "text", "xml") => push_unique(&mut types, ContentType::Xml),
        ("text", "html") => push_unique(&mut types, ContentType::Html),
        ("application", "xhtml+xml") => push_unique(&mut types, ContentType::Html),
        ("text", "css") => push_unique(&mut types, ContentType::Css),
        (_, "javascript" | "x-javascript" | "ecmascript") => push_unique(&mut types, ContentType::JavaScript),
        ("text", "markdown" | "x-markdown") => push_unique(&mut types, ContentType::Markdown),
        (_, "yaml" | "x-yaml") => push_unique(&mut types, ContentType::Yaml),
        ("image", _) => push_unique(&mut types, ContentType::Image),
        ("application", "x-www-form-urlencoded") => push_unique(&mut types, ContentType::Form),
        ("text", "event-stream") => push_unique(&mut types, ContentType::EventStream),
        ("application", "grpc" | "grpc+proto") => {
            push_unique(&mut types, ContentType::GrpcProto);
            push_unique(&mut types, ContentType::Protobuf);
        }
        ("application", "protobuf" | "x-protobuf" | "vnd.google.protobuf") => push_unique(&mut types, ContentType::Protobuf),
        ("application", "base64") => push_unique(&mut types, ContentType::Base64),
        ("application", "octet-stream") => push_unique(&mut types, ContentType::Raw),
        ("text", _) => push_unique(&mut types, ContentType::Text),
        _ => (),
    }

    // structured syntax suffixes, RFC 6839
    match sub.rsplit_once('+').map(|(_, suffix)| suffix) {
        Some("json") => push_unique(&mut types, ContentType::Json),
        Some("xml") => push_unique(&mut types, ContentType::Xml),
        _ => (),
    }

    types
}

/// Like [`compatible_types`], starting from the raw header value.
pub fn compatible_types_for_header(header: &str) -> Vec<ContentType> {
    parse_mime(header).map(|mime| compatible_types(&mime)).unwrap_or_default()
}

pub(crate) fn push_unique(types: &mut Vec<ContentType>, content_type: ContentType) {
    if !types.contains(&content_type) {
        types.push(content_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types_for(header: &str) -> Vec<ContentType> {
        compatible_types_for_header(header)
    }

    #[test]
    fn json_family() {
        assert_eq!(types_for("application/json"), vec![ContentType::Json]);
        assert_eq!(types_for("application/json; charset=utf-8"), vec![ContentType::Json]);
        assert_eq!(types_for("application/vnd.api+json"), vec![ContentType::Json]);
        assert_eq!(types_for("Application/JSON"), vec![ContentType::Json]);
    }

    #[test]
    fn xml_and_html_family() {
        assert_eq!(types_for("text/xml"), vec![ContentType::Xml]);
        assert_eq!(types_for("application/atom+xml"), vec![ContentType::Xml]);
        assert_eq!(types_for("text/html; charset=iso-8859-1"), vec![ContentType::Html]);
        assert_eq!(types_for("application/xhtml+xml"), vec![ContentType::Html, ContentType::Xml]);
        assert_eq!(types_for("image/svg+xml"), vec![ContentType::Image, ContentType::Xml]);
    }

    #[test]
    fn image_wildcard() {
        assert_eq!(types_for("image/png"), vec![ContentType::Image]);
        assert_eq!(types_for("image/webp"), vec![ContentType::Image]);
    }

    #[test]
    fn grpc_offers_protobuf_too() {
        assert_eq!(types_for("application/grpc"), vec![ContentType::GrpcProto, ContentType::Protobuf]);
        assert_eq!(types_for("application/x-protobuf"), vec![ContentType::Protobuf]);
    }

    #[test]
    fn generic_text_falls_back_to_text() {
        assert_eq!(types_for("text/plain"), vec![ContentType::Text]);
        assert_eq!(types_for("text/csv"), vec![ContentType::Text]);
        assert_eq!(types_for("text/javascript"), vec![ContentType::JavaScript]);
        assert_eq!(types_for("text/event-stream"), vec![ContentType::EventStream]);
    }

    #[test]
    fn unknown_or_garbage_yields_nothing() {
        assert!(types_for("application/x-custom").is_empty());
        assert!(types_for("not a mime").is_empty());
        assert!(types_for("").is_empty());
    }

    #[test]
    fn editable_from_header() {
        assert_eq!(EditableContentType::from_header(None), EditableContentType::Text);
        assert_eq!(EditableContentType::from_header(Some("text/plain")), EditableContentType::Text);
        assert_eq!(EditableContentType::from_header(Some("application/json")), EditableContentType::Json);
        assert_eq!(EditableContentType::from_header(Some("application/problem+json")), EditableContentType::Json);
        assert_eq!(EditableContentType::from_header(Some("image/svg+xml")), EditableContentType::Xml);
        assert_eq!(EditableContentType::from_header(Some("image/png")), EditableContentType::Text);
        assert_eq!(EditableContentType::from_header(Some("garbage")), EditableContentType::Text);
    }

    #[test]
    fn editable_conversions() {
        for editable in EditableContentType::ALL {
            let viewable = ContentType::from(editable);
            assert_eq!(EditableContentType::try_from(viewable), Ok(editable));
            assert_eq!(editable.tag(), viewable.tag());
        }
        assert_eq!(EditableContentType::try_from(ContentType::Image), Err(ContentType::Image));
    }

    #[test]
    fn tags_match_serde_names() {
        for content_type in ContentType::ALL {
            let json = serde_json::to_string(&content_type).unwrap();
            assert_eq!(json, format!("\"{}\"", content_type.tag()));
        }
    }
}
