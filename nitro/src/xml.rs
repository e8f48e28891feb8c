//! Legacy furniture XML documents.
//!
//! The five documents embedded as binary data in a furniture SWF. Attribute
//! values are notoriously sloppy in the wild (blank numbers, `1`/`0` booleans,
//! floats where integers belong), so numeric and boolean attributes go through
//! the lenient `XmlInt` / `XmlBool` / `XmlFloat` wrappers.

use std::borrow::Cow;
use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("expected <{expected}> root element, found {found:?}")]
    WrongRoot {
        expected: &'static str,
        found: Option<String>,
    },
    #[error(transparent)]
    Deserialize(#[from] quick_xml::DeError),
}

/// The documents a furniture SWF can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Assets,
    Visualization,
    Logic,
    Index,
    Manifest,
}

impl DocumentKind {
    /// Symbol name suffix (after `_`) the document is exported under.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Visualization => "visualization",
            Self::Logic => "logic",
            Self::Index => "index",
            Self::Manifest => "manifest",
        }
    }

    pub fn root(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Visualization => "visualizationData",
            Self::Logic => "objectData",
            Self::Index => "object",
            Self::Manifest => "manifest",
        }
    }

    /// Whether a symbol with this name can hold the document.
    pub fn matches_symbol(self, name: &str) -> bool {
        let suffix = self.suffix();
        name == suffix
            || name
                .strip_suffix(suffix)
                .is_some_and(|head| head.ends_with('_'))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

pub trait XmlDocument: DeserializeOwned {
    const KIND: DocumentKind;
}

/// Decode, normalize and deserialize one embedded document.
pub fn parse_document<D: XmlDocument>(bytes: &[u8]) -> Result<D, XmlError> {
    let text = decode_text(bytes);
    let text = normalize_encoding(&text);

    let expected = D::KIND.root();
    let found = root_element(&text);
    if found.as_deref() != Some(expected) {
        return Err(XmlError::WrongRoot { expected, found });
    }

    Ok(quick_xml::de::from_str(&text)?)
}

/// UTF-8 when valid, Latin-1 otherwise. A leading BOM is dropped.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    };
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Cow::Owned(s) => Cow::Owned(s),
    }
}

/// The text is already UTF-8 by now, so an ISO-8859-1 declaration would lie.
pub fn normalize_encoding(text: &str) -> Cow<'_, str> {
    let lower = text.to_ascii_lowercase();
    for quote in ['"', '\''] {
        let needle = format!("encoding={quote}iso-8859-1{quote}");
        if let Some(pos) = lower.find(&needle) {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..pos]);
            out.push_str(&format!("encoding={quote}UTF-8{quote}"));
            out.push_str(&text[pos + needle.len()..]);
            return Cow::Owned(out);
        }
    }
    Cow::Borrowed(text)
}

fn root_element(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// Lenient attribute values

/// Integer attribute. Blank is 0, fractional values are truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlInt(pub i64);

impl<'de> Deserialize<'de> for XmlInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let s = raw.trim();
        if s.is_empty() {
            return Ok(Self(0));
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self(v));
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Self(v.trunc() as i64)),
            _ => Err(D::Error::custom(format!("invalid integer {raw:?}"))),
        }
    }
}

/// Boolean attribute: `true`/`1` or `false`/`0`/blank, case-insensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlBool(pub bool);

impl<'de> Deserialize<'de> for XmlBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Self(true)),
            "false" | "0" | "" => Ok(Self(false)),
            _ => Err(D::Error::custom(format!("invalid boolean {raw:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XmlFloat(pub f64);

impl<'de> Deserialize<'de> for XmlFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let s = raw.trim();
        if s.is_empty() {
            return Ok(Self(0.0));
        }
        s.parse::<f64>()
            .map(Self)
            .map_err(|_| D::Error::custom(format!("invalid number {raw:?}")))
    }
}

// assets

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetsXml {
    #[serde(default, rename = "asset")]
    pub assets: Vec<AssetXml>,
    #[serde(default, rename = "palette")]
    pub palettes: Vec<PaletteXml>,
}

impl XmlDocument for AssetsXml {
    const KIND: DocumentKind = DocumentKind::Assets;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetXml {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@source")]
    pub source: String,
    #[serde(rename = "@x")]
    pub x: XmlInt,
    #[serde(rename = "@y")]
    pub y: XmlInt,
    #[serde(rename = "@flipH")]
    pub flip_h: XmlBool,
    #[serde(rename = "@flipV")]
    pub flip_v: XmlBool,
    #[serde(rename = "@usesPalette")]
    pub uses_palette: XmlBool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaletteXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "@source")]
    pub source: String,
    #[serde(rename = "@master")]
    pub master: XmlBool,
    #[serde(rename = "@tags")]
    pub tags: String,
    #[serde(rename = "@breed")]
    pub breed: XmlInt,
    #[serde(rename = "@colorTag")]
    pub color_tag: XmlInt,
    #[serde(rename = "@color1")]
    pub color1: String,
    #[serde(rename = "@color2")]
    pub color2: String,
}

// visualization

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisualizationDataXml {
    #[serde(rename = "@type")]
    pub kind: String,
    pub graphics: GraphicsXml,
}

impl XmlDocument for VisualizationDataXml {
    const KIND: DocumentKind = DocumentKind::Visualization;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphicsXml {
    #[serde(default, rename = "visualization")]
    pub visualizations: Vec<VisualizationXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisualizationXml {
    #[serde(rename = "@size")]
    pub size: XmlInt,
    #[serde(rename = "@layerCount")]
    pub layer_count: XmlInt,
    #[serde(rename = "@angle")]
    pub angle: XmlInt,
    #[serde(rename = "@defaultPosture")]
    pub default_posture: String,
    pub layers: LayersXml,
    pub directions: DirectionsXml,
    pub colors: ColorsXml,
    pub animations: AnimationsXml,
    pub postures: Option<PosturesXml>,
    pub gestures: GesturesXml,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayersXml {
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayerXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "@x")]
    pub x: XmlInt,
    #[serde(rename = "@y")]
    pub y: XmlInt,
    #[serde(rename = "@z")]
    pub z: XmlInt,
    #[serde(rename = "@alpha")]
    pub alpha: XmlInt,
    #[serde(rename = "@ink")]
    pub ink: String,
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "@ignoreMouse")]
    pub ignore_mouse: XmlBool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectionsXml {
    #[serde(default, rename = "direction")]
    pub directions: Vec<DirectionXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectionXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "layer")]
    pub layers: Vec<LayerXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorsXml {
    #[serde(default, rename = "color")]
    pub colors: Vec<ColorXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColorXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "colorLayer")]
    pub layers: Vec<ColorLayerXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColorLayerXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "@color")]
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationsXml {
    #[serde(default, rename = "animation")]
    pub animations: Vec<AnimationXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimationXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "@transitionTo")]
    pub transition_to: XmlInt,
    #[serde(rename = "@transitionFrom")]
    pub transition_from: XmlInt,
    #[serde(rename = "@immediateChangeFrom")]
    pub immediate_change_from: XmlBool,
    #[serde(rename = "@randomStart")]
    pub random_start: XmlBool,
    #[serde(rename = "animationLayer")]
    pub layers: Vec<AnimationLayerXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimationLayerXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
    #[serde(rename = "@loopCount")]
    pub loop_count: XmlInt,
    #[serde(rename = "@frameRepeat")]
    pub frame_repeat: XmlInt,
    #[serde(rename = "@random")]
    pub random: XmlInt,
    #[serde(rename = "frameSequence")]
    pub frame_sequences: Vec<FrameSequenceXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameSequenceXml {
    #[serde(rename = "@loopCount")]
    pub loop_count: XmlInt,
    #[serde(rename = "@random")]
    pub random: XmlInt,
    #[serde(rename = "frame")]
    pub frames: Vec<FrameXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameXml {
    /// Kept as text: exporters write `NaN` or nothing for unused frames.
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@x")]
    pub x: XmlInt,
    #[serde(rename = "@y")]
    pub y: XmlInt,
    #[serde(rename = "@randomX")]
    pub random_x: XmlInt,
    #[serde(rename = "@randomY")]
    pub random_y: XmlInt,
    pub offsets: OffsetsXml,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffsetsXml {
    #[serde(default, rename = "offset")]
    pub offsets: Vec<FrameOffsetXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameOffsetXml {
    #[serde(rename = "@direction")]
    pub direction: XmlInt,
    #[serde(rename = "@x")]
    pub x: XmlInt,
    #[serde(rename = "@y")]
    pub y: XmlInt,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PosturesXml {
    #[serde(rename = "@defaultPosture")]
    pub default_posture: String,
    #[serde(rename = "posture")]
    pub postures: Vec<PostureXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostureXml {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@animationId")]
    pub animation_id: XmlInt,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GesturesXml {
    #[serde(default, rename = "gesture")]
    pub gestures: Vec<PostureXml>,
}

// logic

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogicXml {
    pub model: LogicModelXml,
}

impl XmlDocument for LogicXml {
    const KIND: DocumentKind = DocumentKind::Logic;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogicModelXml {
    pub dimensions: LogicDimensionsXml,
    pub directions: LogicDirectionsXml,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogicDimensionsXml {
    #[serde(rename = "@x")]
    pub x: XmlFloat,
    #[serde(rename = "@y")]
    pub y: XmlFloat,
    #[serde(rename = "@z")]
    pub z: XmlFloat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogicDirectionsXml {
    #[serde(default, rename = "direction")]
    pub directions: Vec<LogicDirectionXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogicDirectionXml {
    #[serde(rename = "@id")]
    pub id: XmlInt,
}

// index

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexXml {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@visualization")]
    pub visualization: String,
    #[serde(rename = "@logic")]
    pub logic: String,
}

impl XmlDocument for IndexXml {
    const KIND: DocumentKind = DocumentKind::Index;
}

// manifest

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestXml {
    pub library: ManifestLibraryXml,
}

impl XmlDocument for ManifestXml {
    const KIND: DocumentKind = DocumentKind::Manifest;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestLibraryXml {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@version")]
    pub version: String,
    pub assets: ManifestAssetsXml,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestAssetsXml {
    #[serde(default, rename = "asset")]
    pub assets: Vec<ManifestAssetXml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestAssetXml {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@mimeType")]
    pub mime_type: String,
}
