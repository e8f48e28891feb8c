//! The Nitro asset description stored as `<name>.json` inside an archive.
//!
//! Maps are `BTreeMap` so the serialized document is stable byte for byte.
//! Zero and empty fields are omitted the same way the Nitro renderer's own
//! converter writes them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn is_zero(v: &i64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetModel {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub visualization_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logic_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spritesheet: Option<Spritesheet>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<String, AssetRef>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub palettes: BTreeMap<String, PaletteRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visualizations: Vec<Visualization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<AssetIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

// spritesheet

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spritesheet {
    pub meta: SpritesheetMeta,
    pub frames: BTreeMap<String, AtlasFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpritesheetMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub image: String,
    pub format: String,
    pub size: Size,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtlasFrame {
    pub frame: Rect,
    pub rotated: bool,
    pub trimmed: bool,
    pub sprite_source_size: Rect,
    pub source_size: Size,
    pub pivot: Point,
}

impl AtlasFrame {
    /// Untrimmed, unrotated frame at `(x, y)` pivoting on its centre.
    pub fn at(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            frame: Rect { x, y, w, h },
            rotated: false,
            trimmed: false,
            sprite_source_size: Rect { x: 0, y: 0, w, h },
            source_size: Size { w, h },
            pivot: Point { x: 0.5, y: 0.5 },
        }
    }
}

// assets and palettes

/// One entry of `assets`. With a `source` it draws another asset's pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetRef {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub x: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub y: i64,
    #[serde(skip_serializing_if = "is_false")]
    pub flip_h: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub flip_v: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub uses_palette: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaletteRef {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "is_false")]
    pub master: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub breed: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub color_tag: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color2: String,
}

// visualizations

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visualization {
    #[serde(skip_serializing_if = "is_zero")]
    pub layer_count: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub angle: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub size: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, VisualizationLayer>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub directions: BTreeMap<String, VisualizationDirection>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub colors: BTreeMap<String, VisualizationColor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub animations: BTreeMap<String, Animation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postures: Option<Postures>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gestures: Vec<Posture>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizationLayer {
    #[serde(skip_serializing_if = "is_zero")]
    pub x: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub y: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub z: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub alpha: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ink: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(skip_serializing_if = "is_false")]
    pub ignore_mouse: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationDirection {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, VisualizationLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationColor {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, ColorLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorLayer {
    #[serde(skip_serializing_if = "is_zero")]
    pub color: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Animation {
    #[serde(skip_serializing_if = "is_zero")]
    pub transition_to: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub transition_from: i64,
    #[serde(skip_serializing_if = "is_false")]
    pub immediate_change_from: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub random_start: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, AnimationLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationLayer {
    pub loop_count: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub frame_repeat: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub random: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub frame_sequences: BTreeMap<String, FrameSequence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameSequence {
    #[serde(skip_serializing_if = "is_zero")]
    pub loop_count: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub random: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub frames: BTreeMap<String, AnimationFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationFrame {
    pub id: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub x: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub y: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub random_x: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub random_y: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub offsets: BTreeMap<String, FrameOffset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOffset {
    #[serde(skip_serializing_if = "is_zero")]
    pub direction: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub x: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub y: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Postures {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_posture: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postures: Vec<Posture>,
}

/// A posture or gesture: a named state bound to an animation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Posture {
    pub id: String,
    pub animation_id: i64,
}

// index and logic

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetIndex {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logic {
    pub model: LogicModel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicModel {
    pub dimensions: Dimensions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let model = AssetModel {
            name: "chair".into(),
            assets: BTreeMap::from([
                ("chair_64_a_0_0".to_string(), AssetRef::default()),
                (
                    "chair_64_a_2_0".to_string(),
                    AssetRef {
                        source: "chair_64_a_0_0".into(),
                        flip_h: true,
                        ..Default::default()
                    },
                ),
            ]),
            ..Default::default()
        };

        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(
            json,
            r#"{"name":"chair","assets":{"chair_64_a_0_0":{},"chair_64_a_2_0":{"source":"chair_64_a_0_0","flipH":true}}}"#
        );
    }

    #[test]
    fn test_frame_layout() {
        let frame = AtlasFrame::at(0, 30, 8, 20);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["frame"]["y"], 30);
        assert_eq!(json["spriteSourceSize"]["x"], 0);
        assert_eq!(json["sourceSize"]["h"], 20);
        assert_eq!(json["pivot"]["x"], 0.5);
        assert_eq!(json["rotated"], false);
    }

    #[test]
    fn test_model_reads_back() {
        let json = r#"{"name":"lamp","visualizationType":"furniture_animated",
            "spritesheet":{"meta":{"image":"lamp.png","format":"RGBA8888","size":{"w":4,"h":6},"scale":1},
            "frames":{"lamp_64_a_0_0":{"frame":{"x":0,"y":0,"w":4,"h":6}}}},
            "logic":{"model":{"dimensions":{"x":1,"y":1,"z":1.5},"directions":[0,90]}}}"#;
        let model: AssetModel = serde_json::from_str(json).unwrap();

        let sheet = model.spritesheet.unwrap();
        assert_eq!(sheet.meta.image, "lamp.png");
        assert_eq!(sheet.frames["lamp_64_a_0_0"].frame.h, 6);
        assert_eq!(model.logic.unwrap().model.directions, vec![0, 90]);
    }
}
