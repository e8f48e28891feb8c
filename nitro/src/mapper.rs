//! Legacy XML to Nitro model translation.
//!
//! Also decides which bitmaps end up in the atlas. Furniture SWFs export the
//! same bitmap under several symbol names; only one (canonical) name is packed
//! and every other name becomes an asset that points at it.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::document::SwfDocument;
use crate::model::{
    Animation, AnimationFrame, AnimationLayer, AssetIndex, AssetModel, AssetRef, ColorLayer,
    Dimensions, FrameOffset, FrameSequence, Logic, LogicModel, PaletteRef, Posture, Postures,
    Visualization, VisualizationColor, VisualizationDirection, VisualizationLayer,
};
use crate::xml::{
    AnimationXml, AssetsXml, IndexXml, LayerXml, LogicXml, ManifestXml, PostureXml,
    VisualizationDataXml, VisualizationXml,
};

/// Logic directions used when the document lists none.
pub const DEFAULT_DIRECTIONS: [i64; 2] = [0, 90];

const SKIPPED_VISUALIZATION_SIZE: i64 = 32;

/// The legacy documents found in one SWF.
#[derive(Debug, Clone, Default)]
pub struct LegacyDocuments {
    pub assets: Option<AssetsXml>,
    pub visualization: Option<VisualizationDataXml>,
    pub logic: Option<LogicXml>,
    pub index: Option<IndexXml>,
    pub manifest: Option<ManifestXml>,
}

impl LegacyDocuments {
    pub fn load(doc: &SwfDocument) -> Self {
        Self {
            assets: doc.load_document(),
            visualization: doc.load_document(),
            logic: doc.load_document(),
            index: doc.load_document(),
            manifest: doc.load_document(),
        }
    }
}

/// Drop one `<base_name>_` prefix, the document class SWF exporters prepend
/// to every symbol.
pub fn strip_base<'a>(name: &'a str, base_name: &str) -> &'a str {
    if base_name.is_empty() {
        return name;
    }
    name.strip_prefix(base_name)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(name)
}

/// Shadows and 32px assets are never converted.
pub fn is_skipped_asset(name: &str) -> bool {
    name.starts_with("sh_") || name.contains("_32_")
}

/// Alias name to canonical name, both stripped of the base prefix.
///
/// The canonical name of a character is the first name it was exported
/// under that is not a shadow or 32px variant. Only when every name is such
/// a variant does the first exported name win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
    sprites: HashMap<u16, String>,
}

impl AliasTable {
    pub fn build(doc: &SwfDocument, base_name: &str) -> Self {
        let mut sprites: HashMap<u16, String> = HashMap::new();
        for symbol in doc.symbols() {
            if !doc.has_image(symbol.id) {
                continue;
            }
            let name = strip_base(&symbol.name, base_name);
            match sprites.get(&symbol.id) {
                Some(current) if !is_skipped_asset(current) || is_skipped_asset(name) => {}
                _ => {
                    sprites.insert(symbol.id, name.to_string());
                }
            }
        }

        let mut aliases = HashMap::new();
        for symbol in doc.symbols() {
            let Some(canonical) = sprites.get(&symbol.id) else {
                continue;
            };
            let alias = strip_base(&symbol.name, base_name);
            if alias != canonical {
                aliases.insert(alias.to_string(), canonical.clone());
            }
        }
        Self { aliases, sprites }
    }

    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// The canonical name for `name`, or `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.canonical(name).unwrap_or(name)
    }

    /// Name the bitmap of character `id` is packed under.
    pub fn sprite_name(&self, id: u16) -> Option<&str> {
        self.sprites.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Names of the sprites the asset list draws, resolved to canonical names.
pub fn needed_sprites(assets: Option<&AssetsXml>, aliases: &AliasTable) -> HashSet<String> {
    let Some(assets) = assets else {
        return HashSet::new();
    };
    assets
        .assets
        .iter()
        .filter(|asset| !is_skipped_asset(&asset.name))
        .map(|asset| {
            let name = if asset.source.is_empty() {
                &asset.name
            } else {
                &asset.source
            };
            aliases.resolve(name)
        })
        .filter(|name| !is_skipped_asset(name))
        .map(str::to_string)
        .collect()
}

/// Build everything in the model except the spritesheet.
pub fn map_asset_model(
    docs: &LegacyDocuments,
    base_name: &str,
    default_depth: f64,
    aliases: &AliasTable,
) -> AssetModel {
    let mut model = AssetModel {
        name: base_name.to_string(),
        ..Default::default()
    };

    if let Some(index) = &docs.index {
        model.kind = index.kind.clone();
        model.visualization_type = index.visualization.clone();
        model.logic_type = index.logic.clone();
        model.index = Some(AssetIndex {
            name: base_name.to_string(),
        });
    }

    if let Some(assets) = &docs.assets {
        map_assets(assets, aliases, &mut model);
    }

    if let Some(vis) = &docs.visualization {
        model.visualizations = map_visualizations(vis);
    }

    if let Some(logic) = &docs.logic {
        model.logic = Some(map_logic(logic, default_depth));
    }

    model
}

fn map_assets(xml: &AssetsXml, aliases: &AliasTable, model: &mut AssetModel) {
    for asset in &xml.assets {
        if is_skipped_asset(&asset.name) {
            continue;
        }

        let mut source = aliases.resolve(&asset.source).to_string();
        if let Some(canonical) = aliases.canonical(&asset.name) {
            source = canonical.to_string();
        }
        if source == asset.name {
            source.clear();
        }

        model.assets.insert(
            asset.name.clone(),
            AssetRef {
                source,
                x: asset.x.0,
                y: asset.y.0,
                flip_h: asset.flip_h.0,
                flip_v: asset.flip_v.0,
                uses_palette: asset.uses_palette.0,
            },
        );
    }

    for palette in &xml.palettes {
        let tags = if palette.tags.is_empty() {
            Vec::new()
        } else {
            palette.tags.split(',').map(str::to_string).collect()
        };
        model.palettes.insert(
            palette.id.0.to_string(),
            PaletteRef {
                id: palette.id.0,
                source: palette.source.clone(),
                master: palette.master.0,
                tags,
                breed: palette.breed.0,
                color_tag: palette.color_tag.0,
                color1: palette.color1.clone(),
                color2: palette.color2.clone(),
            },
        );
    }
}

pub fn map_visualizations(xml: &VisualizationDataXml) -> Vec<Visualization> {
    xml.graphics
        .visualizations
        .iter()
        .filter(|v| v.size.0 != SKIPPED_VISUALIZATION_SIZE)
        .map(map_visualization)
        .collect()
}

fn map_visualization(v: &VisualizationXml) -> Visualization {
    let directions = v
        .directions
        .directions
        .iter()
        .map(|d| {
            (
                d.id.0.to_string(),
                VisualizationDirection {
                    layers: map_layers(&d.layers),
                },
            )
        })
        .collect();

    let colors = v
        .colors
        .colors
        .iter()
        .map(|c| {
            let layers = c
                .layers
                .iter()
                .map(|l| {
                    (
                        l.id.0.to_string(),
                        ColorLayer {
                            color: parse_color(&l.color),
                        },
                    )
                })
                .collect();
            (c.id.0.to_string(), VisualizationColor { layers })
        })
        .collect();

    let animations = v
        .animations
        .animations
        .iter()
        .map(|a| (a.id.0.to_string(), map_animation(a)))
        .collect();

    let postures = v.postures.as_ref().map(|p| Postures {
        default_posture: if p.default_posture.is_empty() {
            v.default_posture.clone()
        } else {
            p.default_posture.clone()
        },
        postures: p.postures.iter().map(map_posture).collect(),
    });

    Visualization {
        layer_count: v.layer_count.0,
        angle: v.angle.0,
        size: v.size.0,
        layers: map_layers(&v.layers.layers),
        directions,
        colors,
        animations,
        postures,
        gestures: v.gestures.gestures.iter().map(map_posture).collect(),
    }
}

fn map_layers(layers: &[LayerXml]) -> BTreeMap<String, VisualizationLayer> {
    layers
        .iter()
        .map(|l| {
            (
                l.id.0.to_string(),
                VisualizationLayer {
                    x: l.x.0,
                    y: l.y.0,
                    z: l.z.0,
                    alpha: l.alpha.0,
                    ink: l.ink.clone(),
                    tag: l.tag.clone(),
                    ignore_mouse: l.ignore_mouse.0,
                },
            )
        })
        .collect()
}

fn map_animation(a: &AnimationXml) -> Animation {
    let layers = a
        .layers
        .iter()
        .map(|layer| {
            let frame_sequences = layer
                .frame_sequences
                .iter()
                .enumerate()
                .map(|(i, seq)| {
                    let frames = seq
                        .frames
                        .iter()
                        .enumerate()
                        .map(|(j, f)| {
                            let offsets = f
                                .offsets
                                .offsets
                                .iter()
                                .enumerate()
                                .map(|(k, o)| {
                                    (
                                        k.to_string(),
                                        FrameOffset {
                                            direction: o.direction.0,
                                            x: o.x.0,
                                            y: o.y.0,
                                        },
                                    )
                                })
                                .collect();
                            let frame = AnimationFrame {
                                id: parse_frame_id(&f.id),
                                x: f.x.0,
                                y: f.y.0,
                                random_x: f.random_x.0,
                                random_y: f.random_y.0,
                                offsets,
                            };
                            (j.to_string(), frame)
                        })
                        .collect();
                    let sequence = FrameSequence {
                        loop_count: seq.loop_count.0,
                        random: seq.random.0,
                        frames,
                    };
                    (i.to_string(), sequence)
                })
                .collect();

            let mapped = AnimationLayer {
                loop_count: layer.loop_count.0,
                frame_repeat: layer.frame_repeat.0,
                random: layer.random.0,
                frame_sequences,
            };
            (layer.id.0.to_string(), mapped)
        })
        .collect();

    Animation {
        transition_to: a.transition_to.0,
        transition_from: a.transition_from.0,
        immediate_change_from: a.immediate_change_from.0,
        random_start: a.random_start.0,
        layers,
    }
}

fn map_posture(p: &PostureXml) -> Posture {
    Posture {
        id: p.id.clone(),
        animation_id: p.animation_id.0,
    }
}

fn map_logic(xml: &LogicXml, default_depth: f64) -> Logic {
    let dims = &xml.model.dimensions;
    let z = if dims.z.0 == 0.0 { default_depth } else { dims.z.0 };

    let mut directions: Vec<i64> = xml.model.directions.directions.iter().map(|d| d.id.0).collect();
    if directions.is_empty() {
        directions = DEFAULT_DIRECTIONS.to_vec();
    }

    Logic {
        model: LogicModel {
            dimensions: Dimensions {
                x: dims.x.0,
                y: dims.y.0,
                z,
            },
            directions,
        },
    }
}

/// `#RRGGBB` or bare hex to an integer. Anything unparsable is 0.
pub fn parse_color(color: &str) -> i64 {
    let hex: String = color.chars().filter(|&c| c != '#').collect();
    i64::from_str_radix(hex.trim(), 16).unwrap_or(0)
}

/// Frame ids are numeric, but exporters leave some blank or write `NaN`.
pub fn parse_frame_id(id: &str) -> i64 {
    id.trim().parse().unwrap_or(0)
}
