// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Static reference catalogs: building patterns, furniture designs, and
//! structure templates. Loaded once at startup and read-only afterwards;
//! lookups never touch the bridge.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Pattern,
    Furniture,
    Template,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Furniture => "furniture",
            Self::Template => "template",
        }
    }
}

/// One catalog entry: a named, categorized schematic in compact form.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    /// Compact schematic ready for the build engine; anchored at the player
    /// unless the caller overrides the anchor.
    pub schematic: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    NotFound {
        kind: &'static str,
        name: String,
        suggestions: Vec<String>,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound {
                kind,
                name,
                suggestions,
            } => {
                write!(f, "no {kind} named {name:?}")?;
                if !suggestions.is_empty() {
                    write!(f, " (close matches: {})", suggestions.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CatalogError {}

pub struct Catalog {
    patterns: BTreeMap<&'static str, CatalogEntry>,
    furniture: BTreeMap<&'static str, CatalogEntry>,
    templates: BTreeMap<&'static str, CatalogEntry>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            patterns: index(builtin_patterns()),
            furniture: index(builtin_furniture()),
            templates: index(builtin_templates()),
        }
    }

    pub fn lookup(&self, kind: CatalogKind, name: &str) -> Result<&CatalogEntry, CatalogError> {
        let table = self.table(kind);
        table.get(name).ok_or_else(|| CatalogError::NotFound {
            kind: kind.as_str(),
            name: name.to_owned(),
            suggestions: suggest(table, name),
        })
    }

    /// Entry names, optionally filtered by category.
    pub fn list(&self, kind: CatalogKind, category: Option<&str>) -> Vec<&CatalogEntry> {
        self.table(kind)
            .values()
            .filter(|entry| category.is_none_or(|category| entry.category == category))
            .collect()
    }

    pub fn categories(&self, kind: CatalogKind) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> =
            self.table(kind).values().map(|entry| entry.category).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    fn table(&self, kind: CatalogKind) -> &BTreeMap<&'static str, CatalogEntry> {
        match kind {
            CatalogKind::Pattern => &self.patterns,
            CatalogKind::Furniture => &self.furniture,
            CatalogKind::Template => &self.templates,
        }
    }
}

fn index(entries: Vec<CatalogEntry>) -> BTreeMap<&'static str, CatalogEntry> {
    entries.into_iter().map(|entry| (entry.name, entry)).collect()
}

fn suggest(table: &BTreeMap<&'static str, CatalogEntry>, query: &str) -> Vec<String> {
    let query = query.to_ascii_lowercase();
    table
        .keys()
        .filter(|name| {
            name.contains(query.as_str())
                || query.split('_').any(|part| !part.is_empty() && name.contains(part))
        })
        .take(5)
        .map(|name| (*name).to_owned())
        .collect()
}

fn builtin_patterns() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "timber_frame_wall",
            category: "walls",
            description: "Oak-framed wall panel with white plaster infill, 5 wide and 4 tall.",
            schematic: json!({
                "a": "player",
                "p": { "L": "oak_log", "P": "white_concrete" },
                "l": [["0-3", "L P*3 L"]],
            }),
        },
        CatalogEntry {
            name: "stone_cottage_wall",
            category: "walls",
            description: "Cobblestone wall band with a stone brick cap, 6 wide and 3 tall.",
            schematic: json!({
                "a": "player",
                "p": { "C": "cobblestone", "B": "stone_bricks" },
                "l": [["0-1", "C*6"], [2, "B*6"]],
            }),
        },
        CatalogEntry {
            name: "castle_battlement",
            category: "fortification",
            description: "Merlon-and-crenel parapet strip, 7 wide.",
            schematic: json!({
                "a": "player",
                "p": { "S": "stone_bricks" },
                "l": [[0, "S*7"], [1, "S . S . S . S"]],
            }),
        },
        CatalogEntry {
            name: "garden_path",
            category: "landscape",
            description: "Gravel path with polished andesite edging, 3 wide and 6 long.",
            schematic: json!({
                "a": "player",
                "p": { "G": "gravel", "A": "polished_andesite" },
                "l": [[0, "A G A~6"]],
            }),
        },
    ]
}

fn builtin_furniture() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "simple_bed_nook",
            category: "bedroom",
            description: "Bed with bedside barrel and lantern.",
            schematic: json!({
                "a": "player",
                "p": {
                    "B": "red_bed[facing=north,part=foot]",
                    "H": "red_bed[facing=north,part=head]",
                    "N": "barrel[facing=up]",
                    "L": "lantern",
                },
                "l": [[0, "B N|H ."], [1, ". L|. ."]],
            }),
        },
        CatalogEntry {
            name: "dining_table",
            category: "kitchen",
            description: "Four-seat oak dining table built from fences and pressure plates.",
            schematic: json!({
                "a": "player",
                "p": { "F": "oak_fence", "T": "oak_pressure_plate", "S": "oak_stairs[facing=east]" },
                "l": [[0, "S F F S"], [1, ". T T ."]],
            }),
        },
        CatalogEntry {
            name: "bookshelf_wall",
            category: "study",
            description: "Floor-to-ceiling bookshelf run, 4 wide and 3 tall.",
            schematic: json!({
                "a": "player",
                "p": { "B": "bookshelf" },
                "l": [["0-2", "B*4"]],
            }),
        },
        CatalogEntry {
            name: "kitchen_counter",
            category: "kitchen",
            description: "Smoker, crafting surface, and sink under a smooth stone top.",
            schematic: json!({
                "a": "player",
                "p": {
                    "S": "smoker[facing=north]",
                    "C": "crafting_table",
                    "W": "water_cauldron[level=3]",
                    "T": "smooth_stone_slab[type=top]",
                },
                "l": [[0, "S C W"], [1, "T T T"]],
            }),
        },
    ]
}

fn builtin_templates() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "starter_house",
            category: "residential",
            description: "One-room spruce starter house, 7x5 footprint with oak floor.",
            schematic: json!({
                "a": "player",
                "p": { "W": "spruce_planks", "F": "oak_planks" },
                "s": "room:7x4x5:W:F",
            }),
        },
        CatalogEntry {
            name: "watchtower",
            category: "fortification",
            description: "Narrow stone brick tower shell, 5x5 footprint and 9 tall.",
            schematic: json!({
                "a": "player",
                "p": { "S": "stone_bricks" },
                "s": "box:5x9x5:S",
            }),
        },
        CatalogEntry {
            name: "small_farm",
            category: "agriculture",
            description: "Fenced 7x5 farm plot with a central water channel.",
            schematic: json!({
                "a": "player",
                "p": { "D": "farmland", "W": "water", "F": "oak_fence" },
                "l": [[0, "F*7|F D*2 W D*2 F~3|F*7"]],
            }),
        },
    ]
}
