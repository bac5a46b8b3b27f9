//! Point sets and universe packing.
//!
//! A point set is the ordered list of 2D sample coordinates produced by
//! the shape editor, loaded from its JSON export. Packing flattens the
//! points in object order and partitions them into universes of at most
//! 510 channels (170 RGB points at 8 bits, 85 at 16), honoring each
//! object's explicit universe assignment when present.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channels usable for RGB data in one universe.
pub const USABLE_CHANNELS: usize = 510;

/// One sample coordinate in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Editor-assigned point id.
    pub id: u32,
    /// Horizontal coordinate, `0 <= x < canvas width`.
    pub x: f32,
    /// Vertical coordinate, `0 <= y < canvas height`.
    pub y: f32,
}

#[derive(Debug, Deserialize)]
struct CanvasFile {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ObjectFile {
    #[allow(dead_code)]
    id: u32,
    points: Vec<Point>,
    #[serde(default)]
    universe: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PointSetFile {
    canvas: CanvasFile,
    objects: Vec<ObjectFile>,
}

/// Errors from loading a point-set file.
#[derive(Debug, Error)]
pub enum PointSetError {
    /// The file could not be read.
    #[error("failed to read point set '{path}': {source}")]
    Read {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid point-set JSON.
    #[error("failed to parse point set: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An object's points with its optional universe pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    /// Explicit base universe, or `None` for automatic assignment.
    pub universe: Option<u16>,
    /// Points in editor order.
    pub points: Vec<Point>,
}

/// The ordered sample coordinates with canvas dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    canvas_width: u32,
    canvas_height: u32,
    groups: Vec<PointGroup>,
}

impl PointSet {
    /// Build a point set, dropping points outside the canvas.
    pub fn new(canvas_width: u32, canvas_height: u32, groups: Vec<PointGroup>) -> Self {
        let groups = groups
            .into_iter()
            .map(|mut g| {
                let before = g.points.len();
                g.points.retain(|p| {
                    p.x >= 0.0
                        && p.x < canvas_width as f32
                        && p.y >= 0.0
                        && p.y < canvas_height as f32
                });
                if g.points.len() != before {
                    tracing::debug!(
                        dropped = before - g.points.len(),
                        "dropped out-of-canvas points"
                    );
                }
                g
            })
            .collect();
        Self {
            canvas_width,
            canvas_height,
            groups,
        }
    }

    /// Load from the editor's JSON export.
    pub fn load(path: &Path) -> Result<Self, PointSetError> {
        let text = fs::read_to_string(path).map_err(|source| PointSetError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, PointSetError> {
        let file: PointSetFile = serde_json::from_str(text)?;
        let groups = file
            .objects
            .into_iter()
            .map(|o| PointGroup {
                universe: o.universe,
                points: o.points,
            })
            .collect();
        Ok(Self::new(file.canvas.width, file.canvas.height, groups))
    }

    /// Canvas dimensions the coordinates are expressed in.
    pub fn canvas(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// All points flattened in object order.
    pub fn flat_points(&self) -> Vec<Point> {
        self.groups.iter().flat_map(|g| g.points.clone()).collect()
    }

    /// Total point count.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }

    /// Whether the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Partition into universes for a given point width in bytes.
    ///
    /// Auto-assigned objects continue after the previous object's
    /// universes; pinned objects jump to their universe. Every slice
    /// carries at most [`USABLE_CHANNELS`] bytes.
    pub fn plan(&self, bytes_per_point: usize) -> UniversePlan {
        let cap = (USABLE_CHANNELS / bytes_per_point).max(1);
        let mut slices = Vec::new();
        let mut next_universe: u16 = 0;
        let mut flat_index = 0usize;

        for group in &self.groups {
            let mut universe = group.universe.unwrap_or(next_universe);
            for chunk_start in (0..group.points.len()).step_by(cap) {
                let count = cap.min(group.points.len() - chunk_start);
                slices.push(UniverseSlice {
                    universe,
                    start: flat_index + chunk_start,
                    count,
                });
                universe += 1;
            }
            flat_index += group.points.len();
            next_universe = next_universe.max(universe);
        }

        UniversePlan {
            slices,
            bytes_per_point,
        }
    }
}

/// One universe's share of the flat point array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniverseSlice {
    /// Target universe address.
    pub universe: u16,
    /// First point index in the flat array.
    pub start: usize,
    /// Number of points.
    pub count: usize,
}

/// The full universe partition for one bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversePlan {
    /// Slices in transmission order.
    pub slices: Vec<UniverseSlice>,
    /// Bytes per point the plan was computed for.
    pub bytes_per_point: usize,
}

impl UniversePlan {
    /// Byte range of a slice within the flat channel array.
    pub fn byte_range(&self, slice: &UniverseSlice) -> std::ops::Range<usize> {
        let start = slice.start * self.bytes_per_point;
        start..start + slice.count * self.bytes_per_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: u32) -> Vec<Point> {
        (0..n)
            .map(|i| Point {
                id: i,
                x: i as f32,
                y: 0.0,
            })
            .collect()
    }

    #[test]
    fn json_load_drops_out_of_canvas() {
        let json = r#"{
            "canvas": {"width": 10, "height": 10},
            "objects": [{
                "id": 1,
                "points": [
                    {"id": 1, "x": 0.0, "y": 0.0},
                    {"id": 2, "x": 9.5, "y": 9.5},
                    {"id": 3, "x": 10.0, "y": 0.0},
                    {"id": 4, "x": -1.0, "y": 5.0}
                ]
            }]
        }"#;
        let set = PointSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.canvas(), (10, 10));
    }

    #[test]
    fn plan_8bit_caps_at_170_points() {
        let set = PointSet::new(
            1000,
            10,
            vec![PointGroup {
                universe: None,
                points: grid(171),
            }],
        );
        let plan = set.plan(3);
        assert_eq!(plan.slices.len(), 2);
        assert_eq!(plan.slices[0].count, 170);
        assert_eq!(plan.slices[0].universe, 0);
        assert_eq!(plan.slices[1].count, 1);
        assert_eq!(plan.slices[1].universe, 1);
        for slice in &plan.slices {
            assert!(slice.count * 3 <= USABLE_CHANNELS);
        }
    }

    #[test]
    fn plan_16bit_caps_at_85_points() {
        let set = PointSet::new(
            1000,
            10,
            vec![PointGroup {
                universe: None,
                points: grid(86),
            }],
        );
        let plan = set.plan(6);
        assert_eq!(plan.slices.len(), 2);
        assert_eq!(plan.slices[0].count, 85);
    }

    #[test]
    fn explicit_universe_is_honored() {
        let set = PointSet::new(
            1000,
            10,
            vec![
                PointGroup {
                    universe: None,
                    points: grid(2),
                },
                PointGroup {
                    universe: Some(5),
                    points: grid(2),
                },
            ],
        );
        let plan = set.plan(3);
        assert_eq!(plan.slices[0].universe, 0);
        assert_eq!(plan.slices[1].universe, 5);
    }

    #[test]
    fn byte_ranges_tile_the_flat_array() {
        let set = PointSet::new(
            1000,
            10,
            vec![PointGroup {
                universe: None,
                points: grid(200),
            }],
        );
        let plan = set.plan(3);
        let mut covered = 0;
        for slice in &plan.slices {
            let range = plan.byte_range(slice);
            assert_eq!(range.start, covered);
            covered = range.end;
        }
        assert_eq!(covered, 200 * 3);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        std::fs::write(
            &path,
            r#"{"canvas": {"width": 4, "height": 4},
                "objects": [{"id": 1, "points": [{"id": 1, "x": 1.0, "y": 1.0}], "universe": 2}]}"#,
        )
        .unwrap();
        let set = PointSet::load(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.plan(3).slices[0].universe, 2);
    }
}
