// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas navigation and geometry.
//!
//! World space is the space node positions live in. A canvas-local point
//! `p` shows world point `(p - pan) / scale`; screen points additionally
//! subtract the canvas origin.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::node::{Node, NodeTypeDescriptor, NODE_HEADER_HEIGHT, ROW_HEIGHT};
use crate::port::{PinDirection, PinFlow, PinRef};
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom level
pub const MIN_ZOOM: f32 = 0.2;
/// Largest zoom level
pub const MAX_ZOOM: f32 = 2.0;
/// Zoom change per wheel notch, as an exponent
const ZOOM_INTENSITY: f32 = 0.1;
/// World margin around the nodes shown in the minimap
pub const MINIMAP_PADDING: f32 = 200.0;
/// Horizontal pull of curved wire control points
const WIRE_CURVATURE: f32 = 0.6;

/// Pan and zoom of one canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Canvas-local position of the world origin
    pub pan: Vec2,
    /// Zoom level
    pub scale: f32,
}

impl Viewport {
    /// Unzoomed view of the world origin
    pub fn new() -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: 1.0,
        }
    }

    /// Build a viewport from stored values, repairing a bad scale
    pub fn from_parts(pan_x: f32, pan_y: f32, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self {
            pan: Vec2::new(finite_or_zero(pan_x), finite_or_zero(pan_y)),
            scale: clamp_scale(scale),
        }
    }

    /// Convert a screen position to world space
    pub fn screen_to_world(&self, screen: Pos2, origin: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x - origin.x - self.pan.x) / self.scale,
            (screen.y - origin.y - self.pan.y) / self.scale,
        )
    }

    /// Convert a world position to screen space
    pub fn world_to_screen(&self, world: Pos2, origin: Pos2) -> Pos2 {
        Pos2::new(
            world.x * self.scale + self.pan.x + origin.x,
            world.y * self.scale + self.pan.y + origin.y,
        )
    }

    /// Zoom one wheel notch around a canvas-local cursor position.
    ///
    /// A negative `wheel_delta_y` zooms in. The world point under the cursor
    /// stays under the cursor. Returns false for a zero delta or when the
    /// zoom was already at its limit.
    pub fn zoom_at(&mut self, cursor: Pos2, wheel_delta_y: f32) -> bool {
        if wheel_delta_y == 0.0 || wheel_delta_y.is_nan() {
            return false;
        }
        let direction = if wheel_delta_y < 0.0 { 1.0 } else { -1.0 };
        let new_scale = clamp_scale(self.scale * (direction * ZOOM_INTENSITY).exp());
        if new_scale == self.scale {
            return false;
        }
        let ratio = new_scale / self.scale;
        let cursor = cursor.to_vec2();
        *self = Self {
            pan: cursor - (cursor - self.pan) * ratio,
            scale: new_scale,
        };
        true
    }

    /// Move the view by a canvas-local delta
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// World rectangle visible in a canvas of the given size
    pub fn visible_world_rect(&self, canvas_size: Vec2) -> Rect {
        Rect::from_min_size((-self.pan / self.scale).to_pos2(), canvas_size / self.scale)
    }

    /// Pan so that a world point lands at the canvas center
    pub fn center_on(&mut self, world: Pos2, canvas_size: Vec2) {
        self.pan = canvas_size / 2.0 - world.to_vec2() * self.scale;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a zoom level to the supported range
pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_ZOOM, MAX_ZOOM)
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Snap position to grid
pub fn snap_to_grid(pos: [f32; 2], size: f32) -> [f32; 2] {
    if size <= 0.0 {
        return pos;
    }
    [(pos[0] / size).round() * size, (pos[1] / size).round() * size]
}

/// Layout of the minimap for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapProjection {
    /// Padded world bounds shown by the minimap
    pub bounds: Rect,
    /// Minimap pixels per world unit
    pub scale: f32,
    /// Node rectangles in minimap space
    pub nodes: Vec<Rect>,
    /// Visible canvas area in minimap space
    pub viewport: Rect,
}

impl MinimapProjection {
    /// Fit the given world rectangles into a minimap.
    ///
    /// Returns `None` when there is nothing to show.
    pub fn compute(node_rects: &[Rect], minimap_size: Vec2, viewport: &Viewport, canvas_size: Vec2) -> Option<Self> {
        let first = node_rects.first()?;
        let bounds = node_rects
            .iter()
            .fold(*first, |acc, r| acc.union(*r))
            .expand(MINIMAP_PADDING);
        let scale = (minimap_size.x / bounds.width()).min(minimap_size.y / bounds.height());

        let project = |r: Rect| {
            Rect::from_min_size(
                ((r.min - bounds.min) * scale).to_pos2(),
                r.size() * scale,
            )
        };
        Some(Self {
            bounds,
            scale,
            nodes: node_rects.iter().copied().map(project).collect(),
            viewport: project(viewport.visible_world_rect(canvas_size)),
        })
    }

    /// World point under a minimap-local position
    pub fn to_world(&self, point: Pos2) -> Pos2 {
        self.bounds.min + point.to_vec2() / self.scale
    }
}

/// How wires are drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStyle {
    /// Horizontal-tangent cubic curve
    #[default]
    Curved,
    /// Straight segment
    Straight,
}

/// Geometry of one wire in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WirePath {
    /// Straight segment
    Line {
        /// Start point
        from: Pos2,
        /// End point
        to: Pos2,
    },
    /// Cubic curve given by its four control points
    Cubic([Pos2; 4]),
}

impl WirePath {
    /// Path from an output anchor to an input anchor
    pub fn between(from: Pos2, to: Pos2, style: WireStyle) -> Self {
        match style {
            WireStyle::Straight => Self::Line { from, to },
            WireStyle::Curved => {
                let dx = (from.x - to.x).abs() * WIRE_CURVATURE;
                Self::Cubic([from, Pos2::new(from.x + dx, from.y), Pos2::new(to.x - dx, to.y), to])
            }
        }
    }

    /// Polyline approximation
    pub fn points(&self, segments: usize) -> Vec<Pos2> {
        match *self {
            Self::Line { from, to } => vec![from, to],
            Self::Cubic([p0, p1, p2, p3]) => bezier_points(p0, p1, p2, p3, segments.max(1)),
        }
    }
}

/// Sample points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        points.push(Pos2::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        ));
    }
    points
}

/// World position of a pin's connection point.
///
/// Inputs sit on the left edge and outputs on the right, one row each,
/// execution pins first.
pub fn pin_anchor(node: &Node, descriptor: &NodeTypeDescriptor, pin: &PinRef) -> Option<Pos2> {
    let rect = node.rect(descriptor);
    let rows = descriptor
        .pins(PinFlow::Exec, pin.direction)
        .iter()
        .chain(descriptor.pins(PinFlow::Data, pin.direction))
        .filter(|p| p.has_pin);
    let (row, _) = rows
        .enumerate()
        .find(|(_, p)| p.flow == pin.flow && p.name == pin.name)?;
    let x = match pin.direction {
        PinDirection::Input => rect.left(),
        PinDirection::Output => rect.right(),
    };
    Some(Pos2::new(x, rect.top() + NODE_HEADER_HEIGHT + (row as f32 + 0.5) * ROW_HEIGHT))
}

impl Graph {
    /// World rectangles of every node
    pub fn node_rects(&self) -> Vec<Rect> {
        self.nodes()
            .filter_map(|n| Some(n.rect(self.descriptor(&n.id)?)))
            .collect()
    }

    /// Geometry of every wire
    pub fn wire_paths(&self, style: WireStyle) -> Vec<(ConnectionId, WirePath)> {
        self.connections()
            .filter_map(|c| {
                let anchor = |pin: PinRef| {
                    let node = self.node(&pin.node)?;
                    pin_anchor(node, self.descriptor(&pin.node)?, &pin)
                };
                Some((c.id, WirePath::between(anchor(c.source())?, anchor(c.target())?, style)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, create_macro_registry};
    use std::sync::Arc;

    fn approx(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_round_trip_transform() {
        let viewport = Viewport {
            pan: Vec2::new(120.0, -40.0),
            scale: 1.5,
        };
        let origin = Pos2::new(10.0, 30.0);
        let world = Pos2::new(33.0, 77.0);
        let screen = viewport.world_to_screen(world, origin);
        assert!(approx(viewport.screen_to_world(screen, origin), world));
    }

    #[test]
    fn test_zoom_keeps_cursor_point_fixed() {
        let mut viewport = Viewport {
            pan: Vec2::new(50.0, 25.0),
            scale: 0.8,
        };
        let cursor = Pos2::new(400.0, 300.0);
        let before = viewport.screen_to_world(cursor, Pos2::ZERO);

        assert!(viewport.zoom_at(cursor, -120.0));
        assert!(viewport.scale > 0.8);
        assert!(approx(viewport.screen_to_world(cursor, Pos2::ZERO), before));

        assert!(viewport.zoom_at(cursor, 120.0));
        assert!(approx(viewport.screen_to_world(cursor, Pos2::ZERO), before));
    }

    #[test]
    fn test_zero_wheel_delta_keeps_view() {
        let mut viewport = Viewport {
            pan: Vec2::new(12.0, -4.0),
            scale: 1.3,
        };
        let before = viewport;
        assert!(!viewport.zoom_at(Pos2::new(200.0, 150.0), 0.0));
        assert_eq!(viewport, before);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport {
            pan: Vec2::ZERO,
            scale: MAX_ZOOM,
        };
        assert!(!viewport.zoom_at(Pos2::new(10.0, 10.0), -1.0));
        assert_eq!(viewport.scale, MAX_ZOOM);

        for _ in 0..100 {
            viewport.zoom_at(Pos2::ZERO, 1.0);
        }
        assert_eq!(viewport.scale, MIN_ZOOM);
    }

    #[test]
    fn test_from_parts_repairs_scale() {
        assert_eq!(Viewport::from_parts(0.0, 0.0, 0.0).scale, 1.0);
        assert_eq!(Viewport::from_parts(0.0, 0.0, 9.0).scale, MAX_ZOOM);
    }

    #[test]
    fn test_minimap_projection() {
        let rects = [
            Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(200.0, 100.0)),
            Rect::from_min_size(Pos2::new(400.0, 300.0), Vec2::new(200.0, 100.0)),
        ];
        let viewport = Viewport::new();
        let minimap = MinimapProjection::compute(&rects, Vec2::new(200.0, 150.0), &viewport, Vec2::new(800.0, 600.0))
            .unwrap();

        assert_eq!(minimap.bounds.min, Pos2::new(-200.0, -200.0));
        assert_eq!(minimap.bounds.max, Pos2::new(800.0, 600.0));
        assert_eq!(minimap.scale, 0.1875);
        assert!(approx(minimap.viewport.min, Pos2::new(37.5, 37.5)));
        assert!(approx(minimap.viewport.max, Pos2::new(187.5, 150.0)));
        assert!(approx(minimap.to_world(Pos2::new(37.5, 37.5)), Pos2::ZERO));
    }

    #[test]
    fn test_minimap_hidden_without_nodes() {
        assert!(MinimapProjection::compute(&[], Vec2::splat(100.0), &Viewport::new(), Vec2::splat(100.0)).is_none());
    }

    #[test]
    fn test_center_on() {
        let mut viewport = Viewport {
            pan: Vec2::ZERO,
            scale: 2.0,
        };
        let canvas = Vec2::new(800.0, 600.0);
        viewport.center_on(Pos2::new(100.0, 50.0), canvas);
        assert!(approx(viewport.visible_world_rect(canvas).center(), Pos2::new(100.0, 50.0)));
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid([29.0, 31.0], 20.0), [20.0, 40.0]);
    }

    #[test]
    fn test_wire_geometry() {
        let curved = WirePath::between(Pos2::new(0.0, 0.0), Pos2::new(100.0, 50.0), WireStyle::Curved);
        assert_eq!(
            curved,
            WirePath::Cubic([
                Pos2::new(0.0, 0.0),
                Pos2::new(60.0, 0.0),
                Pos2::new(40.0, 50.0),
                Pos2::new(100.0, 50.0)
            ])
        );
        let points = curved.points(8);
        assert_eq!(points.len(), 9);
        assert_eq!(points[8], Pos2::new(100.0, 50.0));
    }

    #[test]
    fn test_wire_paths_use_pin_anchors() {
        let mut g = Graph::new(Arc::new(create_macro_registry()));
        let a = g.add_node(catalog::DELAY, [0.0, 0.0]).unwrap();
        let b = g.add_node(catalog::DELAY, [300.0, 0.0]).unwrap();
        g.create_connection(&PinRef::exec_out(a, "exec"), &PinRef::exec_in(b, "exec"))
            .unwrap();
        let paths = g.wire_paths(WireStyle::Straight);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].1,
            WirePath::Line {
                from: Pos2::new(180.0, 35.0),
                to: Pos2::new(300.0, 35.0)
            }
        );
    }
}
