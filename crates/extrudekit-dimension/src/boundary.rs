//! Boundary index
//!
//! Per-layer island outlines read from `(<boundaryPoint>` annotations, used
//! to tell whether a travel move leaves the island it started in.

use crate::gcode::{Keyword, ParsedLine};
use glam::DVec2;

/// One closed island outline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryLoop {
    pub points: Vec<DVec2>,
}

impl BoundaryLoop {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    /// Signed area by the shoelace formula, positive when counter-clockwise
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Even-odd ray casting test
    pub fn contains(&self, point: DVec2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Islands of one layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryLayer {
    /// Layer height from the `(<layer>` annotation
    pub z: f64,
    /// Loops, smallest area first once the index is built
    pub loops: Vec<BoundaryLoop>,
}

/// Island outlines of every layer, in layer order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryIndex {
    layers: Vec<BoundaryLayer>,
}

impl BoundaryIndex {
    /// Collect outlines from the lines after the initialization block
    ///
    /// Points seen before the first layer have no layer to belong to and are
    /// dropped.
    pub fn build(lines: &[ParsedLine]) -> Self {
        let mut layers: Vec<BoundaryLayer> = Vec::new();
        let mut loop_open = false;

        for line in lines {
            match line.keyword {
                Keyword::Layer => {
                    let z = line.argument(0).unwrap_or(0.0);
                    layers.push(BoundaryLayer {
                        z,
                        loops: Vec::new(),
                    });
                    loop_open = false;
                }
                Keyword::BoundaryPoint => {
                    let Some(layer) = layers.last_mut() else {
                        continue;
                    };
                    let point = DVec2::new(
                        line.param('X').unwrap_or(0.0),
                        line.param('Y').unwrap_or(0.0),
                    );
                    if !loop_open {
                        layer.loops.push(BoundaryLoop::default());
                        loop_open = true;
                    }
                    if let Some(current) = layer.loops.last_mut() {
                        current.points.push(point);
                    }
                }
                Keyword::BoundaryPerimeterEnd => loop_open = false,
                _ => {}
            }
        }

        for layer in &mut layers {
            layer
                .loops
                .sort_by(|a, b| a.area().total_cmp(&b.area()));
        }

        let loops: usize = layers.iter().map(|l| l.loops.len()).sum();
        tracing::debug!(
            "Boundary index built: {} layers, {} loops",
            layers.len(),
            loops
        );

        Self { layers }
    }

    pub fn layers(&self) -> &[BoundaryLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&BoundaryLayer> {
        self.layers.get(index)
    }

    /// Index of the smallest loop of a layer that contains `point`
    ///
    /// `None` when no loop contains it or the layer is unknown.
    pub fn smallest_enclosing_loop(&self, layer_index: Option<usize>, point: DVec2) -> Option<usize> {
        let layer = self.layers.get(layer_index?)?;
        layer.loops.iter().position(|l| l.contains(point))
    }
}
