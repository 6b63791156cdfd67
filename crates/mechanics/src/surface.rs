//! Surface models - road friction under each contact patch
//!
//! Provides:
//! - Road types with base friction and slip-threshold behaviour
//! - A uniform surface, a lookup grid and a spline track band
//!
//! Every model falls back to `SurfaceSample::DRY_ASPHALT` outside its data.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use simcore::{SimError, SimResult, SurfaceModel, SurfaceSample, SurfaceTexture};

use crate::tire::unit_interval;

/// Road material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Asphalt,
    Concrete,
    Dirt,
    Gravel,
    Grass,
    Ice,
}

impl RoadType {
    /// Base friction in ideal conditions.
    pub fn base_friction(self) -> f64 {
        match self {
            RoadType::Asphalt => 1.0,
            RoadType::Concrete => 1.1,
            RoadType::Dirt => 0.7,
            RoadType::Gravel => 0.6,
            RoadType::Grass => 0.5,
            RoadType::Ice => 0.1,
        }
    }

    /// Loose surfaces build grip over a longer slip range; ice breaks away early.
    pub fn slip_threshold_scale(self) -> f64 {
        match self {
            RoadType::Asphalt | RoadType::Concrete => 1.0,
            RoadType::Dirt => 1.4,
            RoadType::Gravel => 1.6,
            RoadType::Grass => 1.3,
            RoadType::Ice => 0.6,
        }
    }

    pub fn texture(self) -> SurfaceTexture {
        match self {
            RoadType::Asphalt | RoadType::Concrete => SurfaceTexture::Sealed,
            RoadType::Dirt | RoadType::Gravel | RoadType::Grass => SurfaceTexture::Loose,
            RoadType::Ice => SurfaceTexture::Ice,
        }
    }
}

/// A road material in a given state of repair/wetness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSurface {
    pub road_type: RoadType,
    /// 0 is slippery, 1 is ideal.
    pub condition: f64,
}

impl RoadSurface {
    pub fn new(road_type: RoadType, condition: f64) -> Self {
        RoadSurface { road_type, condition }
    }

    pub fn validate(&self) -> SimResult<()> {
        unit_interval("road.condition", self.condition)
    }

    pub fn sample(&self) -> SurfaceSample {
        let condition = self.condition.clamp(0.0, 1.0);
        SurfaceSample {
            friction: self.road_type.base_friction() * condition.powf(0.3),
            slip_threshold_scale: self.road_type.slip_threshold_scale(),
            texture: self.road_type.texture(),
            condition,
        }
    }
}

impl Default for RoadSurface {
    fn default() -> Self {
        RoadSurface::new(RoadType::Asphalt, 1.0)
    }
}

/// The same sample everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSurface {
    pub sample: SurfaceSample,
}

impl UniformSurface {
    pub fn new(road: RoadSurface) -> Self {
        UniformSurface { sample: road.sample() }
    }

    pub fn dry_asphalt() -> Self {
        UniformSurface { sample: SurfaceSample::DRY_ASPHALT }
    }
}

impl Default for UniformSurface {
    fn default() -> Self {
        UniformSurface::dry_asphalt()
    }
}

impl SurfaceModel for UniformSurface {
    fn sample(&self, _position: Vector2<f64>) -> SurfaceSample {
        self.sample
    }
}

/// Axis-aligned lookup grid, cells stored row-major (row = y).
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    origin: Vector2<f64>,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cells: Vec<SurfaceSample>,
}

impl SurfaceGrid {
    pub fn new(
        origin: Vector2<f64>,
        cell_size: f64,
        columns: usize,
        rows: usize,
        cells: Vec<SurfaceSample>,
    ) -> SimResult<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::configuration("cell_size", "must be finite and positive"));
        }
        let expected = cell_count(columns, rows)?;
        if cells.len() != expected {
            return Err(SimError::configuration(
                "cells",
                format!("expected {expected} cells for {columns}x{rows}, got {}", cells.len()),
            ));
        }
        Ok(SurfaceGrid { origin, cell_size, columns, rows, cells })
    }

    /// Grid with every cell set to `fill`.
    pub fn filled(origin: Vector2<f64>, cell_size: f64, columns: usize, rows: usize, fill: SurfaceSample) -> SimResult<Self> {
        Self::new(origin, cell_size, columns, rows, vec![fill; cell_count(columns, rows)?])
    }

    pub fn set_cell(&mut self, column: usize, row: usize, sample: SurfaceSample) {
        if column < self.columns && row < self.rows {
            self.cells[row * self.columns + column] = sample;
        }
    }

    fn cell_index(&self, position: Vector2<f64>) -> Option<usize> {
        let local = (position - self.origin) / self.cell_size;
        if !(local.x.is_finite() && local.y.is_finite()) || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let (column, row) = (local.x.floor() as usize, local.y.floor() as usize);
        (column < self.columns && row < self.rows).then(|| row * self.columns + column)
    }
}

impl SurfaceModel for SurfaceGrid {
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample {
        self.cell_index(position)
            .map(|i| self.cells[i])
            .unwrap_or(SurfaceSample::DRY_ASPHALT)
    }
}

fn cell_count(columns: usize, rows: usize) -> SimResult<usize> {
    columns
        .checked_mul(rows)
        .ok_or_else(|| SimError::configuration("columns", format!("{columns}x{rows} cells overflow")))
}

/// A band of fixed width around a centreline polyline.
#[derive(Debug, Clone)]
pub struct TrackSurface {
    centerline: Vec<Vector2<f64>>,
    half_width: f64,
    surface: SurfaceSample,
    runoff: Option<SurfaceSample>,
}

impl TrackSurface {
    pub fn new(centerline: Vec<Vector2<f64>>, track_width: f64, surface: SurfaceSample) -> SimResult<Self> {
        if centerline.len() < 2 {
            return Err(SimError::configuration("centerline", "needs at least two points"));
        }
        if !(track_width.is_finite() && track_width > 0.0) {
            return Err(SimError::configuration("track_width", "must be finite and positive"));
        }
        Ok(TrackSurface {
            centerline,
            half_width: 0.5 * track_width,
            surface,
            runoff: None,
        })
    }

    /// Centreline sampled from a Catmull-Rom spline through `control_points`.
    pub fn from_control_points(
        control_points: &[Vector2<f64>],
        track_width: f64,
        samples_per_segment: usize,
        surface: SurfaceSample,
    ) -> SimResult<Self> {
        if control_points.len() < 2 {
            return Err(SimError::configuration("control_points", "needs at least two points"));
        }
        let samples = samples_per_segment.max(1);
        let n = control_points.len();
        let mut centerline = Vec::with_capacity((n - 1) * samples + 1);
        for i in 0..n - 1 {
            let p0 = control_points[i.saturating_sub(1)];
            let p1 = control_points[i];
            let p2 = control_points[i + 1];
            let p3 = control_points[(i + 2).min(n - 1)];
            for k in 0..samples {
                let t = k as f64 / samples as f64;
                centerline.push(catmull_rom(p0, p1, p2, p3, t));
            }
        }
        centerline.push(control_points[n - 1]);
        Self::new(centerline, track_width, surface)
    }

    /// Surface used beside the track instead of the dry-asphalt default.
    pub fn with_runoff(mut self, runoff: SurfaceSample) -> Self {
        self.runoff = Some(runoff);
        self
    }

    pub fn centerline(&self) -> &[Vector2<f64>] {
        &self.centerline
    }

    pub fn distance_to_centerline(&self, position: Vector2<f64>) -> f64 {
        self.centerline
            .windows(2)
            .map(|seg| distance_to_segment(position, seg[0], seg[1]))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn is_on_track(&self, position: Vector2<f64>) -> bool {
        self.distance_to_centerline(position) <= self.half_width
    }
}

impl SurfaceModel for TrackSurface {
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample {
        if self.is_on_track(position) {
            self.surface
        } else {
            self.runoff.unwrap_or(SurfaceSample::DRY_ASPHALT)
        }
    }
}

fn catmull_rom(p0: Vector2<f64>, p1: Vector2<f64>, p2: Vector2<f64>, p3: Vector2<f64>, t: f64) -> Vector2<f64> {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}

fn distance_to_segment(p: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}
