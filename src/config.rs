use serde::Deserialize;

use crate::error::ConfigError;
use crate::math::{Point3, TOLERANCE};

/// Settings of a partition, normally taken from the simulation configuration.
///
/// The partition is a cube starting at `origin` with edge `edge_length`,
/// split into cubic subpartitions of edge `subpartition_edge_length`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Lower-front-left corner of the partition cube.
    pub origin: [f64; 3],
    pub edge_length: f64,
    pub subpartition_edge_length: f64,
    /// Seed of the partition's auxiliary random stream.
    pub seed: u64,
    /// When `false`, every point lies in counted volume 0 and no waypoints
    /// are computed.
    pub use_counted_volumes: bool,
    /// Let a waypoint inherit its predecessor's counted volume when no
    /// counted wall separates them.
    pub reuse_waypoint_counted_volumes: bool,
    /// Process objects and vertices of a vertex-move batch in random order.
    pub randomize_vertex_move_order: bool,
    /// Surface grid tiles per unit wall area.
    pub surface_grid_density: f64,
    /// Minimum distance kept between a moved vertex and a wall it ran into.
    pub vertex_move_min_gap: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            origin: [-1.0, -1.0, -1.0],
            edge_length: 2.0,
            subpartition_edge_length: 0.5,
            seed: 1,
            use_counted_volumes: true,
            reuse_waypoint_counted_volumes: true,
            randomize_vertex_move_order: false,
            surface_grid_density: 10_000.0,
            vertex_move_min_gap: 1e-6,
        }
    }
}

impl PartitionConfig {
    /// Lower-front-left corner as a point.
    #[must_use]
    pub fn origin_point(&self) -> Point3 {
        Point3::from(self.origin)
    }

    /// Number of subpartitions along each axis.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn subparts_per_dimension(&self) -> usize {
        (self.edge_length / self.subpartition_edge_length).round() as usize
    }

    /// Checks sizes and grid alignment.
    ///
    /// # Errors
    ///
    /// Returns an error if a length or density is not positive, the
    /// partition is not a whole number of subpartitions wide, or the origin
    /// is not on the subpartition grid through the world origin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("edge_length", self.edge_length),
            ("subpartition_edge_length", self.subpartition_edge_length),
            ("surface_grid_density", self.surface_grid_density),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.vertex_move_min_gap.is_nan() || self.vertex_move_min_gap < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "vertex_move_min_gap",
                value: self.vertex_move_min_gap,
            });
        }

        let ratio = self.edge_length / self.subpartition_edge_length;
        if (ratio - ratio.round()).abs() > TOLERANCE * ratio.max(1.0) {
            return Err(ConfigError::NotMultipleOfSubpartition {
                edge_length: self.edge_length,
                subpartition_edge_length: self.subpartition_edge_length,
            });
        }

        for (axis, value) in ['x', 'y', 'z'].into_iter().zip(self.origin) {
            let steps = value / self.subpartition_edge_length;
            if (steps - steps.round()).abs() > TOLERANCE * steps.abs().max(1.0) {
                return Err(ConfigError::MisalignedOrigin { axis, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PartitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.subparts_per_dimension(), 4);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: PartitionConfig =
            serde_json::from_str(r#"{ "edge_length": 4.0, "origin": [-2.0, -2.0, -2.0], "seed": 7 }"#)
                .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.subparts_per_dimension(), 8);
        assert!(config.use_counted_volumes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn edge_must_be_multiple_of_subpartition() {
        let config = PartitionConfig {
            edge_length: 2.2,
            ..PartitionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotMultipleOfSubpartition { .. })
        ));
    }

    #[test]
    fn origin_must_lie_on_grid() {
        let config = PartitionConfig {
            origin: [-1.0, -0.9, -1.0],
            ..PartitionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MisalignedOrigin { axis: 'y', .. })
        ));
    }

    #[test]
    fn non_positive_lengths_are_rejected() {
        let config = PartitionConfig {
            subpartition_edge_length: 0.0,
            ..PartitionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "subpartition_edge_length", .. })
        ));
    }
}
