use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

pub type ShapeId = Id<Shape>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub sequence: u32,
    pub distance_traveled: Option<f64>,
}

/// A geospatial path a trip follows, as points sorted by sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub points: Vec<ShapePoint>,
}

impl HasId for Shape {
    type IdType = String;
}

impl Shape {
    pub fn new(id: ShapeId, mut points: Vec<ShapePoint>) -> Self {
        points.sort_by_key(|point| point.sequence);
        Self { id, points }
    }

    /// Mean lat/lon of all points, or `None` for an empty shape.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let count = self.points.len() as f64;
        let (lat_sum, lon_sum) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
        Some((lat_sum / count, lon_sum / count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_points_by_sequence_at_construction() {
        let shape = Shape::new(
            Id::new("s1".to_owned()),
            vec![
                ShapePoint { latitude: 1.0, longitude: 1.0, sequence: 2, distance_traveled: None },
                ShapePoint { latitude: 0.0, longitude: 0.0, sequence: 1, distance_traveled: None },
            ],
        );
        assert_eq!(shape.points[0].sequence, 1);
        assert_eq!(shape.points[1].sequence, 2);
    }

    #[test]
    fn center_is_mean_of_points() {
        let shape = Shape::new(
            Id::new("s1".to_owned()),
            vec![
                ShapePoint { latitude: 0.0, longitude: 0.0, sequence: 1, distance_traveled: None },
                ShapePoint { latitude: 2.0, longitude: 4.0, sequence: 2, distance_traveled: None },
            ],
        );
        assert_eq!(shape.center(), Some((1.0, 2.0)));
    }
}
