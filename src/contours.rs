use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use serde::{Deserialize, Serialize};

use crate::rect::bounding_box;

/// Traces the outermost boundaries of the connected regions of an edge map.
///
/// Holes, and any region nested inside another region's hole, are dropped, so
/// each returned contour is an independent outer ring. An edge map without any
/// set pixel yields an empty vector.
pub fn find_outer_contours(edges: &GrayImage) -> Vec<Contour<i32>> {
    let contours = find_contours::<i32>(edges);

    let keep: Vec<bool> = (0..contours.len())
        .map(|i| contours[i].border_type == BorderType::Outer && !has_outer_ancestor(&contours, i))
        .collect();

    contours
        .into_iter()
        .zip(keep)
        .filter_map(|(contour, keep)| keep.then_some(contour))
        .collect()
}

fn has_outer_ancestor(contours: &[Contour<i32>], index: usize) -> bool {
    let mut parent = contours[index].parent;
    // Parents always precede their children, so the walk terminates.
    while let Some(p) = parent {
        match contours.get(p) {
            Some(c) if c.border_type == BorderType::Outer => return true,
            Some(c) => parent = c.parent,
            None => return false,
        }
    }
    false
}

/// Drops contours whose bounding box is too small to be a plausible subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourFilter {
    pub min_area: u64,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for ContourFilter {
    fn default() -> Self {
        Self {
            min_area: 50,
            min_width: 10,
            min_height: 10,
        }
    }
}

impl ContourFilter {
    /// Returns `true` if the contour's bounding box passes all three minimums.
    ///
    /// A contour without points never passes.
    pub fn accepts(&self, contour: &Contour<i32>) -> bool {
        bounding_box(contour.points.iter()).is_some_and(|bbox| {
            bbox.width >= self.min_width
                && bbox.height >= self.min_height
                && bbox.area() >= self.min_area
        })
    }

    /// Filters a vector of contours in-place.
    pub fn filter_in_place(&self, contours: &mut Vec<Contour<i32>>) {
        contours.retain(|contour| self.accepts(contour));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::point::Point;

    fn rect_contour(x: i32, y: i32, w: i32, h: i32) -> Contour<i32> {
        Contour {
            points: vec![
                Point::new(x, y),
                Point::new(x + w - 1, y),
                Point::new(x + w - 1, y + h - 1),
                Point::new(x, y + h - 1),
            ],
            border_type: BorderType::Outer,
            parent: None,
        }
    }

    fn draw_ring(image: &mut GrayImage, from: u32, to: u32) {
        for i in from..=to {
            image.put_pixel(i, from, Luma([255]));
            image.put_pixel(i, to, Luma([255]));
            image.put_pixel(from, i, Luma([255]));
            image.put_pixel(to, i, Luma([255]));
        }
    }

    #[test]
    fn test_default_filter_drops_small_and_keeps_large() {
        let filter = ContourFilter::default();
        let mut contours = vec![rect_contour(0, 0, 5, 5), rect_contour(20, 20, 10, 10)];
        filter.filter_in_place(&mut contours);

        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points[0], Point::new(20, 20));
    }

    #[test]
    fn test_every_predicate_must_pass() {
        let filter = ContourFilter {
            min_area: 200,
            min_width: 10,
            min_height: 10,
        };
        // Wide but flat.
        assert!(!filter.accepts(&rect_contour(0, 0, 40, 9)));
        // Tall but narrow.
        assert!(!filter.accepts(&rect_contour(0, 0, 9, 40)));
        // Wide and tall enough, but the area is 100.
        assert!(!filter.accepts(&rect_contour(0, 0, 10, 10)));
        assert!(filter.accepts(&rect_contour(0, 0, 20, 10)));

        let empty = Contour {
            points: Vec::new(),
            border_type: BorderType::Outer,
            parent: None,
        };
        assert!(!filter.accepts(&empty));
    }

    #[test]
    fn test_blank_edge_map_has_no_contours() {
        let edges = GrayImage::new(20, 20);
        assert!(find_outer_contours(&edges).is_empty());
    }

    #[test]
    fn test_nested_rings_yield_only_the_outermost() {
        let mut edges = GrayImage::new(60, 60);
        draw_ring(&mut edges, 5, 40);
        draw_ring(&mut edges, 15, 30);
        draw_ring(&mut edges, 45, 55);

        let contours = find_outer_contours(&edges);
        assert_eq!(contours.len(), 2);

        let mut boxes: Vec<_> = contours
            .iter()
            .map(|c| bounding_box(c.points.iter()).unwrap())
            .map(|b| (b.x, b.y, b.width, b.height))
            .collect();
        boxes.sort();
        assert_eq!(boxes, vec![(5, 5, 36, 36), (45, 45, 11, 11)]);
    }
}
