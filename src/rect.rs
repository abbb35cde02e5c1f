use image::{RgbImage, imageops};
use imageproc::{contours::Contour, point::Point};
use num_traits::{Num, ToPrimitive};

use crate::error::{PipelineError, Result};

/// An axis-aligned rectangle in pixel coordinates.
///
/// `width` and `height` count pixels, so a box around a single point is `1x1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Pixel count of the box.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Calculates the smallest axis-aligned box enclosing every point.
///
/// The box is inclusive of the extreme points: points spanning `0..=4` on an axis
/// give an extent of `5`. Negative coordinates are clamped to `0` since they can't
/// address any pixel.
///
/// Returns `None` if `points` is empty.
///
/// # Examples
///
/// ```
/// use imageproc::point::Point;
/// use tomato_features::rect::bounding_box;
///
/// let square = [Point::new(2, 3), Point::new(11, 3), Point::new(11, 12), Point::new(2, 12)];
/// let bbox = bounding_box(square.iter()).unwrap();
///
/// assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (2, 3, 10, 10));
/// ```
pub fn bounding_box<'a, T, I>(points: I) -> Option<BoundingBox>
where
    T: Copy + PartialOrd + Num + ToPrimitive + 'a,
    I: IntoIterator<Item = &'a Point<T>>,
{
    let mut points = points.into_iter();
    let first = points.next()?;
    let mut min_x = first.x;
    let mut max_x = first.x;
    let mut min_y = first.y;
    let mut max_y = first.y;

    // `T` is only `PartialOrd`, so no `min`/`max` here.
    for p in points {
        if p.x < min_x {
            min_x = p.x;
        }
        if p.x > max_x {
            max_x = p.x;
        }
        if p.y < min_y {
            min_y = p.y;
        }
        if p.y > max_y {
            max_y = p.y;
        }
    }

    let x = min_x.to_u32().unwrap_or(0);
    let y = min_y.to_u32().unwrap_or(0);

    let width = (max_x.to_u32().unwrap_or(0) + 1).saturating_sub(x);
    let height = (max_y.to_u32().unwrap_or(0) + 1).saturating_sub(y);

    Some(BoundingBox {
        x,
        y,
        width,
        height,
    })
}

/// Crops `image` to the bounding box of the union of all contour points.
///
/// The box is computed over the merged point set, not by combining per-contour
/// boxes. Parts of the box outside the image are clipped.
///
/// # Errors
///
/// Returns [`PipelineError::NoForegroundDetected`] if `contours` holds no points.
pub fn crop_to_contours(image: &RgbImage, contours: &[Contour<i32>]) -> Result<RgbImage> {
    let bbox = bounding_box(contours.iter().flat_map(|c| c.points.iter()))
        .ok_or(PipelineError::NoForegroundDetected)?;

    Ok(imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::contours::BorderType;

    fn contour(points: Vec<Point<i32>>) -> Contour<i32> {
        Contour {
            points,
            border_type: BorderType::Outer,
            parent: None,
        }
    }

    #[test]
    fn test_bounding_box_for_diamond() {
        let vertices = [
            Point { x: 50, y: 10 },
            Point { x: 90, y: 50 },
            Point { x: 50, y: 90 },
            Point { x: 10, y: 50 },
        ];
        let expected = BoundingBox {
            x: 10,
            y: 10,
            width: 81,
            height: 81,
        };
        assert_eq!(bounding_box(vertices.iter()), Some(expected));
    }

    #[test]
    fn test_bounding_box_is_order_independent() {
        let vertices = [
            Point { x: 20, y: 30 },
            Point { x: 119, y: 30 },
            Point { x: 119, y: 79 },
            Point { x: 20, y: 79 },
        ];
        let shuffled = [vertices[2], vertices[0], vertices[3], vertices[1]];
        let expected = BoundingBox {
            x: 20,
            y: 30,
            width: 100,
            height: 50,
        };
        assert_eq!(bounding_box(vertices.iter()), Some(expected));
        assert_eq!(bounding_box(shuffled.iter()), Some(expected));
        assert_eq!(expected.area(), 5000);
    }

    #[test]
    fn test_bounding_box_with_negative_coordinates() {
        let vertices = [
            Point { x: -10.0, y: -20.0 },
            Point { x: 49.0, y: 29.0 },
        ];
        let expected = BoundingBox {
            x: 0,
            y: 0,
            width: 50,
            height: 30,
        };
        assert_eq!(bounding_box(vertices.iter()), Some(expected));
    }

    #[test]
    fn test_single_point_and_empty() {
        let point = [Point { x: 100, y: 100 }];
        let bbox = bounding_box(point.iter()).unwrap();
        assert_eq!((bbox.width, bbox.height), (1, 1));

        let none: [Point<i32>; 0] = [];
        assert_eq!(bounding_box(none.iter()), None);
    }

    #[test]
    fn test_crop_uses_union_of_all_contour_points() {
        let image = RgbImage::from_fn(40, 40, |x, y| Rgb([x as u8, y as u8, 0]));
        let contours = vec![
            contour(vec![Point::new(5, 6), Point::new(9, 10)]),
            contour(vec![Point::new(20, 25), Point::new(24, 30)]),
        ];

        let cropped = crop_to_contours(&image, &contours).unwrap();
        assert_eq!(cropped.dimensions(), (20, 25));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([5, 6, 0]));
        assert_eq!(cropped.get_pixel(19, 24), &Rgb([24, 30, 0]));
    }

    #[test]
    fn test_crop_without_contours_fails() {
        let image = RgbImage::new(10, 10);
        assert!(matches!(
            crop_to_contours(&image, &[]),
            Err(PipelineError::NoForegroundDetected)
        ));
    }
}
