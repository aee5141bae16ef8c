//! 几何工具 (Geometric primitives)
//! IOU / 点在框内 / 关键点外接框

use super::types::{BBox, Point2};

/// 分母中的平滑项,两个零面积框的IOU为0
const IOU_EPS: f32 = 1e-6;

/// 计算两个边界框的IOU (Intersection over Union), 结果在 [0, 1]
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }

    (intersection / (union + IOU_EPS)).clamp(0.0, 1.0)
}

/// 点是否在框内 (两个方向都包含边界)
pub fn point_in_box(p: Point2, b: &BBox) -> bool {
    b.x1 <= p.x && p.x <= b.x2 && b.y1 <= p.y && p.y <= b.y2
}

/// 一组点的外接框, 空集合返回None
pub fn enclosing_box<I>(points: I) -> Option<BBox>
where
    I: IntoIterator<Item = Point2>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let init = BBox::new(first.x, first.y, first.x, first.y);
    Some(iter.fold(init, |b, p| {
        BBox::new(b.x1.min(p.x), b.y1.min(p.y), b.x2.max(p.x), b.y2.max(p.y))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> Vec<BBox> {
        vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(5.0, 5.0, 15.0, 15.0),
            BBox::new(20.0, 20.0, 30.0, 40.0),
            BBox::new(-5.0, 2.0, 8.0, 3.0),
            BBox::new(4.0, 4.0, 4.0, 9.0),
        ]
    }

    #[test]
    fn test_iou_symmetric() {
        let bs = boxes();
        for a in &bs {
            for b in &bs {
                assert_eq!(iou(a, b), iou(b, a));
            }
        }
    }

    #[test]
    fn test_iou_self_and_disjoint() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-5);
        let far = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(iou(&a, &far), 0.0);
        // 仅边相接
        let touching = BBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(iou(&a, &touching), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        // 25 / (100 + 100 - 25)
        assert!((iou(&a, &b) - 25.0 / 175.0).abs() < 1e-5);
    }

    #[test]
    fn test_iou_degenerate() {
        let line = BBox::new(4.0, 4.0, 4.0, 9.0);
        assert_eq!(iou(&line, &line), 0.0);
        let inverted = BBox::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(iou(&inverted, &BBox::new(0.0, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_point_in_box_inclusive() {
        let b = BBox::new(80.0, 100.0, 120.0, 140.0);
        assert!(point_in_box(Point2::new(100.0, 120.0), &b));
        assert!(point_in_box(Point2::new(80.0, 140.0), &b));
        assert!(!point_in_box(Point2::new(79.9, 120.0), &b));
    }

    #[test]
    fn test_enclosing_box() {
        assert_eq!(enclosing_box(Vec::new()), None);
        let b = enclosing_box(vec![
            Point2::new(60.0, 120.0),
            Point2::new(140.0, 118.0),
            Point2::new(70.0, 300.0),
        ])
        .unwrap();
        assert_eq!(b, BBox::new(60.0, 118.0, 140.0, 300.0));
    }
}
