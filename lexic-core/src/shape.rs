/// Clickable circular region, used for the rating targets. Hit testing is
/// pure so the pointer logic stays testable without a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleRegion {
    pub center: (f32, f32),
    pub radius: f32,
}

impl CircleRegion {
    pub fn new(center: (f32, f32), radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        let dx = point.0 - self.center.0;
        let dy = point.1 - self.center.1;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_includes_the_boundary() {
        let region = CircleRegion::new((100.0, 100.0), 50.0);
        assert!(region.contains((100.0, 100.0)));
        assert!(region.contains((150.0, 100.0)));
        assert!(!region.contains((150.1, 100.0)));
        assert!(region.contains((100.0 + 35.0, 100.0 + 35.0)));
        assert!(!region.contains((100.0 + 36.0, 100.0 + 36.0)));
    }
}
