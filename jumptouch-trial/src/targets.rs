use jumptouch_core::{DrawSurface, Point, Rgba, Shape};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Serial position the participant should touch it in.
    pub id: usize,
    pub shape: Shape,
    pub pre: Point,
    pub post: Point,
    live: bool,
}

impl Target {
    pub fn position(&self) -> Point {
        self.shape.position()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// The targets of one trial plus the order they were touched in.
///
/// Touched targets are flagged dead rather than removed so registration
/// order, which decides ties, never changes.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    tolerance: f32,
    choice_order: Vec<usize>,
}

impl TargetRegistry {
    pub fn new(positions: &[(Point, Point)], radius: f32, color: Rgba, tolerance: f32) -> Self {
        let targets = positions
            .iter()
            .enumerate()
            .map(|(id, &(pre, post))| Target {
                id,
                shape: Shape::circle(pre, radius, color),
                pre,
                post,
                live: true,
            })
            .collect();
        Self {
            targets,
            tolerance,
            choice_order: Vec::new(),
        }
    }

    pub fn initial_count(&self) -> usize {
        self.targets.len()
    }

    pub fn consumed_count(&self) -> usize {
        self.choice_order.len()
    }

    pub fn all_consumed(&self) -> bool {
        self.consumed_count() == self.initial_count()
    }

    pub fn choice_order(&self) -> &[usize] {
        &self.choice_order
    }

    pub fn live(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.live)
    }

    /// Moves every live target to its pre- or post-shift position, then
    /// consumes at most one target under `pending`.
    ///
    /// A touch hits when it lies strictly inside the square of half-width
    /// `tolerance` around the target centre. The first live target in
    /// registration order wins; the hit clears `pending`.
    pub fn apply_shift_and_hit_test(
        &mut self,
        shift_active: bool,
        pending: &mut Option<Point>,
    ) -> Option<usize> {
        for t in self.targets.iter_mut().filter(|t| t.live) {
            let to = if shift_active { t.post } else { t.pre };
            t.shape.move_to(to);
        }

        let touch = (*pending)?;
        let tol = self.tolerance;
        let hit = self.targets.iter_mut().find(|t| {
            let p = t.shape.position();
            t.live && (touch.x - p.x).abs() < tol && (touch.y - p.y).abs() < tol
        })?;

        hit.live = false;
        self.choice_order.push(hit.id);
        *pending = None;
        debug!(target_id = hit.id, x = touch.x, y = touch.y, "target_touched");
        Some(hit.id)
    }

    pub fn draw(&self, surface: &mut dyn DrawSurface) {
        for t in self.live() {
            t.shape.draw(surface);
        }
    }
}
