use crate::color::Rgba;
use serde::{Deserialize, Serialize};

/// Position in viewport pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D drawing capability the shapes render against.
pub trait DrawSurface {
    /// Resets every pixel to transparent black.
    fn clear(&mut self);
    fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba);
    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba);
}

/// Drawable entity: the round targets and the full-screen flash rectangle.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
    Rectangle {
        origin: Point,
        width: f32,
        height: f32,
        color: Rgba,
    },
}

impl Shape {
    pub fn circle(center: Point, radius: f32, color: Rgba) -> Self {
        Shape::Circle {
            center,
            radius,
            color,
        }
    }

    pub fn rectangle(origin: Point, width: f32, height: f32, color: Rgba) -> Self {
        Shape::Rectangle {
            origin,
            width,
            height,
            color,
        }
    }

    /// Anchor point: centre for circles, top-left corner for rectangles.
    pub fn position(&self) -> Point {
        match self {
            Shape::Circle { center, .. } => *center,
            Shape::Rectangle { origin, .. } => *origin,
        }
    }

    pub fn move_to(&mut self, to: Point) {
        match self {
            Shape::Circle { center, .. } => *center = to,
            Shape::Rectangle { origin, .. } => *origin = to,
        }
    }

    pub fn recolor(&mut self, to: Rgba) {
        match self {
            Shape::Circle { color, .. } | Shape::Rectangle { color, .. } => *color = to,
        }
    }

    pub fn draw(&self, surface: &mut dyn DrawSurface) {
        match self {
            Shape::Circle {
                center,
                radius,
                color,
            } => surface.fill_circle(*center, *radius, *color),
            Shape::Rectangle {
                origin,
                width,
                height,
                color,
            } => surface.fill_rect(*origin, *width, *height, *color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl DrawSurface for Log {
        fn clear(&mut self) {
            self.0.push("clear".into());
        }
        fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba) {
            self.0
                .push(format!("rect {} {} {width} {height} {color}", origin.x, origin.y));
        }
        fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
            self.0
                .push(format!("circle {} {} {radius} {color}", center.x, center.y));
        }
    }

    #[test]
    fn move_and_recolor_then_draw() {
        let mut c = Shape::circle(Point::new(1.0, 2.0), 5.0, Rgba::BLACK);
        c.move_to(Point::new(10.0, 20.0));
        c.recolor(Rgba::WHITE);
        let mut r = Shape::rectangle(Point::default(), 100.0, 50.0, Rgba::GREY);
        r.recolor(Rgba::WHITE);

        let mut log = Log::default();
        r.draw(&mut log);
        c.draw(&mut log);
        assert_eq!(
            log.0,
            vec!["rect 0 0 100 50 #FFFFFF", "circle 10 20 5 #FFFFFF"]
        );
        assert_eq!(c.position(), Point::new(10.0, 20.0));
    }
}
