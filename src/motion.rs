use crate::engine::input::KeyState;
use crate::engine::{Point, Rect, Size};

const LEFT_KEYS: [&str; 2] = ["ArrowLeft", "KeyA"];
const RIGHT_KEYS: [&str; 2] = ["ArrowRight", "KeyD"];
const UP_KEYS: [&str; 2] = ["ArrowUp", "KeyW"];
const DOWN_KEYS: [&str; 2] = ["ArrowDown", "KeyS"];

/// Rect that travels diagonally and reflects off the window edges.
///
/// Velocity is only ever `+speed` or `-speed` per axis, so a rect wider
/// than the window keeps flipping every step instead of escaping.
#[derive(Debug, Clone, Copy)]
pub struct Bouncer {
    rect: Rect,
    speed: i32,
    velocity: Point,
}

impl Bouncer {
    pub fn new(size: Size, speed: i32) -> Self {
        Bouncer {
            rect: Rect::from_size(size),
            speed,
            velocity: Point { x: speed, y: speed },
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    /// Move one step inside `bounds`, returns how many edges were hit
    pub fn step(&mut self, bounds: Size) -> u32 {
        self.rect.position.x += self.velocity.x;
        self.rect.position.y += self.velocity.y;

        let mut hits = 0;
        if self.rect.right() > bounds.width {
            self.velocity.x = -self.speed;
            hits += 1;
        }
        if self.rect.x() < 0 {
            self.velocity.x = self.speed;
            hits += 1;
        }
        if self.rect.bottom() > bounds.height {
            self.velocity.y = -self.speed;
            hits += 1;
        }
        if self.rect.y() < 0 {
            self.velocity.y = self.speed;
            hits += 1;
        }
        hits
    }
}

/// Rect steered by arrow keys or WASD. Not kept inside the window.
#[derive(Debug, Clone, Copy)]
pub struct Mover {
    rect: Rect,
    speed: i32,
}

impl Mover {
    pub fn new(size: Size, speed: i32) -> Self {
        Mover {
            rect: Rect::from_size(size),
            speed,
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    /// Opposite keys held together cancel out
    pub fn step(&mut self, keystate: &KeyState) {
        if keystate.any_pressed(&LEFT_KEYS) {
            self.rect.position.x -= self.speed;
        }
        if keystate.any_pressed(&RIGHT_KEYS) {
            self.rect.position.x += self.speed;
        }
        if keystate.any_pressed(&UP_KEYS) {
            self.rect.position.y -= self.speed;
        }
        if keystate.any_pressed(&DOWN_KEYS) {
            self.rect.position.y += self.speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::InputEvent;

    const WINDOW: Size = Size {
        width: 800,
        height: 600,
    };

    fn hold(keystate: &mut KeyState, code: &str) {
        keystate.apply(InputEvent::KeyDown {
            code: code.to_string(),
        });
    }

    #[test]
    fn bouncer_moves_diagonally_from_origin() {
        let mut label = Bouncer::new(Size { width: 100, height: 50 }, 3);
        assert_eq!(label.step(WINDOW), 0);
        assert_eq!(label.rect().position, Point { x: 3, y: 3 });
    }

    #[test]
    fn bouncer_reflects_off_right_edge_once() {
        let mut label = Bouncer::new(Size { width: 100, height: 50 }, 3);
        let mut hits = 0;
        // right edge reached after x + 100 > 800, i.e. x = 702 at step 234
        for _ in 0..234 {
            hits += label.step(Size { width: 800, height: 10_000 });
        }
        assert_eq!(hits, 1);
        assert_eq!(label.rect().x(), 702);
        assert_eq!(label.velocity().x, -3);

        label.step(Size { width: 800, height: 10_000 });
        assert_eq!(label.rect().x(), 699);
    }

    #[test]
    fn bouncer_reflects_off_left_and_top_edges() {
        let mut label = Bouncer::new(Size { width: 10, height: 10 }, 3);
        label.velocity = Point { x: -3, y: -3 };
        assert_eq!(label.step(WINDOW), 2);
        assert_eq!(label.velocity(), Point { x: 3, y: 3 });
    }

    #[test]
    fn bouncer_hits_corner_counts_both_axes() {
        let mut label = Bouncer::new(Size { width: 10, height: 10 }, 3);
        label.rect.position = Point { x: 789, y: 589 };
        assert_eq!(label.step(WINDOW), 2);
        assert_eq!(label.velocity(), Point { x: -3, y: -3 });
    }

    #[test]
    fn bouncer_wider_than_window_hits_both_sides() {
        let mut label = Bouncer::new(Size { width: 900, height: 10 }, 3);
        label.rect.position = Point { x: -1, y: 100 };
        label.velocity.x = -3;
        // left of 0 and right of 800 at once; the left check wins
        assert_eq!(label.step(WINDOW), 2);
        assert_eq!(label.velocity().x, 3);
    }

    #[test]
    fn mover_follows_arrows_and_wasd() {
        let mut sprite = Mover::new(Size { width: 64, height: 64 }, 5);
        let mut keystate = KeyState::new();
        hold(&mut keystate, "KeyD");
        hold(&mut keystate, "ArrowDown");

        sprite.step(&keystate);
        sprite.step(&keystate);
        assert_eq!(sprite.rect().position, Point { x: 10, y: 10 });
    }

    #[test]
    fn mover_opposite_keys_cancel_and_can_leave_window() {
        let mut sprite = Mover::new(Size { width: 64, height: 64 }, 5);
        let mut keystate = KeyState::new();
        hold(&mut keystate, "ArrowLeft");
        hold(&mut keystate, "ArrowRight");
        hold(&mut keystate, "KeyW");

        sprite.step(&keystate);
        assert_eq!(sprite.rect().position, Point { x: 0, y: -5 });
    }
}
