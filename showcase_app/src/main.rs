//! Orbit demo showcasing hierarchical transforms and deferred mutation
//!
//! A spawner node emits satellites that orbit it; each satellite carries a
//! sprite and a finite lifetime, after which it invalidates its own node.
//! Everything draws through a console batcher that just logs its calls, so
//! the demo runs headless.

use scene_engine::prelude::*;
use std::any::Any;

const DESIGN_SIZE: Vec2 = Vec2::new(640.0, 360.0);
const WINDOW_SIZE: Vec2 = Vec2::new(1280.0, 720.0);
const SPAWN_INTERVAL: f32 = 0.5; // Seconds between satellite spawns
const SATELLITE_LIFETIME: f32 = 3.0; // Seconds before a satellite removes itself
const ORBIT_RADIUS: f32 = 80.0;
const ORBIT_SPEED: f32 = 1.5; // Radians per second
const DEMO_FRAMES: u64 = 600;

/// Batcher that logs draw calls instead of talking to a GPU
struct ConsoleBatcher {
    depth: usize,
    rects: usize,
}

impl ConsoleBatcher {
    fn new() -> Self {
        Self { depth: 0, rects: 0 }
    }
}

impl Batcher for ConsoleBatcher {
    fn push_matrix(&mut self, _matrix: Mat3) {
        self.depth += 1;
    }

    fn pop_matrix(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            log::debug!("frame finished with {} rects", self.rects);
            self.rects = 0;
        }
    }

    fn draw_rect(&mut self, size: Vec2, _color: Color) {
        self.rects += 1;
        log::trace!("rect {}x{} at depth {}", size.x, size.y, self.depth);
    }

    fn set_blend(&mut self, mode: BlendMode) -> BlendMode {
        log::trace!("blend mode {mode:?}");
        mode
    }
}

/// Draws a colored rectangle at the owning node's transform
struct Sprite {
    size: Vec2,
    color: Color,
}

impl Component for Sprite {
    fn render(&self, _scene: &Scene, _this: ComponentRef, frame: &mut FrameRenderer) {
        frame.current().draw_rect(self.size, self.color);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Circles the owning node around its parent's origin
struct Orbit {
    radius: f32,
    speed: f32,
    angle: f32,
}

impl Component for Orbit {
    fn update(&mut self, scene: &mut Scene, this: ComponentRef, delta_time: f32) {
        self.angle += self.speed * delta_time;
        let position = Vec2::new(
            self.angle.cos() * self.radius,
            self.angle.sin() * self.radius,
        );
        scene.set_local_position(this.owner, position);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Invalidates the owning node after a fixed lifetime
struct Lifetime {
    remaining: f32,
}

impl Component for Lifetime {
    fn update(&mut self, scene: &mut Scene, this: ComponentRef, delta_time: f32) {
        self.remaining -= delta_time;
        if self.remaining <= 0.0 {
            scene.queue_invalidate(this.owner, true, true);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Periodically spawns orbiting satellites under the owning node
struct Spawner {
    timer: f32,
    spawned: u32,
}

impl Component for Spawner {
    fn update(&mut self, scene: &mut Scene, this: ComponentRef, delta_time: f32) {
        self.timer -= delta_time;
        if self.timer > 0.0 {
            return;
        }
        self.timer = SPAWN_INTERVAL;
        self.spawned += 1;

        let satellite = scene.create_node_named(format!("satellite-{}", self.spawned));
        scene.add_component(
            satellite,
            Sprite {
                size: Vec2::new(8.0, 8.0),
                color: Color::WHITE,
            },
        );
        scene.add_component(
            satellite,
            Orbit {
                radius: ORBIT_RADIUS,
                speed: ORBIT_SPEED,
                angle: self.spawned as f32,
            },
        );
        scene.add_component(
            satellite,
            Lifetime {
                remaining: SATELLITE_LIFETIME,
            },
        );
        scene.add_child(this.owner, satellite);
        log::info!("spawned satellite {}", self.spawned);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct OrbitDemoApp;

impl Application for OrbitDemoApp {
    fn setup(&mut self, scene: &mut Scene) -> Result<(), AppError> {
        let root = scene.root();
        scene.add_render_action(
            root,
            Box::new(LetterboxAction::new(DESIGN_SIZE, WINDOW_SIZE)),
        );

        let hub = scene.create_node_named("hub");
        scene.set_local_position(hub, DESIGN_SIZE * 0.5);
        scene.add_component(
            hub,
            Sprite {
                size: Vec2::new(16.0, 16.0),
                color: Color::WHITE,
            },
        );
        scene.add_component(
            hub,
            Spawner {
                timer: 0.0,
                spawned: 0,
            },
        );
        scene.add_render_action(hub, Box::new(BlendAction::new(BlendMode::Additive)));
        scene.add_child(root, hub);
        Ok(())
    }

    fn frame(&mut self, scene: &mut Scene, _delta_time: f32) -> Result<(), AppError> {
        log::debug!(
            "{} nodes, {} components",
            scene.node_count(),
            scene.component_count()
        );
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut runner = Runner::new(SceneConfig::default(), Box::new(ConsoleBatcher::new()));
    if let Err(error) = runner.run(&mut OrbitDemoApp, Some(DEMO_FRAMES)) {
        log::error!("demo failed: {error}");
        std::process::exit(1);
    }
}
