//! Application trait and frame-loop driver

use thiserror::Error;

use crate::core::config::{ConfigError, SceneConfig};
use crate::foundation::time::Timer;
use crate::render::{Batcher, FrameRenderer};
use crate::scene::Scene;

/// Application lifecycle trait
///
/// Implement this to drive a scene with the [`Runner`]: build the initial
/// tree in `setup`, run per-frame logic outside the graph in `frame`.
pub trait Application {
    /// Build the initial scene tree
    ///
    /// Queued mutations are flushed before the first frame.
    fn setup(&mut self, scene: &mut Scene) -> Result<(), AppError>;

    /// Per-frame application logic, called before the scene tick
    fn frame(&mut self, scene: &mut Scene, delta_time: f32) -> Result<(), AppError> {
        let _ = (scene, delta_time);
        Ok(())
    }

    /// Whether the application wants to stop
    fn should_exit(&self, scene: &Scene) -> bool {
        let _ = scene;
        false
    }

    /// Called once after the loop ends
    fn teardown(&mut self, scene: &mut Scene) {
        let _ = scene;
    }
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Scene setup error
    #[error("setup error: {0}")]
    Setup(String),

    /// Per-frame application error
    #[error("frame error: {0}")]
    Frame(String),
}

/// Owns the scene, the frame timer, and the base batcher, and drives ticks
pub struct Runner {
    scene: Scene,
    timer: Timer,
    frame: FrameRenderer,
}

impl Runner {
    /// Create a runner over the application's base batcher
    pub fn new(config: SceneConfig, base: Box<dyn Batcher>) -> Self {
        Self {
            scene: Scene::with_config(config),
            timer: Timer::new(),
            frame: FrameRenderer::new(base),
        }
    }

    /// Access the scene between frames
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Run the application, up to `max_frames` frames if given
    pub fn run<A: Application>(
        &mut self,
        app: &mut A,
        max_frames: Option<u64>,
    ) -> Result<(), AppError> {
        log::info!("starting scene loop");
        app.setup(&mut self.scene)?;
        self.scene.flush();

        let mut frames = 0_u64;
        loop {
            let delta_time = self.timer.update();
            app.frame(&mut self.scene, delta_time)?;
            self.scene.tick(delta_time, &mut self.frame);

            frames += 1;
            if app.should_exit(&self.scene) || max_frames.is_some_and(|max| frames >= max) {
                break;
            }
        }

        app.teardown(&mut self.scene);
        log::info!(
            "scene loop ended after {frames} frames ({:.1} fps average)",
            frames as f32 / self.timer.total_time().max(f32::EPSILON)
        );
        Ok(())
    }
}
