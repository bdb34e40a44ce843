use std::fmt;

use log::*;

use crate::error::{ErrorKind, RenderError, Result};

/// One step of renderer initialization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetupStage {
    LoadShaders,
    Instance,
    Device,
    Swapchain,
    DepthTarget,
    RenderPass,
    Framebuffers,
    SceneBuffers,
    Descriptor,
    Pipeline,
    CommandBuffers,
    SyncObjects,
    FrameSlots,
}

/// The only order setup may run in. Each stage depends on objects made by
/// earlier ones.
pub const SETUP_ORDER: [SetupStage; 13] = [
    SetupStage::LoadShaders,
    SetupStage::Instance,
    SetupStage::Device,
    SetupStage::Swapchain,
    SetupStage::DepthTarget,
    SetupStage::RenderPass,
    SetupStage::Framebuffers,
    SetupStage::SceneBuffers,
    SetupStage::Descriptor,
    SetupStage::Pipeline,
    SetupStage::CommandBuffers,
    SetupStage::SyncObjects,
    SetupStage::FrameSlots,
];

impl SetupStage {
    pub fn position(self) -> usize {
        SETUP_ORDER
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or(SETUP_ORDER.len())
    }
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::LoadShaders => "load shaders",
            SetupStage::Instance => "instance",
            SetupStage::Device => "device",
            SetupStage::Swapchain => "swapchain",
            SetupStage::DepthTarget => "depth target",
            SetupStage::RenderPass => "render pass",
            SetupStage::Framebuffers => "framebuffers",
            SetupStage::SceneBuffers => "scene buffers",
            SetupStage::Descriptor => "descriptor set",
            SetupStage::Pipeline => "graphics pipeline",
            SetupStage::CommandBuffers => "command buffers",
            SetupStage::SyncObjects => "sync objects",
            SetupStage::FrameSlots => "frame slots",
        };
        f.write_str(name)
    }
}

/// Tracks how far initialization got. Entering a stage out of order is an
/// error, so setup cannot drift from `SETUP_ORDER`.
#[derive(Debug, Default)]
pub struct SetupProgress {
    entered: usize,
}

impl SetupProgress {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn enter(&mut self, stage: SetupStage) -> Result<()> {
        match SETUP_ORDER.get(self.entered) {
            Some(expected) if *expected == stage => {
                debug!("Setup stage {}/{}: {}.", self.entered + 1, SETUP_ORDER.len(), stage);
                self.entered += 1;
                Ok(())
            }
            expected => Err(RenderError::new(
                ErrorKind::Resource,
                "order setup stages",
                format!("entered {} but expected {:?}", stage, expected),
            )),
        }
    }

    /// Stages started so far, including the one that may have failed.
    pub fn entered(&self) -> &'static [SetupStage] {
        &SETUP_ORDER[..self.entered]
    }

    pub fn reached(&self, stage: SetupStage) -> bool {
        self.entered().contains(&stage)
    }
}
