use log::*;
use vulkanalia::vk;

use crate::error::{ErrorKind, RenderError, Result};
use crate::window::WindowSystem;

/// The five calls that make up one frame, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Acquire,
    WaitFence,
    ResetFence,
    Submit,
    Present,
}

impl FramePhase {
    pub const fn stage(self) -> &'static str {
        match self {
            FramePhase::Acquire => "acquire next image",
            FramePhase::WaitFence => "wait for frame fence",
            FramePhase::ResetFence => "reset frame fence",
            FramePhase::Submit => "queue submit",
            FramePhase::Present => "queue present",
        }
    }
}

/// Which result codes a frame phase accepts. Anything else is fatal.
#[derive(Copy, Clone, Debug)]
pub struct ResultPolicy {
    pub phase: FramePhase,
    pub tolerated: &'static [vk::Result],
}

pub const ACQUIRE_POLICY: ResultPolicy = ResultPolicy {
    phase: FramePhase::Acquire,
    tolerated: &[vk::Result::SUCCESS],
};

pub const WAIT_FENCE_POLICY: ResultPolicy = ResultPolicy {
    phase: FramePhase::WaitFence,
    tolerated: &[vk::Result::SUCCESS],
};

pub const RESET_FENCE_POLICY: ResultPolicy = ResultPolicy {
    phase: FramePhase::ResetFence,
    tolerated: &[vk::Result::SUCCESS],
};

pub const SUBMIT_POLICY: ResultPolicy = ResultPolicy {
    phase: FramePhase::Submit,
    tolerated: &[vk::Result::SUCCESS],
};

/// The window never resizes, so a suboptimal swapchain is still usable.
pub const PRESENT_POLICY: ResultPolicy = ResultPolicy {
    phase: FramePhase::Present,
    tolerated: &[vk::Result::SUCCESS, vk::Result::SUBOPTIMAL_KHR],
};

impl ResultPolicy {
    pub fn tolerates(&self, result: vk::Result) -> bool {
        self.tolerated.contains(&result)
    }

    #[track_caller]
    pub fn check(&self, result: vk::Result) -> Result<()> {
        if self.tolerates(result) {
            Ok(())
        } else {
            Err(RenderError::vulkan(
                ErrorKind::Synchronization,
                self.phase.stage(),
                result,
            ))
        }
    }
}

/// The GPU side of a frame. Slots are indexed by swapchain image index.
pub trait FrameBackend {
    fn slot_count(&self) -> usize;
    fn acquire_next_image(&mut self) -> (u32, vk::Result);
    fn wait_for_slot(&mut self, slot: usize) -> vk::Result;
    fn reset_slot(&mut self, slot: usize) -> vk::Result;
    fn submit(&mut self, slot: usize) -> vk::Result;
    fn present(&mut self, image_index: u32) -> vk::Result;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub image_index: u32,
    pub suboptimal: bool,
}

/// Drives acquire, fence wait, fence reset, submit and present once per
/// loop iteration until the window asks to close.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    frames: u64,
    reported_suboptimal: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn step<B: FrameBackend>(&mut self, backend: &mut B) -> Result<FrameReport> {
        let (image_index, result) = backend.acquire_next_image();
        ACQUIRE_POLICY.check(result)?;

        let slot = image_index as usize;
        if slot >= backend.slot_count() {
            return Err(RenderError::new(
                ErrorKind::Synchronization,
                FramePhase::Acquire.stage(),
                format!(
                    "image index {} is outside the {} frame slots",
                    image_index,
                    backend.slot_count()
                ),
            ));
        }

        // The slot's previous submission must have retired before reuse.
        WAIT_FENCE_POLICY.check(backend.wait_for_slot(slot))?;
        RESET_FENCE_POLICY.check(backend.reset_slot(slot))?;
        SUBMIT_POLICY.check(backend.submit(slot))?;

        let result = backend.present(image_index);
        PRESENT_POLICY.check(result)?;

        let suboptimal = result == vk::Result::SUBOPTIMAL_KHR;
        if suboptimal && !self.reported_suboptimal {
            warn!("Swapchain is suboptimal for the surface, continuing.");
            self.reported_suboptimal = true;
        }

        self.frames += 1;
        trace!("Presented frame {} on image {}.", self.frames, image_index);

        Ok(FrameReport {
            image_index,
            suboptimal,
        })
    }

    /// Returns the number of frames presented once the window closes.
    pub fn run<B, W>(&mut self, backend: &mut B, window: &mut W) -> Result<u64>
    where
        B: FrameBackend,
        W: WindowSystem,
    {
        info!("Entering frame loop with {} slots.", backend.slot_count());

        while !window.should_close() {
            window.poll_events();
            self.step(backend)?;
        }

        info!("Frame loop finished after {} frames.", self.frames);
        Ok(self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Acquire(u32),
        Wait(usize),
        Reset(usize),
        Submit(usize),
        Present(u32),
    }

    /// Simulates a presentation engine handing out images round-robin and
    /// a queue that finishes work by the time its fence is waited on.
    struct MockBackend {
        slots: usize,
        next_image: u32,
        signaled: Vec<bool>,
        in_flight: Vec<bool>,
        calls: Vec<Call>,
        acquire_result: vk::Result,
        present_result: vk::Result,
        force_index: Option<u32>,
    }

    impl MockBackend {
        fn new(slots: usize) -> Self {
            Self {
                slots,
                next_image: 0,
                // Fences start signaled so the first wait returns immediately.
                signaled: vec![true; slots],
                in_flight: vec![false; slots],
                calls: Vec::new(),
                acquire_result: vk::Result::SUCCESS,
                present_result: vk::Result::SUCCESS,
                force_index: None,
            }
        }

        fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| matches(c)).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn slot_count(&self) -> usize {
            self.slots
        }

        fn acquire_next_image(&mut self) -> (u32, vk::Result) {
            let index = self.force_index.unwrap_or(self.next_image);
            self.next_image = (self.next_image + 1) % self.slots as u32;
            self.calls.push(Call::Acquire(index));
            (index, self.acquire_result)
        }

        fn wait_for_slot(&mut self, slot: usize) -> vk::Result {
            self.in_flight[slot] = false;
            self.signaled[slot] = true;
            self.calls.push(Call::Wait(slot));
            vk::Result::SUCCESS
        }

        fn reset_slot(&mut self, slot: usize) -> vk::Result {
            assert!(self.signaled[slot], "reset of an unsignaled fence");
            self.signaled[slot] = false;
            self.calls.push(Call::Reset(slot));
            vk::Result::SUCCESS
        }

        fn submit(&mut self, slot: usize) -> vk::Result {
            assert!(!self.in_flight[slot], "slot {} resubmitted while in flight", slot);
            assert!(!self.signaled[slot], "submit with a signaled fence");
            self.in_flight[slot] = true;
            self.calls.push(Call::Submit(slot));
            vk::Result::SUCCESS
        }

        fn present(&mut self, image_index: u32) -> vk::Result {
            self.calls.push(Call::Present(image_index));
            self.present_result
        }
    }

    struct ScriptedWindow {
        polls: u32,
        close_after: u32,
    }

    impl ScriptedWindow {
        fn closing_after(close_after: u32) -> Self {
            Self {
                polls: 0,
                close_after,
            }
        }
    }

    impl WindowSystem for ScriptedWindow {
        fn poll_events(&mut self) {
            self.polls += 1;
        }

        fn should_close(&self) -> bool {
            self.polls >= self.close_after
        }
    }

    #[test]
    fn five_iterations_present_five_frames() {
        let _ = pretty_env_logger::try_init();
        let mut backend = MockBackend::new(2);
        let mut window = ScriptedWindow::closing_after(5);
        let mut scheduler = FrameScheduler::new();

        let frames = scheduler.run(&mut backend, &mut window).unwrap();

        assert_eq!(frames, 5);
        assert_eq!(scheduler.frames(), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Acquire(_))), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(_))), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Present(_))), 5);
    }

    #[test]
    fn frames_alternate_between_two_images() {
        let mut backend = MockBackend::new(2);
        let mut scheduler = FrameScheduler::new();

        for _ in 0..4 {
            scheduler.step(&mut backend).unwrap();
        }

        let submitted = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit(slot) => Some(*slot),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(submitted, vec![0, 1, 0, 1]);
    }

    #[test]
    fn each_frame_follows_fixed_call_order() {
        let mut backend = MockBackend::new(2);
        let mut scheduler = FrameScheduler::new();

        scheduler.step(&mut backend).unwrap();
        scheduler.step(&mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::Acquire(0),
                Call::Wait(0),
                Call::Reset(0),
                Call::Submit(0),
                Call::Present(0),
                Call::Acquire(1),
                Call::Wait(1),
                Call::Reset(1),
                Call::Submit(1),
                Call::Present(1),
            ]
        );
    }

    #[test]
    fn slot_is_waited_on_before_every_submit() {
        let mut backend = MockBackend::new(3);
        let mut window = ScriptedWindow::closing_after(9);

        FrameScheduler::new().run(&mut backend, &mut window).unwrap();

        for (i, call) in backend.calls.iter().enumerate() {
            if let Call::Submit(slot) = call {
                assert!(backend.calls[..i].contains(&Call::Wait(*slot)));
                assert_eq!(backend.calls[i - 2], Call::Wait(*slot));
            }
        }
    }

    #[test]
    fn closed_window_renders_nothing() {
        let mut backend = MockBackend::new(2);
        let mut window = ScriptedWindow::closing_after(0);

        let frames = FrameScheduler::new().run(&mut backend, &mut window).unwrap();

        assert_eq!(frames, 0);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn suboptimal_present_is_tolerated() {
        let mut backend = MockBackend::new(2);
        backend.present_result = vk::Result::SUBOPTIMAL_KHR;
        let mut scheduler = FrameScheduler::new();

        let report = scheduler.step(&mut backend).unwrap();
        assert!(report.suboptimal);
        scheduler.step(&mut backend).unwrap();
        assert_eq!(scheduler.frames(), 2);
    }

    #[test]
    fn out_of_date_present_is_fatal() {
        let _ = pretty_env_logger::try_init();
        let mut backend = MockBackend::new(2);
        backend.present_result = vk::Result::ERROR_OUT_OF_DATE_KHR;
        let mut window = ScriptedWindow::closing_after(5);
        let mut scheduler = FrameScheduler::new();

        let err = scheduler.run(&mut backend, &mut window).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Synchronization);
        assert_eq!(err.stage(), "queue present");
        assert_eq!(err.code(), Some(vk::Result::ERROR_OUT_OF_DATE_KHR.as_raw()));
        assert_eq!(scheduler.frames(), 0);
    }

    #[test]
    fn failed_acquire_submits_nothing() {
        let mut backend = MockBackend::new(2);
        backend.acquire_result = vk::Result::ERROR_SURFACE_LOST_KHR;

        let err = FrameScheduler::new().step(&mut backend).unwrap_err();

        assert_eq!(err.stage(), "acquire next image");
        assert_eq!(err.exit_code(), 4);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(_))), 0);
    }

    #[test]
    fn image_index_outside_slots_is_fatal() {
        let mut backend = MockBackend::new(2);
        backend.force_index = Some(7);

        let err = FrameScheduler::new().step(&mut backend).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Synchronization);
        assert_eq!(backend.count(|c| matches!(c, Call::Wait(_))), 0);
    }

    #[test]
    fn only_present_tolerates_suboptimal() {
        for policy in [ACQUIRE_POLICY, WAIT_FENCE_POLICY, RESET_FENCE_POLICY, SUBMIT_POLICY] {
            assert!(policy.tolerates(vk::Result::SUCCESS));
            assert!(!policy.tolerates(vk::Result::SUBOPTIMAL_KHR));
        }
        assert!(PRESENT_POLICY.tolerates(vk::Result::SUBOPTIMAL_KHR));
        assert!(!PRESENT_POLICY.tolerates(vk::Result::ERROR_OUT_OF_DATE_KHR));
    }
}
