use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder, KhrSwapchainExtension};
use vulkanalia::Device;

use super::device::DeviceContext;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};
use crate::scheduler::FrameBackend;

/// Everything bound to one swapchain image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSlot {
    pub image: vk::Image,
    pub image_view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
    pub command_buffer: vk::CommandBuffer,
    pub fence: vk::Fence,
}

impl FrameSlot {
    /// Zips per-image objects into slots. All inputs must have one entry
    /// per swapchain image.
    pub fn assemble(
        images: &[vk::Image],
        image_views: &[vk::ImageView],
        framebuffers: &[vk::Framebuffer],
        command_buffers: &[vk::CommandBuffer],
        fences: &[vk::Fence],
    ) -> Result<Vec<FrameSlot>> {
        let count = images.len();
        let lengths = [
            image_views.len(),
            framebuffers.len(),
            command_buffers.len(),
            fences.len(),
        ];

        if lengths.iter().any(|len| *len != count) {
            return Err(RenderError::new(
                ErrorKind::Resource,
                "assemble frame slots",
                format!("{} images but per-image objects {:?}", count, lengths),
            ));
        }

        Ok((0..count)
            .map(|i| FrameSlot {
                image: images[i],
                image_view: image_views[i],
                framebuffer: framebuffers[i],
                command_buffer: command_buffers[i],
                fence: fences[i],
            })
            .collect())
    }
}

/// Semaphores shared by every frame: one signalled by acquisition, one by
/// rendering and waited on by presentation.
#[derive(Copy, Clone, Debug)]
pub struct SyncPair {
    pub image_ready: vk::Semaphore,
    pub render_complete: vk::Semaphore,
}

impl SyncPair {
    pub unsafe fn new(device: &DeviceContext, teardown: &mut Teardown) -> Result<SyncPair> {
        let info = vk::SemaphoreCreateInfo::builder();

        let image_ready = device
            .vk_device
            .create_semaphore(&info, None)
            .or_fail(ErrorKind::Resource, "create image-ready semaphore")?;
        teardown.push(Resource::Semaphore(image_ready));

        let render_complete = device
            .vk_device
            .create_semaphore(&info, None)
            .or_fail(ErrorKind::Resource, "create render-complete semaphore")?;
        teardown.push(Resource::Semaphore(render_complete));

        Ok(SyncPair {
            image_ready,
            render_complete,
        })
    }
}

/// One fence per slot, created signaled so the first wait on each returns
/// immediately.
pub unsafe fn create_fences(
    device: &DeviceContext,
    count: usize,
    teardown: &mut Teardown,
) -> Result<Vec<vk::Fence>> {
    let info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
    let mut fences = Vec::with_capacity(count);

    for _ in 0..count {
        let fence = device
            .vk_device
            .create_fence(&info, None)
            .or_fail(ErrorKind::Resource, "create frame fence")?;
        teardown.push(Resource::Fence(fence));
        fences.push(fence);
    }

    Ok(fences)
}

/// Drives the real swapchain and graphics queue for the frame scheduler.
pub struct VulkanFrameBackend<'a> {
    device: &'a Device,
    queue: vk::Queue,
    swapchain: vk::SwapchainKHR,
    sync: SyncPair,
    slots: &'a [FrameSlot],
}

impl<'a> VulkanFrameBackend<'a> {
    pub fn new(
        device: &'a Device,
        queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        sync: SyncPair,
        slots: &'a [FrameSlot],
    ) -> Self {
        Self {
            device,
            queue,
            swapchain,
            sync,
            slots,
        }
    }
}

fn succeeded(code: vk::SuccessCode) -> vk::Result {
    vk::Result::from_raw(code.as_raw())
}

fn failed(code: vk::ErrorCode) -> vk::Result {
    vk::Result::from_raw(code.as_raw())
}

fn status(result: std::result::Result<(), vk::ErrorCode>) -> vk::Result {
    result.map_or_else(failed, |()| vk::Result::SUCCESS)
}

impl FrameBackend for VulkanFrameBackend<'_> {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn acquire_next_image(&mut self) -> (u32, vk::Result) {
        let acquired = unsafe {
            self.device.acquire_next_image_khr(
                self.swapchain,
                u64::MAX,
                self.sync.image_ready,
                vk::Fence::null(),
            )
        };

        match acquired {
            Ok((index, code)) => (index, succeeded(code)),
            Err(code) => (u32::MAX, failed(code)),
        }
    }

    fn wait_for_slot(&mut self, slot: usize) -> vk::Result {
        let fences = &[self.slots[slot].fence];
        match unsafe { self.device.wait_for_fences(fences, true, u64::MAX) } {
            Ok(code) => succeeded(code),
            Err(code) => failed(code),
        }
    }

    fn reset_slot(&mut self, slot: usize) -> vk::Result {
        status(unsafe { self.device.reset_fences(&[self.slots[slot].fence]) })
    }

    fn submit(&mut self, slot: usize) -> vk::Result {
        let frame = &self.slots[slot];

        let wait_semaphores = &[self.sync.image_ready];
        let wait_stages = &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = &[frame.command_buffer];
        let signal_semaphores = &[self.sync.render_complete];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signal_semaphores);

        status(unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info], frame.fence)
        })
    }

    fn present(&mut self, image_index: u32) -> vk::Result {
        let wait_semaphores = &[self.sync.render_complete];
        let swapchains = &[self.swapchain];
        let image_indices = &[image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        match unsafe { self.device.queue_present_khr(self.queue, &present_info) } {
            Ok(code) => succeeded(code),
            Err(code) => failed(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_pair_objects_by_image_index() {
        let images = [vk::Image::from_raw(1), vk::Image::from_raw(2)];
        let views = [vk::ImageView::from_raw(11), vk::ImageView::from_raw(12)];
        let framebuffers = [vk::Framebuffer::from_raw(21), vk::Framebuffer::from_raw(22)];
        let command_buffers = [vk::CommandBuffer::from_raw(31), vk::CommandBuffer::from_raw(32)];
        let fences = [vk::Fence::from_raw(41), vk::Fence::from_raw(42)];

        let slots =
            FrameSlot::assemble(&images, &views, &framebuffers, &command_buffers, &fences).unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].image, images[1]);
        assert_eq!(slots[1].framebuffer, framebuffers[1]);
        assert_eq!(slots[1].command_buffer, command_buffers[1]);
        assert_eq!(slots[0].fence, fences[0]);
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let images = [vk::Image::from_raw(1), vk::Image::from_raw(2)];
        let views = [vk::ImageView::from_raw(11), vk::ImageView::from_raw(12)];
        let framebuffers = [vk::Framebuffer::from_raw(21)];
        let command_buffers = [vk::CommandBuffer::from_raw(31), vk::CommandBuffer::from_raw(32)];
        let fences = [vk::Fence::from_raw(41), vk::Fence::from_raw(42)];

        let err = FrameSlot::assemble(&images, &views, &framebuffers, &command_buffers, &fences)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[test]
    fn api_results_map_to_raw_codes() {
        assert_eq!(succeeded(vk::SuccessCode::SUBOPTIMAL_KHR), vk::Result::SUBOPTIMAL_KHR);
        assert_eq!(
            failed(vk::ErrorCode::OUT_OF_DATE_KHR),
            vk::Result::ERROR_OUT_OF_DATE_KHR
        );
        assert_eq!(status(Ok(())), vk::Result::SUCCESS);
    }
}
