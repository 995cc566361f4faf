//! Scripted in-memory GPU for driving the frame scheduler without a device.
//!
//! Submissions stay pending until something waits on their fence or idles
//! the device, which is the worst case for the scheduler: the GPU never
//! finishes work on its own. Every misuse the scheduler could commit is
//! appended to `GpuState::violations` instead of panicking, so tests can
//! assert on the whole run.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use vkframe_platform::{ExtentSource, SurfaceExtent};
use vkframe_renderer::{
    AcquireOutcome, CommandRecorder, ExecutionContext, FrameInfo, FrameScheduler, PresentOutcome,
    PresentationSurface, Submission,
};
use vkframe_rhi::{RhiError, RhiResult, vk};

pub const GRAPHICS_QUEUE: u32 = 0;
pub const PRESENT_QUEUE: u32 = 1;

pub type Gpu = Rc<RefCell<GpuState>>;
pub type MockScheduler = FrameScheduler<MockContext, MockSurface, MockRecorder>;

/// Observable GPU-side and lifecycle events, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Acquire { image: u32 },
    AcquireStale,
    Submit { command_buffer: u64, image: u32, fence: u64 },
    Present { image: u32 },
    WaitIdle,
    Recreate { extent: SurfaceExtent, images: usize },
    WaitEvents { submissions: usize },
    AllocateCommandBuffers(usize),
    FreeCommandBuffers(usize),
    DestroySemaphore(u64),
    DestroyFence(u64),
    DestroyCommandPool,
    DestroyRecorder,
    DestroySurface,
    DestroyContext,
}

#[derive(Debug, Default)]
struct FenceState {
    signaled: bool,
    waits: u32,
    resets: u32,
}

#[derive(Debug)]
struct Pending {
    fence: u64,
    command_buffer: u64,
    image: u32,
}

#[derive(Debug, Default)]
pub struct GpuState {
    next_id: u64,
    fences: HashMap<u64, FenceState>,
    live_semaphores: HashSet<u64>,
    live_fences: HashSet<u64>,
    /// Semaphores with a signal operation nobody has waited on yet.
    unconsumed_signals: HashSet<u64>,
    pending: VecDeque<Pending>,
    /// Image each command buffer was last recorded for.
    recorded_image: HashMap<u64, u32>,
    busy_images: HashSet<u32>,
    fences_created: usize,

    pub events: Vec<Event>,
    pub violations: Vec<String>,
    pub max_in_flight: usize,
    pub submissions: usize,
    /// Zero-based submission that fails with `ERROR_DEVICE_LOST`.
    pub fail_submit_at: Option<usize>,
    /// Zero-based fence creation that fails.
    pub fail_fence_creation_at: Option<usize>,
}

impl GpuState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    /// Retires queued work in order up to and including the submission
    /// that signals `fence`.
    fn retire_through(&mut self, fence: u64) {
        while let Some(done) = self.pending.pop_front() {
            self.retire(&done);
            if done.fence == fence {
                break;
            }
        }
    }

    fn retire_all(&mut self) {
        while let Some(done) = self.pending.pop_front() {
            self.retire(&done);
        }
    }

    fn retire(&mut self, done: &Pending) {
        if let Some(state) = self.fences.get_mut(&done.fence) {
            state.signaled = true;
        }
        self.busy_images.remove(&done.image);
    }

    fn fence_pending(&self, fence: u64) -> bool {
        self.pending.iter().any(|p| p.fence == fence)
    }

    fn command_buffer_pending(&self, command_buffer: u64) -> bool {
        self.pending.iter().any(|p| p.command_buffer == command_buffer)
    }

    fn signal(&mut self, semaphore: u64, what: &str) {
        if !self.unconsumed_signals.insert(semaphore) {
            self.violation(format!(
                "{} signals semaphore {} which already has a pending signal",
                what, semaphore
            ));
        }
    }

    fn consume(&mut self, semaphore: u64, what: &str) {
        if !self.unconsumed_signals.remove(&semaphore) {
            self.violation(format!(
                "{} waits on semaphore {} which nothing signals",
                what, semaphore
            ));
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn fence_waits(&self, fence: u64) -> u32 {
        self.fences.get(&fence).map_or(0, |f| f.waits)
    }

    pub fn fence_resets(&self, fence: u64) -> u32 {
        self.fences.get(&fence).map_or(0, |f| f.resets)
    }

    pub fn live_semaphores(&self) -> usize {
        self.live_semaphores.len()
    }

    pub fn live_fences(&self) -> usize {
        self.live_fences.len()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn submitted_images(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Submit { image, .. } => Some(*image),
                _ => None,
            })
            .collect()
    }
}

fn device_lost() -> RhiError {
    RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST)
}

// =============================================================================
// Execution context
// =============================================================================

pub struct MockContext {
    gpu: Gpu,
}

impl MockContext {
    pub fn new(gpu: &Gpu) -> Self {
        Self { gpu: Rc::clone(gpu) }
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.gpu.borrow_mut().events.push(Event::DestroyContext);
    }
}

pub struct MockSemaphore {
    id: u64,
    gpu: Gpu,
}

impl MockSemaphore {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for MockSemaphore {
    fn drop(&mut self) {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.unconsumed_signals.contains(&self.id) {
            let message = format!("semaphore {} destroyed with a pending signal", self.id);
            gpu.violation(message);
        }
        gpu.live_semaphores.remove(&self.id);
        gpu.events.push(Event::DestroySemaphore(self.id));
    }
}

pub struct MockFence {
    id: u64,
    gpu: Gpu,
}

impl MockFence {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for MockFence {
    fn drop(&mut self) {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.fence_pending(self.id) {
            let message = format!("fence {} destroyed while GPU work is pending", self.id);
            gpu.violation(message);
        }
        gpu.live_fences.remove(&self.id);
        gpu.events.push(Event::DestroyFence(self.id));
    }
}

pub struct MockCommandPool {
    gpu: Gpu,
}

impl Drop for MockCommandPool {
    fn drop(&mut self) {
        let mut gpu = self.gpu.borrow_mut();
        if !gpu.pending.is_empty() {
            gpu.violation("command pool destroyed while GPU work is pending".to_string());
        }
        gpu.events.push(Event::DestroyCommandPool);
    }
}

#[derive(Debug)]
pub struct MockCommandBuffer {
    id: u64,
}

impl MockCommandBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl ExecutionContext for MockContext {
    type Semaphore = MockSemaphore;
    type Fence = MockFence;
    type CommandPool = MockCommandPool;
    type CommandBuffer = MockCommandBuffer;
    type Queue = u32;

    fn create_semaphore(&self) -> RhiResult<MockSemaphore> {
        let mut gpu = self.gpu.borrow_mut();
        let id = gpu.next_id();
        gpu.live_semaphores.insert(id);
        Ok(MockSemaphore {
            id,
            gpu: Rc::clone(&self.gpu),
        })
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<MockFence> {
        let mut gpu = self.gpu.borrow_mut();
        let attempt = gpu.fences_created;
        gpu.fences_created += 1;
        if gpu.fail_fence_creation_at == Some(attempt) {
            return Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }

        let id = gpu.next_id();
        gpu.fences.insert(
            id,
            FenceState {
                signaled,
                ..FenceState::default()
            },
        );
        gpu.live_fences.insert(id);
        Ok(MockFence {
            id,
            gpu: Rc::clone(&self.gpu),
        })
    }

    fn create_command_pool(&self) -> RhiResult<MockCommandPool> {
        Ok(MockCommandPool {
            gpu: Rc::clone(&self.gpu),
        })
    }

    fn allocate_command_buffers(
        &self,
        _pool: &MockCommandPool,
        count: usize,
    ) -> RhiResult<Vec<MockCommandBuffer>> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.events.push(Event::AllocateCommandBuffers(count));
        Ok((0..count)
            .map(|_| MockCommandBuffer { id: gpu.next_id() })
            .collect())
    }

    fn free_command_buffers(&self, _pool: &MockCommandPool, buffers: Vec<MockCommandBuffer>) {
        let mut gpu = self.gpu.borrow_mut();
        for buffer in &buffers {
            if gpu.command_buffer_pending(buffer.id) {
                let message = format!("command buffer {} freed while pending", buffer.id);
                gpu.violation(message);
            }
        }
        gpu.events.push(Event::FreeCommandBuffers(buffers.len()));
    }

    fn wait_for_fence(&self, fence: &MockFence, _timeout: u64) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        let signaled = match gpu.fences.get_mut(&fence.id) {
            Some(state) => {
                state.waits += 1;
                state.signaled
            }
            None => return Err(device_lost()),
        };

        if signaled {
            return Ok(());
        }
        if !gpu.fence_pending(fence.id) {
            let message = format!("wait on fence {} that no submission will signal", fence.id);
            gpu.violation(message);
            return Err(device_lost());
        }
        gpu.retire_through(fence.id);
        Ok(())
    }

    fn reset_fence(&self, fence: &MockFence) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.fence_pending(fence.id) {
            let message = format!("fence {} reset while its submission is pending", fence.id);
            gpu.violation(message);
        }
        let state = gpu.fences.get_mut(&fence.id).ok_or_else(device_lost)?;
        state.signaled = false;
        state.resets += 1;
        Ok(())
    }

    fn reset_command_buffer(&self, buffer: &MockCommandBuffer) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.command_buffer_pending(buffer.id) {
            let message = format!("command buffer {} reset while pending", buffer.id);
            gpu.violation(message);
        }
        Ok(())
    }

    fn submit(&self, queue: u32, submission: Submission<'_, Self>) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if gpu.fail_submit_at == Some(gpu.submissions) {
            return Err(device_lost());
        }

        if queue != GRAPHICS_QUEUE {
            gpu.violation(format!("submit on queue {}", queue));
        }
        if submission.wait_stage != vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT {
            gpu.violation(format!("acquire wait at {:?}", submission.wait_stage));
        }

        let fence = submission.fence.id;
        let fence_signaled = gpu.fences.get(&fence).is_some_and(|f| f.signaled);
        if fence_signaled || gpu.fence_pending(fence) {
            gpu.violation(format!("submit with fence {} not reset", fence));
        }

        let command_buffer = submission.command_buffer.id;
        let recorded = gpu.recorded_image.get(&command_buffer).copied();
        let Some(image) = recorded else {
            gpu.violation(format!("command buffer {} submitted unrecorded", command_buffer));
            return Err(device_lost());
        };
        if !gpu.busy_images.insert(image) {
            gpu.violation(format!("image {} written by two frames in flight", image));
        }

        gpu.consume(submission.wait.id, "submit");
        gpu.signal(submission.signal.id, "submit");

        gpu.pending.push_back(Pending {
            fence,
            command_buffer,
            image,
        });
        gpu.max_in_flight = gpu.max_in_flight.max(gpu.pending.len());
        gpu.submissions += 1;
        gpu.events.push(Event::Submit {
            command_buffer,
            image,
            fence,
        });
        Ok(())
    }

    fn graphics_queue(&self) -> u32 {
        GRAPHICS_QUEUE
    }

    fn present_queue(&self) -> u32 {
        PRESENT_QUEUE
    }

    fn wait_idle(&self) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.retire_all();
        gpu.events.push(Event::WaitIdle);
        Ok(())
    }
}

// =============================================================================
// Presentation surface
// =============================================================================

/// Scripted acquisition result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Round-robin over the images.
    Next,
    Image(u32),
    Suboptimal,
    Stale,
    Fail,
}

#[derive(Debug, Default)]
struct SurfaceScript {
    next_image: u32,
    acquire: VecDeque<Acquire>,
    present: VecDeque<PresentOutcome>,
    next_image_count: Option<usize>,
}

/// Swap chain stand-in. Scripts can be queued through `&self`, so they are
/// reachable from `FrameScheduler::surface()` mid-run.
pub struct MockSurface {
    gpu: Gpu,
    image_count: usize,
    extent: SurfaceExtent,
    recreations: usize,
    script: RefCell<SurfaceScript>,
}

impl MockSurface {
    pub fn new(gpu: &Gpu, image_count: usize, extent: SurfaceExtent) -> Self {
        Self {
            gpu: Rc::clone(gpu),
            image_count,
            extent,
            recreations: 0,
            script: RefCell::new(SurfaceScript::default()),
        }
    }

    pub fn script_acquire(&self, steps: impl IntoIterator<Item = Acquire>) {
        self.script.borrow_mut().acquire.extend(steps);
    }

    pub fn script_present(&self, steps: impl IntoIterator<Item = PresentOutcome>) {
        self.script.borrow_mut().present.extend(steps);
    }

    /// Image count reported after the next recreation.
    pub fn resize_image_set(&self, count: usize) {
        self.script.borrow_mut().next_image_count = Some(count);
    }

    pub fn recreations(&self) -> usize {
        self.recreations
    }
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        self.gpu.borrow_mut().events.push(Event::DestroySurface);
    }
}

impl PresentationSurface<MockContext> for MockSurface {
    fn image_count(&self) -> usize {
        self.image_count
    }

    fn extent(&self) -> SurfaceExtent {
        self.extent
    }

    fn acquire_next_image(&self, signal: &MockSemaphore) -> RhiResult<AcquireOutcome> {
        let mut script = self.script.borrow_mut();
        let step = script.acquire.pop_front().unwrap_or(Acquire::Next);

        let (image_index, suboptimal) = match step {
            Acquire::Stale => {
                self.gpu.borrow_mut().events.push(Event::AcquireStale);
                return Ok(AcquireOutcome::Stale);
            }
            Acquire::Fail => return Err(device_lost()),
            Acquire::Next => (script.next_image, false),
            Acquire::Suboptimal => (script.next_image, true),
            Acquire::Image(image) => (image, false),
        };
        script.next_image = (image_index + 1) % self.image_count as u32;

        let mut gpu = self.gpu.borrow_mut();
        gpu.signal(signal.id, "acquire");
        gpu.events.push(Event::Acquire { image: image_index });

        Ok(AcquireOutcome::Ready {
            image_index,
            suboptimal,
        })
    }

    fn present(
        &self,
        queue: u32,
        wait: &MockSemaphore,
        image_index: u32,
    ) -> RhiResult<PresentOutcome> {
        let mut gpu = self.gpu.borrow_mut();
        if queue != PRESENT_QUEUE {
            gpu.violation(format!("present on queue {}", queue));
        }
        gpu.consume(wait.id, "present");
        gpu.events.push(Event::Present { image: image_index });

        Ok(self
            .script
            .borrow_mut()
            .present
            .pop_front()
            .unwrap_or(PresentOutcome::Presented))
    }

    fn recreate(&mut self, extent: SurfaceExtent) -> RhiResult<()> {
        let mut gpu = self.gpu.borrow_mut();
        if !gpu.pending.is_empty() {
            gpu.violation("surface recreated while GPU work is pending".to_string());
        }

        let script = self.script.get_mut();
        if let Some(count) = script.next_image_count.take() {
            self.image_count = count;
        }
        script.next_image = 0;
        self.extent = extent;
        self.recreations += 1;

        gpu.events.push(Event::Recreate {
            extent,
            images: self.image_count,
        });
        Ok(())
    }
}

// =============================================================================
// Recorder
// =============================================================================

pub struct MockRecorder {
    gpu: Gpu,
    frames: Vec<FrameInfo>,
    /// Last frame number written into each image.
    image_contents: HashMap<u32, u64>,
    pub fail_at_frame: Option<u64>,
    _context: Option<Arc<MockContext>>,
}

impl MockRecorder {
    pub fn new(gpu: &Gpu) -> Self {
        Self {
            gpu: Rc::clone(gpu),
            frames: Vec::new(),
            image_contents: HashMap::new(),
            fail_at_frame: None,
            _context: None,
        }
    }

    /// Keeps a context reference, like a recorder owning pipeline objects.
    pub fn holding(mut self, context: Arc<MockContext>) -> Self {
        self._context = Some(context);
        self
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    pub fn image_content(&self, image_index: u32) -> Option<u64> {
        self.image_contents.get(&image_index).copied()
    }
}

impl Drop for MockRecorder {
    fn drop(&mut self) {
        self.gpu.borrow_mut().events.push(Event::DestroyRecorder);
    }
}

impl CommandRecorder<MockContext, MockSurface> for MockRecorder {
    fn record(
        &mut self,
        _context: &MockContext,
        command_buffer: &MockCommandBuffer,
        frame: FrameInfo,
        surface: &MockSurface,
    ) -> RhiResult<()> {
        if self.fail_at_frame == Some(frame.frame_number) {
            return Err(device_lost());
        }

        let mut gpu = self.gpu.borrow_mut();
        if gpu.command_buffer_pending(command_buffer.id) {
            let message = format!("command buffer {} recorded while pending", command_buffer.id);
            gpu.violation(message);
        }
        if frame.image_index as usize >= surface.image_count() {
            let message = format!("recorded for image {} out of range", frame.image_index);
            gpu.violation(message);
        }
        gpu.recorded_image.insert(command_buffer.id, frame.image_index);

        if let Some(&previous) = self.image_contents.get(&frame.image_index)
            && previous >= frame.frame_number
        {
            gpu.violation(format!(
                "image {} went from frame {} back to {}",
                frame.image_index, previous, frame.frame_number
            ));
        }
        self.image_contents.insert(frame.image_index, frame.frame_number);
        self.frames.push(frame);
        Ok(())
    }
}

// =============================================================================
// Window
// =============================================================================

/// Extent source replaying a queue of sizes, one per `wait_events`.
///
/// When the queue runs dry while the window is still zero-area, the window
/// reports a close request so recreation cannot wait forever.
pub struct MockWindow {
    gpu: Gpu,
    current: SurfaceExtent,
    upcoming: VecDeque<SurfaceExtent>,
    close_requested: bool,
    pub waits: usize,
}

impl MockWindow {
    pub fn new(gpu: &Gpu, extent: SurfaceExtent) -> Self {
        Self {
            gpu: Rc::clone(gpu),
            current: extent,
            upcoming: VecDeque::new(),
            close_requested: false,
            waits: 0,
        }
    }

    /// Changes the size immediately and queues `then` for later waits.
    pub fn resize(&mut self, now: SurfaceExtent, then: impl IntoIterator<Item = SurfaceExtent>) {
        self.current = now;
        self.upcoming.extend(then);
    }
}

impl ExtentSource for MockWindow {
    fn framebuffer_extent(&self) -> SurfaceExtent {
        self.current
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        {
            let mut gpu = self.gpu.borrow_mut();
            let submissions = gpu.submissions;
            gpu.events.push(Event::WaitEvents { submissions });
        }

        match self.upcoming.pop_front() {
            Some(extent) => self.current = extent,
            None => self.close_requested = true,
        }
    }

    fn close_requested(&self) -> bool {
        self.close_requested
    }
}

// =============================================================================
// Setup
// =============================================================================

pub const START_EXTENT: SurfaceExtent = SurfaceExtent::new(800, 600);

pub fn gpu() -> Gpu {
    Rc::new(RefCell::new(GpuState::default()))
}

/// Scheduler over `images` swap images with `slots` frame slots.
pub fn scheduler(gpu: &Gpu, slots: usize, images: usize) -> MockScheduler {
    FrameScheduler::new(
        Arc::new(MockContext::new(gpu)),
        MockSurface::new(gpu, images, START_EXTENT),
        MockRecorder::new(gpu),
        slots,
    )
    .expect("mock scheduler setup")
}

pub fn slot_fences(scheduler: &MockScheduler) -> Vec<u64> {
    scheduler
        .slots()
        .iter()
        .map(|slot| slot.frame_complete().id())
        .collect()
}

pub fn assert_clean(gpu: &Gpu) {
    let violations = &gpu.borrow().violations;
    assert!(violations.is_empty(), "GPU misuse: {:#?}", violations);
}
